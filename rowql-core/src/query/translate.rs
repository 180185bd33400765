//! Expression translation.
//!
//! Rewrites the shorthand access syntax of a clause (`a->b`, `a->'b c'`,
//! `a.b`, `.name`) into plain item access, binds column names to positions
//! in the current row and puts quoted literals back. Also splits the
//! multi-expression clauses (SELECT, GROUP BY, ORDER BY) and reads their
//! modifiers.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::literals::{is_placeholder, LiteralTable};
use crate::error::{RowqlError, RowqlResult};

static COUNT_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcount_agg\s*\(\s*\*\s*\)").expect("valid regex"));
static COUNT_DISTINCT_STAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bcount_distinct_agg\s*\(\s*\*\s*\)").expect("valid regex"));
static SELECT_MODIFIERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:(DISTINCT)\s+)?(?:(PARTIALS)\s+)?").expect("valid regex")
});
static AS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+AS\s+").expect("valid regex"));
static ORDER_MODIFIERS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\s+(DESC|ASC))?(?:\s+NULLS\s+(FIRST|LAST))?\s*$").expect("valid regex")
});
static ROW_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:json|row)(?:\[|\.)").expect("valid regex"));
static NON_IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9a-zA-Z_\s]").expect("valid regex"));
static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// One SELECT output column.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub name: String,
    /// Normalized expression text, placeholders still in place. `*` for star.
    pub expression: String,
    pub is_star: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderTarget {
    Expression(String),
    /// 0-based output column, reused from the row's SELECT result.
    OutputColumn(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderKey {
    pub target: OrderTarget,
    pub descending: bool,
    pub nulls: Option<NullsOrder>,
}

impl OrderKey {
    /// NULLs sort as larger than everything unless overridden, so they come
    /// last ascending and first descending.
    pub fn nulls_first(&self) -> bool {
        match self.nulls {
            Some(NullsOrder::First) => true,
            Some(NullsOrder::Last) => false,
            None => self.descending,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupKey {
    pub expression: String,
}

/// Column name -> position in the current row.
#[derive(Debug, Clone, Default)]
pub struct ColumnBindings {
    positions: HashMap<String, usize>,
}

impl ColumnBindings {
    /// Binds the default names (`col1`, `col2`, ...) and, when given, the
    /// declared names to the same positions.
    pub fn new(column_count: usize, declared: &[String]) -> Self {
        let mut positions = HashMap::new();
        for i in 0..column_count {
            positions.insert(default_column_name(i), i);
        }
        for (i, name) in declared.iter().enumerate().take(column_count) {
            positions.insert(name.clone(), i);
        }
        Self { positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

pub fn default_column_name(index: usize) -> String {
    format!("col{}", index + 1)
}

pub struct ExpressionTranslator;

impl ExpressionTranslator {
    /// Parse-time rewrite of shorthand syntax. Literals are still placeholders.
    pub fn normalize(expr: &str) -> String {
        let s = COUNT_STAR_RE.replace_all(expr, "count_agg(1)");
        let s = COUNT_DISTINCT_STAR_RE.replace_all(&s, "count_distinct_agg(_values)");
        let s = rewrite_leading_dots(&s);
        let s = rewrite_member_dots(&s);
        let s = rewrite_arrows(&s);
        s.trim().to_string()
    }

    /// Bind-time step: column names become `_values[i]` and literals come back.
    pub fn prepare(expr: &str, bindings: &ColumnBindings, literals: &LiteralTable) -> String {
        let bound = if bindings.is_empty() {
            expr.to_string()
        } else {
            substitute_columns(expr, bindings)
        };
        literals.restore(&bound, true)
    }

    /// Split on commas outside of (), {} and [].
    pub fn split_multi_expression(clause: &str) -> Vec<String> {
        let mut parts = Vec::new();
        let mut depth: i32 = 0;
        let mut current = String::new();
        let mut quote: Option<char> = None;

        for ch in clause.chars() {
            if let Some(q) = quote {
                if ch == q {
                    quote = None;
                }
                current.push(ch);
                continue;
            }
            match ch {
                '\'' | '"' => quote = Some(ch),
                '(' | '{' | '[' => depth += 1,
                ')' | '}' | ']' => depth -= 1,
                ',' if depth == 0 => {
                    parts.push(current.trim().to_string());
                    current.clear();
                    continue;
                }
                _ => {}
            }
            current.push(ch);
        }
        parts.push(current.trim().to_string());
        parts
    }

    /// SELECT: modifiers, items and output names. Returns (items, distinct, partials).
    pub fn parse_select(
        clause: &str,
        literals: &LiteralTable,
    ) -> RowqlResult<(Vec<Projection>, bool, bool)> {
        let caps = SELECT_MODIFIERS_RE
            .captures(clause)
            .ok_or_else(|| RowqlError::SyntaxError("could not parse SELECT".to_string()))?;
        let distinct = caps.get(1).is_some();
        let partials = caps.get(2).is_some();
        let rest = &clause[caps.get(0).map(|m| m.end()).unwrap_or(0)..];

        let mut items = Vec::new();
        for raw in Self::split_multi_expression(rest) {
            let (expr, alias) = match AS_RE.find(&raw) {
                Some(m) => (raw[..m.start()].to_string(), Some(raw[m.end()..].trim().to_string())),
                None => (raw.clone(), None),
            };

            if expr.trim() == "*" {
                items.push(Projection {
                    name: "*".to_string(),
                    expression: "*".to_string(),
                    is_star: true,
                });
                continue;
            }

            let expression = Self::normalize(&expr);
            let name = match alias {
                Some(alias) => literals.restore(&alias, false),
                None => Self::output_column_name(&expression, literals),
            };
            items.push(Projection {
                name,
                expression,
                is_star: false,
            });
        }

        Ok((items, distinct, partials))
    }

    /// ORDER BY items with ASC/DESC and NULLS FIRST/LAST.
    pub fn parse_order_by(clause: &str) -> RowqlResult<Vec<OrderKey>> {
        let mut keys = Vec::new();
        for raw in Self::split_multi_expression(clause) {
            let (expr, descending, nulls) = match ORDER_MODIFIERS_RE.captures(&raw) {
                Some(caps) => {
                    let start = caps.get(0).map(|m| m.start()).unwrap_or(raw.len());
                    let descending = caps
                        .get(1)
                        .map(|m| m.as_str().eq_ignore_ascii_case("DESC"))
                        .unwrap_or(false);
                    let nulls = caps.get(2).map(|m| {
                        if m.as_str().eq_ignore_ascii_case("FIRST") {
                            NullsOrder::First
                        } else {
                            NullsOrder::Last
                        }
                    });
                    (raw[..start].to_string(), descending, nulls)
                }
                None => (raw.clone(), false, None),
            };

            let target = match parse_column_number(&expr, "ORDER BY")? {
                Some(n) => OrderTarget::OutputColumn(n),
                None => OrderTarget::Expression(Self::normalize(&expr)),
            };
            keys.push(OrderKey {
                target,
                descending,
                nulls,
            });
        }
        Ok(keys)
    }

    /// GROUP BY items; a column number copies the text of that SELECT item.
    pub fn parse_group_by(clause: &str, select: &[Projection]) -> RowqlResult<Vec<GroupKey>> {
        let mut keys = Vec::new();
        for raw in Self::split_multi_expression(clause) {
            let expression = match parse_column_number(&raw, "GROUP BY")? {
                Some(n) => {
                    let item = select.get(n).ok_or_else(|| {
                        RowqlError::SemanticError(format!(
                            "GROUP BY references output column {} but SELECT has {} columns",
                            n + 1,
                            select.len()
                        ))
                    })?;
                    if item.is_star {
                        return Err(RowqlError::SemanticError(
                            "GROUP BY cannot reference a * column".to_string(),
                        ));
                    }
                    item.expression.clone()
                }
                None => Self::normalize(&raw),
            };
            keys.push(GroupKey { expression });
        }
        Ok(keys)
    }

    /// Name for a SELECT item without alias, derived from its text.
    pub fn output_column_name(expression: &str, literals: &LiteralTable) -> String {
        let stripped = ROW_PREFIX_RE.replace_all(expression, "");
        make_valid_identifier(&literals.restore(&stripped, false))
    }
}

/// Turn arbitrary text into an identifier: invalid characters become
/// spaces, runs of spaces become `_`, and a leading `_` is added when the
/// text does not start with a letter or underscore.
pub fn make_valid_identifier(text: &str) -> String {
    let cleaned = NON_IDENT_RE.replace_all(text, " ");
    let joined = SPACES_RE.replace_all(cleaned.trim(), "_").into_owned();
    match joined.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => joined,
        _ => format!("_{}", joined),
    }
}

fn parse_column_number(expr: &str, clause: &str) -> RowqlResult<Option<usize>> {
    match expr.trim().parse::<i64>() {
        Ok(n) if n >= 1 => Ok(Some((n - 1) as usize)),
        Ok(n) => Err(RowqlError::SemanticError(format!(
            "{} column number must be at least 1, got {}",
            clause, n
        ))),
        Err(_) => Ok(None),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Copy a quoted run starting at `i` into `out`, returning the index after it.
fn copy_quoted(chars: &[char], mut i: usize, out: &mut String) -> usize {
    let quote = chars[i];
    out.push(quote);
    i += 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if c == '\\' && i < chars.len() {
            out.push(chars[i]);
            i += 1;
        } else if c == quote {
            break;
        }
    }
    i
}

/// `.name` -> `row.name` and a lone `.` -> `row`.
fn rewrite_leading_dots(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' || c == '"' {
            i = copy_quoted(&chars, i, &mut out);
            continue;
        }
        if c == '.' {
            let prev = if i == 0 { None } else { Some(chars[i - 1]) };
            let attached = matches!(prev, Some(p) if is_word_char(p) || ")]}.\"'`".contains(p));
            let next = chars.get(i + 1).copied();
            if !attached {
                match next {
                    Some(n) if n.is_alphabetic() || n == '_' => {
                        out.push_str("row.");
                        i += 1;
                        continue;
                    }
                    Some(n) if n.is_ascii_digit() => {}
                    _ => {
                        out.push_str("row");
                        i += 1;
                        continue;
                    }
                }
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// `a.b` -> `a['b']`, leaving numbers, method calls (`a.f(`) and
/// placeholders alone.
fn rewrite_member_dots(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 8);
    let mut i = 0;
    let mut last_word = String::new();
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' || c == '"' {
            i = copy_quoted(&chars, i, &mut out);
            last_word.clear();
            continue;
        }
        if is_word_char(c) {
            last_word.push(c);
            out.push(c);
            i += 1;
            continue;
        }
        if c == '.' && i > 0 {
            let prev = chars[i - 1];
            let after_value = is_word_char(prev) || matches!(prev, ')' | ']' | '}');
            let numeric = !last_word.is_empty() && last_word.chars().all(|d| d.is_ascii_digit());
            let start = i + 1;
            let mut end = start;
            if start < chars.len() && (chars[start].is_alphabetic() || chars[start] == '_') {
                end = start + 1;
                while end < chars.len() && is_word_char(chars[end]) {
                    end += 1;
                }
            }
            if after_value && !numeric && end > start {
                let name: String = chars[start..end].iter().collect();
                let mut k = end;
                while k < chars.len() && chars[k].is_whitespace() {
                    k += 1;
                }
                let is_call = chars.get(k) == Some(&'(');
                if !is_call && !is_placeholder(&name) {
                    out.push_str(&format!("['{}']", name));
                    last_word.clear();
                    i = end;
                    continue;
                }
            }
        }
        last_word.clear();
        out.push(c);
        i += 1;
    }
    out
}

/// `a->b` -> `a['b']`, `a->'b c'` -> `a['b c']`, `a->0` -> `a[0]`.
fn rewrite_arrows(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 8);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' || c == '"' {
            i = copy_quoted(&chars, i, &mut out);
            continue;
        }
        if c == '-' && chars.get(i + 1) == Some(&'>') {
            let start = i + 2;
            let mut end = start;
            while end < chars.len() && is_word_char(chars[end]) {
                end += 1;
            }
            if end > start {
                let key: String = chars[start..end].iter().collect();
                if is_placeholder(&key) || key.chars().all(|d| d.is_ascii_digit()) {
                    out.push_str(&format!("[{}]", key));
                } else if !key.chars().next().map(|k| k.is_ascii_digit()).unwrap_or(false) {
                    out.push_str(&format!("['{}']", key));
                } else {
                    out.push_str("->");
                    i += 2;
                    continue;
                }
                i = end;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Replace bound column names with `_values[i]`. A name only matches as a
/// whole word that is not preceded by `.` and is not called as a function.
fn substitute_columns(s: &str, bindings: &ColumnBindings) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 16);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '\'' || c == '"' {
            i = copy_quoted(&chars, i, &mut out);
            continue;
        }
        if is_word_char(c) {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            let preceded_by_dot = start > 0 && chars[start - 1] == '.';
            let mut k = i;
            while k < chars.len() && chars[k].is_whitespace() {
                k += 1;
            }
            let is_call = chars.get(k) == Some(&'(');
            match bindings.position(&word) {
                Some(pos) if !preceded_by_dot && !is_call => {
                    out.push_str(&format!("_values[{}]", pos));
                }
                _ => out.push_str(&word),
            }
            continue;
        }
        out.push(c);
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::literals::QuotedLiteralExtractor;

    fn normalize(expr: &str) -> String {
        ExpressionTranslator::normalize(expr)
    }

    #[test]
    fn test_arrow_rewrite() {
        assert_eq!(normalize("json->hello->world"), "json['hello']['world']");
        assert_eq!(normalize("a->0"), "a[0]");
        let (text, table) = QuotedLiteralExtractor::extract("json->'planet earth'").unwrap();
        assert_eq!(table.restore(&normalize(&text), true), "json['planet earth']");
    }

    #[test]
    fn test_dot_rewrite() {
        assert_eq!(normalize("json.a.b"), "json['a']['b']");
        assert_eq!(normalize("x.upper()"), "x.upper()");
        assert_eq!(normalize("1.5 + a.b"), "1.5 + a['b']");
        assert_eq!(normalize("f(x).y"), "f(x)['y']");
    }

    #[test]
    fn test_leading_dot() {
        assert_eq!(normalize(".name"), "row['name']");
        assert_eq!(normalize("."), "row");
        assert_eq!(normalize("f(.a, .)"), "f(row['a'], row)");
        assert_eq!(normalize("x + .5"), "x + .5");
    }

    #[test]
    fn test_count_star() {
        assert_eq!(normalize("count_agg(*)"), "count_agg(1)");
        assert_eq!(normalize("count_agg( * )"), "count_agg(1)");
        assert_eq!(normalize("count_distinct_agg(*)"), "count_distinct_agg(_values)");
    }

    #[test]
    fn test_split_multi_expression() {
        assert_eq!(
            ExpressionTranslator::split_multi_expression("abc, (123 + 1) * 2, f(a,b), [1,2], {'a': 1, 'b': 2}"),
            vec!["abc", "(123 + 1) * 2", "f(a,b)", "[1,2]", "{'a': 1, 'b': 2}"]
        );
    }

    #[test]
    fn test_substitution_word_boundaries() {
        let bindings = ColumnBindings::new(2, &["a".to_string(), "ab".to_string()]);
        let literals = LiteralTable::default();
        assert_eq!(
            ExpressionTranslator::prepare("a + ab + abc + x.a + col2", &bindings, &literals),
            "_values[0] + _values[1] + abc + x.a + _values[1]"
        );
    }

    #[test]
    fn test_substitution_skips_calls_and_strings() {
        let bindings = ColumnBindings::new(1, &["len".to_string()]);
        let literals = LiteralTable::default();
        assert_eq!(
            ExpressionTranslator::prepare("len(len) + 'len'", &bindings, &literals),
            "len(_values[0]) + 'len'"
        );
    }

    #[test]
    fn test_parse_select() {
        let (text, table) =
            QuotedLiteralExtractor::extract("DISTINCT a AS 'my col', 1+2, *, json->x").unwrap();
        let (items, distinct, partials) = ExpressionTranslator::parse_select(&text, &table).unwrap();
        assert!(distinct);
        assert!(!partials);
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].name, "my col");
        assert_eq!(items[1].name, "_1_2");
        assert!(items[2].is_star);
        assert_eq!(items[3].name, "x");
    }

    #[test]
    fn test_output_names() {
        let table = LiteralTable::default();
        let name = |e: &str| {
            ExpressionTranslator::output_column_name(&ExpressionTranslator::normalize(e), &table)
        };
        assert_eq!(name("NULL"), "NULL");
        assert_eq!(name("json.two.b"), "two_b");
        assert_eq!(name("col1 * 2"), "col1_2");
        assert_eq!(name("int(col1)"), "int_col1");
    }

    #[test]
    fn test_partials_modifier() {
        let table = LiteralTable::default();
        let (_, distinct, partials) =
            ExpressionTranslator::parse_select("partials sum_agg(x)", &table).unwrap();
        assert!(!distinct);
        assert!(partials);
    }

    #[test]
    fn test_parse_order_by() {
        let keys = ExpressionTranslator::parse_order_by("a DESC, 2, b NULLS FIRST, c desc nulls last").unwrap();
        assert_eq!(keys.len(), 4);
        assert!(keys[0].descending);
        assert!(keys[0].nulls_first());
        assert_eq!(keys[1].target, OrderTarget::OutputColumn(1));
        assert!(!keys[1].nulls_first());
        assert_eq!(keys[2].nulls, Some(NullsOrder::First));
        assert!(keys[2].nulls_first());
        assert!(keys[3].descending);
        assert!(!keys[3].nulls_first());
        assert_eq!(keys[3].target, OrderTarget::Expression("c".to_string()));
    }

    #[test]
    fn test_parse_group_by_column_number() {
        let table = LiteralTable::default();
        let (select, _, _) = ExpressionTranslator::parse_select("col1 % 2, count_agg(*)", &table).unwrap();
        let keys = ExpressionTranslator::parse_group_by("1", &select).unwrap();
        assert_eq!(keys[0].expression, "col1 % 2");
        assert!(ExpressionTranslator::parse_group_by("3", &select).is_err());
        assert!(ExpressionTranslator::parse_order_by("0").is_err());
    }

    #[test]
    fn test_make_valid_identifier() {
        assert_eq!(make_valid_identifier("hello world!"), "hello_world");
        assert_eq!(make_valid_identifier("1st"), "_1st");
        assert_eq!(make_valid_identifier("ok"), "ok");
    }
}
