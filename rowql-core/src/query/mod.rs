//! Query parsing: from raw text to a [`ParsedQuery`].
//!
//! Quoted literals are extracted first, then the text is split into clauses
//! and every clause is translated on its own. Expressions stay as text here;
//! they are compiled by the execution engine once the input columns are
//! known.

pub mod clauses;
pub mod literals;
pub mod translate;

pub use clauses::{ClauseKeyword, ClauseParser, QueryStructure};
pub use literals::{LiteralTable, QuotedLiteral, QuotedLiteralExtractor};
pub use translate::{
    default_column_name, make_valid_identifier, ColumnBindings, ExpressionTranslator, GroupKey,
    NullsOrder, OrderKey, OrderTarget, Projection,
};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::diagnostics::WarningPolicy;
use crate::error::{RowqlError, RowqlResult};
use crate::executor::{is_aggregate, MODULES};

/// Formats understood in the FROM clause.
pub const READER_FORMATS: &[&str] = &["CSV", "JSON", "TEXT"];
/// Formats understood in the TO clause.
pub const WRITER_FORMATS: &[&str] = &["CSV", "JSON", "PRETTY", "SQL", "MEMORY"];

/// Group key used when a query aggregates without GROUP BY.
const OVERALL_GROUP: &str = "'_OVERALL_'";

static FUNC_CALL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\s*\(").expect("valid regex"));
static FORMAT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^(\w+)\s*(\(?.*)$").expect("valid regex"));
static KWARG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^([A-Za-z_]\w*)\s*=([^=].*)$").expect("valid regex"));
static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([A-Za-z_][\w]*)(?:\s+AS\s+([A-Za-z_]\w*))?$").expect("valid regex")
});

/// `csv('data.csv', delimiter=';')`: a reader or writer with its arguments
/// (still expression text).
#[derive(Debug, Clone, PartialEq)]
pub struct FormatCall {
    pub name: String,
    pub args: Vec<String>,
    pub kwargs: Vec<(String, String)>,
}

/// A FROM or TO clause.
#[derive(Debug, Clone, PartialEq)]
pub enum ClauseTarget {
    Format(FormatCall),
    Expression(String),
}

/// `IMPORT module [AS alias]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub module: String,
    pub alias: String,
}

#[derive(Debug, Clone)]
pub struct ParsedQuery {
    pub imports: Vec<ImportSpec>,
    pub select: Vec<Projection>,
    pub distinct: bool,
    pub partials: bool,
    pub from: Option<ClauseTarget>,
    pub explode: Option<String>,
    pub where_clause: Option<String>,
    /// Empty when the query does not group.
    pub group_by: Vec<GroupKey>,
    pub order_by: Vec<OrderKey>,
    /// `None` means unbounded.
    pub limit: Option<u64>,
    pub offset: u64,
    pub to: ClauseTarget,
    pub literals: LiteralTable,
}

impl ParsedQuery {
    pub fn has_group_by(&self) -> bool {
        !self.group_by.is_empty()
    }

    pub fn has_order_by(&self) -> bool {
        !self.order_by.is_empty()
    }
}

/// Parse a query. `default_to` is the writer used when TO is absent.
pub fn parse(query: &str, default_to: &str, warnings: WarningPolicy) -> RowqlResult<ParsedQuery> {
    let (text, literals) = QuotedLiteralExtractor::extract(query)?;
    let structure = ClauseParser::parse_structure(&text)?;
    let query_aggregates = aggregate_calls(&text);

    let select_text = structure
        .non_empty(ClauseKeyword::Select)
        .ok_or_else(|| RowqlError::SyntaxError("SELECT keyword is missing".to_string()))?;
    let (select, distinct, partials) = ExpressionTranslator::parse_select(select_text, &literals)?;

    let imports = match structure.non_empty(ClauseKeyword::Import) {
        Some(clause) => parse_imports(clause)?,
        None => Vec::new(),
    };

    let from = match structure.non_empty(ClauseKeyword::From) {
        Some(clause) => {
            reject_aggregates(clause, ClauseKeyword::From)?;
            Some(parse_target(clause, READER_FORMATS))
        }
        None => None,
    };

    let explode = structure
        .non_empty(ClauseKeyword::Explode)
        .map(ExpressionTranslator::normalize);

    let where_clause = match structure.non_empty(ClauseKeyword::Where) {
        Some(clause) => {
            reject_aggregates(clause, ClauseKeyword::Where)?;
            Some(ExpressionTranslator::normalize(clause))
        }
        None => None,
    };

    let order_by = match structure.non_empty(ClauseKeyword::OrderBy) {
        Some(clause) => ExpressionTranslator::parse_order_by(clause)?,
        None => Vec::new(),
    };

    let group_by = match structure.non_empty(ClauseKeyword::GroupBy) {
        Some(clause) => {
            let keys = ExpressionTranslator::parse_group_by(clause, &select)?;
            for key in &keys {
                reject_aggregates(&key.expression, ClauseKeyword::GroupBy)?;
            }
            keys
        }
        None if !query_aggregates.is_empty() => {
            if !order_by.is_empty() {
                warnings.warn("ORDER BY is useless since output will have a single result")?;
            }
            vec![GroupKey {
                expression: OVERALL_GROUP.to_string(),
            }]
        }
        None => Vec::new(),
    };

    if distinct && !group_by.is_empty() {
        return Err(RowqlError::SemanticError(
            "DISTINCT cannot be used in aggregation queries".to_string(),
        ));
    }

    let limit = structure
        .non_empty(ClauseKeyword::Limit)
        .and_then(parse_row_count);
    let offset = structure
        .non_empty(ClauseKeyword::Offset)
        .and_then(parse_row_count)
        .unwrap_or(0);

    let to = match structure.non_empty(ClauseKeyword::To) {
        Some(clause) => parse_target(clause, WRITER_FORMATS),
        None => ClauseTarget::Format(FormatCall {
            name: default_to.to_string(),
            args: Vec::new(),
            kwargs: Vec::new(),
        }),
    };

    let parsed = ParsedQuery {
        imports,
        select,
        distinct,
        partials,
        from,
        explode,
        where_clause,
        group_by,
        order_by,
        limit,
        offset,
        to,
        literals,
    };
    tracing::debug!(?parsed, "parsed query");
    Ok(parsed)
}

/// Names of the aggregate functions called in `text`.
fn aggregate_calls(text: &str) -> Vec<String> {
    FUNC_CALL_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .filter(|name| is_aggregate(name))
        .collect()
}

fn reject_aggregates(text: &str, clause: ClauseKeyword) -> RowqlResult<()> {
    let found = aggregate_calls(text);
    if found.is_empty() {
        return Ok(());
    }
    Err(RowqlError::SemanticError(format!(
        "aggregate functions are not allowed in {} clause: {}",
        clause,
        found.join(",")
    )))
}

/// LIMIT/OFFSET value: negative counts clamp to zero, anything that is not
/// an integer (e.g. `ALL`) means no bound.
fn parse_row_count(text: &str) -> Option<u64> {
    text.trim().parse::<i64>().ok().map(|n| n.max(0) as u64)
}

fn parse_imports(clause: &str) -> RowqlResult<Vec<ImportSpec>> {
    let mut imports = Vec::new();
    for item in ExpressionTranslator::split_multi_expression(clause) {
        let caps = IMPORT_RE.captures(item.trim()).ok_or_else(|| {
            RowqlError::SyntaxError(format!("invalid IMPORT item '{}'", item))
        })?;
        let module = caps[1].to_string();
        if !MODULES.contains(&module.as_str()) {
            return Err(RowqlError::ModuleNotFound(module));
        }
        let alias = caps
            .get(2)
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| module.clone());
        imports.push(ImportSpec { module, alias });
    }
    Ok(imports)
}

/// A FROM/TO clause is a format call when it starts with a known format
/// name followed by nothing or by a parenthesized argument list.
fn parse_target(clause: &str, formats: &[&str]) -> ClauseTarget {
    let clause = clause.trim();
    if let Some(caps) = FORMAT_RE.captures(clause) {
        let name = &caps[1];
        let rest = caps[2].trim();
        let is_call = rest.is_empty() || (rest.starts_with('(') && rest.ends_with(')'));
        if is_call && formats.contains(&name.to_uppercase().as_str()) {
            let inner = if rest.is_empty() {
                ""
            } else {
                &rest[1..rest.len() - 1]
            };
            let (args, kwargs) = split_call_args(inner);
            return ClauseTarget::Format(FormatCall {
                name: name.to_string(),
                args,
                kwargs,
            });
        }
    }
    ClauseTarget::Expression(ExpressionTranslator::normalize(clause))
}

fn split_call_args(inner: &str) -> (Vec<String>, Vec<(String, String)>) {
    let mut args = Vec::new();
    let mut kwargs = Vec::new();
    if inner.trim().is_empty() {
        return (args, kwargs);
    }
    for part in ExpressionTranslator::split_multi_expression(inner) {
        match KWARG_RE.captures(&part) {
            Some(caps) => kwargs.push((
                caps[1].to_string(),
                ExpressionTranslator::normalize(&caps[2]),
            )),
            None => args.push(ExpressionTranslator::normalize(&part)),
        }
    }
    (args, kwargs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(query: &str) -> ParsedQuery {
        parse(query, "memory", WarningPolicy::Default).unwrap()
    }

    fn err(query: &str) -> RowqlError {
        parse(query, "memory", WarningPolicy::Default).unwrap_err()
    }

    #[test]
    fn test_full_query() {
        let q = p("SELECT DISTINCT a, b AS bee FROM csv('x.csv', delimiter=';') \
                   WHERE a > 1 ORDER BY 2 DESC NULLS LAST LIMIT 10 OFFSET 2 TO json");
        assert!(q.distinct);
        assert_eq!(q.select.len(), 2);
        assert_eq!(q.select[1].name, "bee");
        match q.from {
            Some(ClauseTarget::Format(call)) => {
                assert_eq!(call.name, "csv");
                assert_eq!(call.args.len(), 1);
                assert_eq!(call.kwargs[0].0, "delimiter");
            }
            other => panic!("unexpected FROM {:?}", other),
        }
        assert_eq!(q.order_by[0].target, OrderTarget::OutputColumn(1));
        assert!(q.order_by[0].descending);
        assert_eq!(q.limit, Some(10));
        assert_eq!(q.offset, 2);
        assert!(matches!(q.to, ClauseTarget::Format(ref c) if c.name == "json"));
    }

    #[test]
    fn test_from_expression() {
        let q = p("SELECT col1 FROM [1, 2, 3]");
        assert_eq!(q.from, Some(ClauseTarget::Expression("[1, 2, 3]".to_string())));
        let q = p("SELECT col1 FROM range(10)");
        assert!(matches!(q.from, Some(ClauseTarget::Expression(_))));
        let q = p("SELECT 1");
        assert!(q.from.is_none());
        assert!(matches!(q.to, ClauseTarget::Format(ref c) if c.name == "memory"));
    }

    #[test]
    fn test_implicit_group() {
        let q = p("SELECT count_agg(*) FROM [1, 2]");
        assert_eq!(q.group_by.len(), 1);
        assert_eq!(q.group_by[0].expression, OVERALL_GROUP);
        assert!(parse(
            "SELECT count_agg(*) FROM [1] ORDER BY 1",
            "memory",
            WarningPolicy::Error
        )
        .is_err());
    }

    #[test]
    fn test_semantic_errors() {
        assert!(matches!(err("SELECT a FROM x WHERE sum_agg(a) > 1"), RowqlError::SemanticError(_)));
        assert!(matches!(err("SELECT sum_agg(a) FROM x GROUP BY 1"), RowqlError::SemanticError(_)));
        assert!(matches!(
            err("SELECT DISTINCT a, count_agg(*) FROM x GROUP BY 1"),
            RowqlError::SemanticError(_)
        ));
        assert!(matches!(err("SELECT 1 FROM list_agg(1)"), RowqlError::SemanticError(_)));
    }

    #[test]
    fn test_limit_and_offset_values() {
        assert_eq!(p("SELECT 1 LIMIT ALL").limit, None);
        assert_eq!(p("SELECT 1 LIMIT -5").limit, Some(0));
        assert_eq!(p("SELECT 1 OFFSET -2").offset, 0);
    }

    #[test]
    fn test_imports() {
        let q = p("IMPORT math, re AS regex SELECT 1");
        assert_eq!(
            q.imports,
            vec![
                ImportSpec { module: "math".into(), alias: "math".into() },
                ImportSpec { module: "re".into(), alias: "regex".into() },
            ]
        );
        assert!(matches!(err("IMPORT numpy SELECT 1"), RowqlError::ModuleNotFound(_)));
    }

    #[test]
    fn test_quoted_literals_survive_clause_splitting() {
        let q = p("SELECT 'a, FROM b' AS s FROM [1]");
        assert_eq!(q.select.len(), 1);
        assert_eq!(q.select[0].name, "s");
        assert_eq!(q.literals.restore(&q.select[0].expression, true), "'a, FROM b'");
    }

    #[test]
    fn test_clause_order() {
        assert!(matches!(err("SELECT 1 WHERE 1 FROM x"), RowqlError::SyntaxError(_)));
        assert!(matches!(err("FROM x"), RowqlError::SyntaxError(_)));
    }
}
