//! Quoted literal extraction.
//!
//! String literals are swapped for opaque placeholder tokens before the query
//! is split into clauses, so commas and keywords inside strings never confuse
//! the structural parser. Placeholders look like `__` + 12 ASCII letters + `__`.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;

use crate::error::{RowqlError, RowqlResult};

const PLACEHOLDER_LEN: usize = 12;

static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"__[a-zA-Z]{{{}}}__", PLACEHOLDER_LEN)).expect("valid placeholder regex")
});

/// A literal as it appeared in the query, quotes stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotedLiteral {
    pub quote: char,
    pub text: String,
}

impl QuotedLiteral {
    /// The literal's value with escapes resolved.
    pub fn unescaped(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        let mut chars = self.text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch == self.quote && chars.peek() == Some(&self.quote) {
                chars.next();
                out.push(ch);
            } else if ch == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                }
            } else {
                out.push(ch);
            }
        }
        out
    }
}

/// Mapping placeholder -> literal produced by [`QuotedLiteralExtractor::extract`].
#[derive(Debug, Clone, Default)]
pub struct LiteralTable {
    literals: HashMap<String, QuotedLiteral>,
}

impl LiteralTable {
    pub fn get(&self, placeholder: &str) -> Option<&QuotedLiteral> {
        self.literals.get(placeholder)
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    /// If the whole (trimmed) text is one placeholder, return its literal.
    pub fn whole_literal(&self, text: &str) -> Option<&QuotedLiteral> {
        self.literals.get(text.trim())
    }

    /// Put literals back in place of their placeholders. With `quote` the
    /// literal is re-wrapped in its original quote character, otherwise the
    /// bare text is inserted. Unknown placeholder-like tokens are left alone.
    pub fn restore(&self, text: &str, quote: bool) -> String {
        if self.literals.is_empty() {
            return text.to_string();
        }
        PLACEHOLDER_RE
            .replace_all(text, |caps: &regex::Captures| {
                let token = &caps[0];
                match self.literals.get(token) {
                    Some(lit) if quote => format!("{}{}{}", lit.quote, lit.text, lit.quote),
                    Some(lit) => lit.text.clone(),
                    None => token.to_string(),
                }
            })
            .into_owned()
    }
}

pub struct QuotedLiteralExtractor;

impl QuotedLiteralExtractor {
    /// Replace every single- or double-quoted run with a fresh placeholder.
    /// Doubled quotes (`'it''s'`) and backslash escapes stay inside the literal.
    pub fn extract(query: &str) -> RowqlResult<(String, LiteralTable)> {
        let mut table = LiteralTable::default();
        let mut rewritten = String::with_capacity(query.len());
        let chars: Vec<char> = query.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            if ch != '\'' && ch != '"' {
                rewritten.push(ch);
                i += 1;
                continue;
            }

            let quote = ch;
            let start = i;
            let mut text = String::new();
            i += 1;
            let mut closed = false;
            while i < chars.len() {
                let c = chars[i];
                if c == '\\' && i + 1 < chars.len() {
                    text.push(c);
                    text.push(chars[i + 1]);
                    i += 2;
                } else if c == quote {
                    if chars.get(i + 1) == Some(&quote) {
                        text.push(c);
                        text.push(c);
                        i += 2;
                    } else {
                        i += 1;
                        closed = true;
                        break;
                    }
                } else {
                    text.push(c);
                    i += 1;
                }
            }

            if !closed {
                let snippet: String = chars[start..].iter().take(30).collect();
                return Err(RowqlError::SyntaxError(format!(
                    "unterminated string literal starting at {}",
                    snippet
                )));
            }

            let placeholder = Self::new_placeholder(query, &table);
            rewritten.push_str(&placeholder);
            table
                .literals
                .insert(placeholder, QuotedLiteral { quote, text });
        }

        Ok((rewritten, table))
    }

    fn new_placeholder(query: &str, table: &LiteralTable) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let body: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .filter(|c| c.is_ascii_alphabetic())
                .take(PLACEHOLDER_LEN)
                .map(char::from)
                .collect();
            let candidate = format!("__{}__", body);
            if !query.contains(&candidate) && !table.literals.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

/// True when `token` is a placeholder produced by the extractor.
pub fn is_placeholder(token: &str) -> bool {
    token.len() == PLACEHOLDER_LEN + 4 && PLACEHOLDER_RE.is_match(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_replaces_literals() {
        let (text, table) =
            QuotedLiteralExtractor::extract("SELECT 'a, b', \"FROM x\" FROM y").unwrap();
        assert_eq!(table.len(), 2);
        assert!(!text.contains("a, b"));
        assert!(!text.contains("FROM x"));
        assert!(text.ends_with("FROM y"));
    }

    #[test]
    fn test_round_trip() {
        let queries = [
            "SELECT 'hello' FROM x",
            "SELECT \"it's\", 'say \"hi\"' FROM y WHERE a == 'b'",
            "SELECT 'don''t', '\\'' ",
            "no literals at all",
            "",
        ];
        for q in queries {
            let (text, table) = QuotedLiteralExtractor::extract(q).unwrap();
            assert_eq!(table.restore(&text, true), q);
        }
    }

    #[test]
    fn test_restore_without_quotes() {
        let (text, table) = QuotedLiteralExtractor::extract("x->'a b'").unwrap();
        assert_eq!(table.restore(&text, false), "x->a b");
    }

    #[test]
    fn test_unterminated_literal() {
        let err = QuotedLiteralExtractor::extract("SELECT 'abc FROM x").unwrap_err();
        assert!(matches!(err, RowqlError::SyntaxError(_)));
    }

    #[test]
    fn test_placeholder_shape() {
        let (text, table) = QuotedLiteralExtractor::extract("'x'").unwrap();
        assert!(is_placeholder(&text));
        assert_eq!(table.whole_literal(&text).unwrap().text, "x");
    }

    #[test]
    fn test_unescaped() {
        let lit = QuotedLiteral {
            quote: '\'',
            text: "don''t\\n".to_string(),
        };
        assert_eq!(lit.unescaped(), "don't\n");
    }

    #[test]
    fn test_unknown_placeholder_left_alone() {
        let (_, table) = QuotedLiteralExtractor::extract("'x'").unwrap();
        let text = "__abcdefghijkl__";
        assert_eq!(table.restore(text, true), text);
    }
}
