//! Structural parsing: splitting a query into its clauses.
//!
//! Works on whitespace-delimited tokens of the literal-free query text, so the
//! contents of each clause are never interpreted here.

use std::fmt;

use crate::error::{RowqlError, RowqlResult};

/// Clause keywords in their mandatory order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClauseKeyword {
    Import,
    Select,
    From,
    Explode,
    Where,
    GroupBy,
    OrderBy,
    Limit,
    Offset,
    To,
}

impl ClauseKeyword {
    pub const ALL: [ClauseKeyword; 10] = [
        ClauseKeyword::Import,
        ClauseKeyword::Select,
        ClauseKeyword::From,
        ClauseKeyword::Explode,
        ClauseKeyword::Where,
        ClauseKeyword::GroupBy,
        ClauseKeyword::OrderBy,
        ClauseKeyword::Limit,
        ClauseKeyword::Offset,
        ClauseKeyword::To,
    ];

    /// Lower-case words making up the keyword.
    pub fn words(self) -> &'static [&'static str] {
        match self {
            ClauseKeyword::Import => &["import"],
            ClauseKeyword::Select => &["select"],
            ClauseKeyword::From => &["from"],
            ClauseKeyword::Explode => &["explode"],
            ClauseKeyword::Where => &["where"],
            ClauseKeyword::GroupBy => &["group", "by"],
            ClauseKeyword::OrderBy => &["order", "by"],
            ClauseKeyword::Limit => &["limit"],
            ClauseKeyword::Offset => &["offset"],
            ClauseKeyword::To => &["to"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClauseKeyword::Import => "IMPORT",
            ClauseKeyword::Select => "SELECT",
            ClauseKeyword::From => "FROM",
            ClauseKeyword::Explode => "EXPLODE",
            ClauseKeyword::Where => "WHERE",
            ClauseKeyword::GroupBy => "GROUP BY",
            ClauseKeyword::OrderBy => "ORDER BY",
            ClauseKeyword::Limit => "LIMIT",
            ClauseKeyword::Offset => "OFFSET",
            ClauseKeyword::To => "TO",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Keyword whose first word is `token` (case-insensitive).
    fn starting_with(token: &str) -> Option<ClauseKeyword> {
        let lower = token.to_lowercase();
        Self::ALL.into_iter().find(|kw| kw.words()[0] == lower)
    }
}

impl fmt::Display for ClauseKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw text of every clause present in a query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryStructure {
    clauses: [Option<String>; 10],
}

impl QueryStructure {
    pub fn get(&self, keyword: ClauseKeyword) -> Option<&str> {
        self.clauses[keyword.index()].as_deref()
    }

    /// Clause text, treating an empty clause as absent.
    pub fn non_empty(&self, keyword: ClauseKeyword) -> Option<&str> {
        self.get(keyword).filter(|text| !text.trim().is_empty())
    }

    pub fn contains(&self, keyword: ClauseKeyword) -> bool {
        self.clauses[keyword.index()].is_some()
    }

    fn set(&mut self, keyword: ClauseKeyword, text: String) {
        self.clauses[keyword.index()] = Some(text);
    }
}

pub struct ClauseParser;

impl ClauseParser {
    /// Split `query` (already stripped of quoted literals) into clauses.
    pub fn parse_structure(query: &str) -> RowqlResult<QueryStructure> {
        let tokens = Self::tokenize(query);
        let mut structure = QueryStructure::default();

        let positions: Vec<(usize, ClauseKeyword)> = tokens
            .iter()
            .enumerate()
            .filter_map(|(i, token)| {
                let kw = ClauseKeyword::starting_with(token)?;
                let words = kw.words();
                let matches = words.iter().enumerate().all(|(j, word)| {
                    tokens
                        .get(i + j)
                        .map(|t| t.to_lowercase() == *word)
                        .unwrap_or(false)
                });
                matches.then_some((i, kw))
            })
            .collect();

        let Some(&(first_pos, _)) = positions.first() else {
            return Err(RowqlError::SyntaxError(
                "SELECT keyword is missing".to_string(),
            ));
        };

        if first_pos > 0 {
            return Err(RowqlError::SyntaxError(format!(
                "misplaced '{}' at the beginning of the query",
                tokens[0]
            )));
        }

        let mut last: Option<ClauseKeyword> = None;
        for (i, &(pos, kw)) in positions.iter().enumerate() {
            if let Some(prev) = last {
                if prev >= kw {
                    return Err(RowqlError::SyntaxError(format!(
                        "misplaced '{}' clause",
                        kw.as_str().to_lowercase()
                    )));
                }
            }
            last = Some(kw);

            let start = pos + kw.words().len();
            let end = positions.get(i + 1).map(|&(p, _)| p).unwrap_or(tokens.len());
            structure.set(kw, tokens[start..end].join(" "));
        }

        if structure.non_empty(ClauseKeyword::Select).is_none() {
            return Err(RowqlError::SyntaxError(
                "SELECT keyword is missing".to_string(),
            ));
        }

        tracing::debug!(?structure, "parsed query structure");
        Ok(structure)
    }

    /// Whitespace tokens with `#` comments removed.
    fn tokenize(query: &str) -> Vec<String> {
        query
            .lines()
            .flat_map(|line| {
                let code = line.split('#').next().unwrap_or("");
                code.split_whitespace().map(str::to_string).collect::<Vec<_>>()
            })
            .collect()
    }
}
