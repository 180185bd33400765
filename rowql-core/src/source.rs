//! Row sources consumed by the execution engine.

use std::collections::VecDeque;

use serde_json::Value;

use crate::error::RowqlResult;

/// One item pulled from a source.
#[derive(Debug, Clone, PartialEq)]
pub enum InputRecord {
    /// Column names. Only meaningful before the first data row.
    Header(Vec<String>),
    Values(Vec<Value>),
}

/// Pull-based producer of input rows.
///
/// The engine stops calling [`RowSource::next_record`] as soon as the query
/// is satisfied, so implementations must not rely on being drained.
pub trait RowSource {
    fn next_record(&mut self) -> RowqlResult<Option<InputRecord>>;
}

/// In-memory rows, optionally preceded by a header.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    header: Option<Vec<String>>,
    rows: VecDeque<Vec<Value>>,
}

impl VecSource {
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        Self {
            header: None,
            rows: rows.into(),
        }
    }

    pub fn with_header(header: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            header: Some(header),
            rows: rows.into(),
        }
    }

    /// Rows of a FROM expression: each element of an array is a row (inner
    /// arrays spread into columns, anything else is a single column); a
    /// scalar is one single-column row. NULL yields no rows.
    pub fn from_value(value: Value) -> Self {
        let rows = match value {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Array(cols) => cols,
                    other => vec![other],
                })
                .collect(),
            other => vec![vec![other]],
        };
        Self::new(rows)
    }

    /// Source used when a query has no FROM: a single row with one NULL column.
    pub fn single_null() -> Self {
        Self::new(vec![vec![Value::Null]])
    }
}

impl RowSource for VecSource {
    fn next_record(&mut self) -> RowqlResult<Option<InputRecord>> {
        if let Some(header) = self.header.take() {
            return Ok(Some(InputRecord::Header(header)));
        }
        Ok(self.rows.pop_front().map(InputRecord::Values))
    }
}
