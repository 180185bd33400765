//! Row writers and the in-memory result.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RowqlResult;

/// Consumer of output rows: one header, any number of rows, then a flush.
pub trait RowWriter {
    fn write_header(&mut self, columns: &[String]) -> RowqlResult<()>;

    fn write_row(&mut self, values: Vec<Value>) -> RowqlResult<()>;

    fn flush(&mut self) -> RowqlResult<()> {
        Ok(())
    }
}

/// Result of a query written `TO memory`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryOutput {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows as objects keyed by column name. With duplicate names the last
    /// column wins.
    pub fn to_objects(&self) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                Value::Object(obj)
            })
            .collect()
    }

    /// All values of the named column.
    pub fn column(&self, name: &str) -> Option<Vec<Value>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.column_at(idx))
    }

    /// All values of the column at `idx` (0-based); short rows give NULL.
    pub fn column_at(&self, idx: usize) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.get(idx).cloned().unwrap_or(Value::Null))
            .collect()
    }
}

/// Collects everything into a [`QueryOutput`].
#[derive(Debug, Default)]
pub struct MemoryWriter {
    output: QueryOutput,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output(&self) -> &QueryOutput {
        &self.output
    }

    pub fn into_output(self) -> QueryOutput {
        self.output
    }
}

impl RowWriter for MemoryWriter {
    fn write_header(&mut self, columns: &[String]) -> RowqlResult<()> {
        self.output.columns = columns.to_vec();
        Ok(())
    }

    fn write_row(&mut self, values: Vec<Value>) -> RowqlResult<()> {
        self.output.rows.push(values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_writer_collects() {
        let mut w = MemoryWriter::new();
        w.write_header(&["a".to_string(), "b".to_string()]).unwrap();
        w.write_row(vec![json!(1), json!("x")]).unwrap();
        w.write_row(vec![json!(2)]).unwrap();
        let out = w.into_output();
        assert_eq!(out.len(), 2);
        assert_eq!(out.column("a"), Some(vec![json!(1), json!(2)]));
        assert_eq!(out.column_at(1), vec![json!("x"), Value::Null]);
        assert_eq!(out.to_objects()[0], json!({"a": 1, "b": "x"}));
        assert!(out.column("zzz").is_none());
    }
}
