use std::io::Write;

use rowql_core::{RowWriter, RowqlResult};
use serde_json::Value;

use super::io_error;
use crate::error::FormatResult;
use crate::formats::FormatOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct SqlWriterOptions {
    pub table: String,
    pub chunk_size: usize,
}

impl Default for SqlWriterOptions {
    fn default() -> Self {
        Self {
            table: "table_name".to_string(),
            chunk_size: 1000,
        }
    }
}

impl SqlWriterOptions {
    pub fn from_options(options: &mut FormatOptions) -> FormatResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            table: options.take_string("table")?.unwrap_or(defaults.table),
            chunk_size: options
                .take_usize("chunk_size")?
                .unwrap_or(defaults.chunk_size)
                .max(1),
        })
    }
}

/// `INSERT INTO` statements with up to `chunk_size` rows each.
pub struct SqlWriter {
    output: Box<dyn Write>,
    options: SqlWriterOptions,
    statement_head: String,
    chunk: Vec<String>,
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn sql_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string().to_uppercase(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

impl SqlWriter {
    pub fn new(output: Box<dyn Write>, options: SqlWriterOptions) -> Self {
        Self {
            output,
            options,
            statement_head: String::new(),
            chunk: Vec::new(),
        }
    }

    fn write_statement(&mut self) -> RowqlResult<()> {
        if self.chunk.is_empty() {
            return Ok(());
        }
        writeln!(
            self.output,
            "{} VALUES {};",
            self.statement_head,
            self.chunk.join(",")
        )
        .map_err(io_error)?;
        self.chunk.clear();
        Ok(())
    }
}

impl RowWriter for SqlWriter {
    fn write_header(&mut self, columns: &[String]) -> RowqlResult<()> {
        let cols: Vec<String> = columns.iter().map(|c| quote_identifier(c)).collect();
        self.statement_head = format!(
            "INSERT INTO {}({})",
            quote_identifier(&self.options.table),
            cols.join(",")
        );
        Ok(())
    }

    fn write_row(&mut self, values: Vec<Value>) -> RowqlResult<()> {
        let literals: Vec<String> = values.iter().map(sql_literal).collect();
        self.chunk.push(format!("({})", literals.join(",")));
        if self.chunk.len() >= self.options.chunk_size {
            self.write_statement()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> RowqlResult<()> {
        self.write_statement()?;
        self.output.flush().map_err(io_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_literals() {
        assert_eq!(sql_literal(&Value::Null), "NULL");
        assert_eq!(sql_literal(&json!(1.5)), "1.5");
        assert_eq!(sql_literal(&json!("it's")), "'it''s'");
        assert_eq!(sql_literal(&json!(true)), "TRUE");
    }
}
