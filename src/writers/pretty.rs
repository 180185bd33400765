//! Aligned plain-text table. Rows are collected and the table is rendered on
//! flush, since column widths depend on every row.

use std::io::Write;

use rowql_core::executor::display_value;
use rowql_core::{RowWriter, RowqlResult};
use serde_json::Value;

use super::io_error;

pub struct PrettyWriter {
    output: Box<dyn Write>,
    header: bool,
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl PrettyWriter {
    pub fn new(output: Box<dyn Write>, header: bool) -> Self {
        Self {
            output,
            header,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn render(&self) -> String {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(display_value).collect())
            .collect();
        let ncols = self
            .columns
            .len()
            .max(cells.iter().map(Vec::len).max().unwrap_or(0));

        let mut widths = vec![0usize; ncols];
        if self.header {
            for (i, name) in self.columns.iter().enumerate() {
                widths[i] = widths[i].max(name.chars().count());
            }
        }
        for row in &cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let mut out = String::new();
        if self.header {
            let names: Vec<String> = (0..ncols)
                .map(|i| {
                    let name = self.columns.get(i).map(String::as_str).unwrap_or("");
                    format!("{:<w$}", name, w = widths[i])
                })
                .collect();
            out.push_str(names.join("  ").trim_end());
            out.push('\n');
            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            out.push_str(&rule.join("  "));
            out.push('\n');
        }
        for (row, texts) in self.rows.iter().zip(&cells) {
            let line: Vec<String> = (0..ncols)
                .map(|i| {
                    let text = texts.get(i).map(String::as_str).unwrap_or("");
                    match row.get(i) {
                        Some(Value::Number(_)) => format!("{:>w$}", text, w = widths[i]),
                        _ => format!("{:<w$}", text, w = widths[i]),
                    }
                })
                .collect();
            out.push_str(line.join("  ").trim_end());
            out.push('\n');
        }
        out
    }
}

impl RowWriter for PrettyWriter {
    fn write_header(&mut self, columns: &[String]) -> RowqlResult<()> {
        self.columns = columns.to_vec();
        Ok(())
    }

    fn write_row(&mut self, values: Vec<Value>) -> RowqlResult<()> {
        self.rows.push(values);
        Ok(())
    }

    fn flush(&mut self) -> RowqlResult<()> {
        if !self.columns.is_empty() || !self.rows.is_empty() {
            let table = self.render();
            self.output.write_all(table.as_bytes()).map_err(io_error)?;
            self.rows.clear();
            self.columns.clear();
        }
        self.output.flush().map_err(io_error)
    }
}
