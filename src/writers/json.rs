use std::io::Write;

use rowql_core::{RowWriter, RowqlResult};
use serde_json::{Map, Value};

use super::io_error;
use crate::error::FormatError;

/// JSON lines, one object per row keyed by column name. A single column
/// holding an object (e.g. `SELECT json FROM json`) is written as is.
pub struct JsonWriter {
    output: Box<dyn Write>,
    columns: Vec<String>,
    unbuffered: bool,
}

impl JsonWriter {
    pub fn new(output: Box<dyn Write>, unbuffered: bool) -> Self {
        Self {
            output,
            columns: Vec::new(),
            unbuffered,
        }
    }

    fn passes_through(&self, values: &[Value]) -> bool {
        matches!(self.columns.as_slice(), [name] if name == "json" || name == "col1")
            && values.len() == 1
            && values[0].is_object()
    }
}

impl RowWriter for JsonWriter {
    fn write_header(&mut self, columns: &[String]) -> RowqlResult<()> {
        self.columns = columns.to_vec();
        Ok(())
    }

    fn write_row(&mut self, mut values: Vec<Value>) -> RowqlResult<()> {
        let doc = if self.passes_through(&values) {
            values.remove(0)
        } else {
            let obj: Map<String, Value> = self.columns.iter().cloned().zip(values).collect();
            Value::Object(obj)
        };
        serde_json::to_writer(&mut self.output, &doc).map_err(|e| FormatError::Io(e.into()))?;
        self.output.write_all(b"\n").map_err(io_error)?;
        if self.unbuffered {
            self.output.flush().map_err(io_error)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> RowqlResult<()> {
        self.output.flush().map_err(io_error)
    }
}
