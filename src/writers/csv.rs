use std::io::Write;

use rowql_core::executor::display_value;
use rowql_core::{RowWriter, RowqlResult};
use serde_json::Value;

use super::io_error;
use crate::error::{FormatError, FormatResult};
use crate::formats::FormatOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct CsvWriterOptions {
    pub header: bool,
    pub delimiter: u8,
}

impl Default for CsvWriterOptions {
    fn default() -> Self {
        Self {
            header: true,
            delimiter: b',',
        }
    }
}

impl CsvWriterOptions {
    pub fn from_options(options: &mut FormatOptions) -> FormatResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            header: options.take_bool("header")?.unwrap_or(defaults.header),
            delimiter: options.take_byte("delimiter")?.unwrap_or(defaults.delimiter),
        })
    }
}

/// CSV output; NULL is an empty field, lists and objects are written as JSON.
pub struct CsvWriter {
    csv: csv::Writer<Box<dyn Write>>,
    header: bool,
    unbuffered: bool,
}

impl CsvWriter {
    pub fn new(output: Box<dyn Write>, options: CsvWriterOptions, unbuffered: bool) -> Self {
        let csv = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .flexible(true)
            .from_writer(output);
        Self {
            csv,
            header: options.header,
            unbuffered,
        }
    }
}

impl RowWriter for CsvWriter {
    fn write_header(&mut self, columns: &[String]) -> RowqlResult<()> {
        if self.header {
            self.csv.write_record(columns).map_err(FormatError::from)?;
        }
        Ok(())
    }

    fn write_row(&mut self, values: Vec<Value>) -> RowqlResult<()> {
        self.csv
            .write_record(values.iter().map(display_value))
            .map_err(FormatError::from)?;
        if self.unbuffered {
            self.csv.flush().map_err(io_error)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> RowqlResult<()> {
        self.csv.flush().map_err(io_error)
    }
}
