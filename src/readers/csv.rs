//! CSV input with header detection and column type inference.
//!
//! The first `sample_size` records are buffered. Unless told otherwise, the
//! reader guesses whether the first record is a header by letting every
//! column vote: a text cell on top of a numeric column, or a cell whose
//! length differs from an otherwise fixed-length column, votes for a header.
//! Column types come from the same sample (int < float < text); typed
//! columns turn empty cells into NULL.

use std::collections::VecDeque;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use rowql_core::executor::number_from_f64;
use rowql_core::query::make_valid_identifier;
use rowql_core::{InputRecord, RowSource, RowqlResult, WarningPolicy};
use serde_json::Value;

use crate::error::{FormatError, FormatResult};
use crate::formats::FormatOptions;

#[derive(Debug, Clone, PartialEq)]
pub struct CsvReaderOptions {
    pub delimiter: u8,
    pub quote: u8,
    /// `None` means detect.
    pub header: Option<bool>,
    pub infer_dtypes: bool,
    pub sample_size: usize,
}

impl Default for CsvReaderOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            header: None,
            infer_dtypes: true,
            sample_size: 10,
        }
    }
}

impl CsvReaderOptions {
    pub fn from_options(options: &mut FormatOptions) -> FormatResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            delimiter: options.take_byte("delimiter")?.unwrap_or(defaults.delimiter),
            quote: options.take_byte("quotechar")?.unwrap_or(defaults.quote),
            header: options.take_bool("header")?,
            infer_dtypes: options.take_bool("infer_dtypes")?.unwrap_or(defaults.infer_dtypes),
            sample_size: options.take_usize("sample_size")?.unwrap_or(defaults.sample_size),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ColumnType {
    Empty,
    Int,
    Float,
    Text,
}

fn cell_type(cell: &str) -> ColumnType {
    let cell = cell.trim();
    if cell.is_empty() {
        ColumnType::Empty
    } else if cell.parse::<i64>().is_ok() {
        ColumnType::Int
    } else if cell.parse::<f64>().is_ok() {
        ColumnType::Float
    } else {
        ColumnType::Text
    }
}

fn is_numeric(t: ColumnType) -> bool {
    matches!(t, ColumnType::Int | ColumnType::Float)
}

/// Vote on whether the first sampled record is a header.
fn detect_header(sample: &VecDeque<StringRecord>) -> bool {
    let Some(first) = sample.front() else {
        return false;
    };
    if sample.len() < 2 {
        return false;
    }

    let mut votes = 0i32;
    for (c, head) in first.iter().enumerate() {
        let cells: Vec<&str> = sample.iter().skip(1).filter_map(|r| r.get(c)).collect();
        let Some(column) = cells.iter().map(|cell| cell_type(cell)).max() else {
            continue;
        };
        if is_numeric(column) {
            votes += if is_numeric(cell_type(head)) { -1 } else { 1 };
        } else if column == ColumnType::Text {
            let len = cells[0].chars().count();
            if cells.iter().all(|cell| cell.chars().count() == len) {
                votes += if head.chars().count() != len { 1 } else { -1 };
            }
        }
    }
    tracing::debug!(votes, "csv header detection");
    votes > 0
}

fn infer_types(sample: &VecDeque<StringRecord>) -> Vec<ColumnType> {
    let columns = sample.iter().map(|r| r.len()).max().unwrap_or(0);
    (0..columns)
        .map(|c| {
            sample
                .iter()
                .filter_map(|r| r.get(c))
                .map(cell_type)
                .max()
                .unwrap_or(ColumnType::Empty)
        })
        .collect()
}

pub struct CsvReader {
    records: StringRecordsIntoIter<Box<dyn Read>>,
    sample: VecDeque<StringRecord>,
    header: Option<Vec<String>>,
    types: Vec<ColumnType>,
    warnings: WarningPolicy,
}

impl CsvReader {
    pub fn new(input: Box<dyn Read>, options: CsvReaderOptions, warnings: WarningPolicy) -> FormatResult<Self> {
        let mut records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(options.delimiter)
            .quote(options.quote)
            .from_reader(input)
            .into_records();

        let mut sample = VecDeque::new();
        for record in records.by_ref().take(options.sample_size.max(1)) {
            sample.push_back(record?);
        }

        let has_header = options.header.unwrap_or_else(|| detect_header(&sample));
        let header = if has_header {
            sample
                .pop_front()
                .map(|r| r.iter().map(make_valid_identifier).collect())
        } else {
            None
        };
        let types = if options.infer_dtypes {
            infer_types(&sample)
        } else {
            Vec::new()
        };
        tracing::debug!(?header, ?types, "csv reader ready");

        Ok(Self {
            records,
            sample,
            header,
            types,
            warnings,
        })
    }

    fn convert(&self, record: &StringRecord) -> RowqlResult<Vec<Value>> {
        let mut values = Vec::with_capacity(record.len());
        for (i, cell) in record.iter().enumerate() {
            let value = match self.types.get(i) {
                Some(ColumnType::Int) => self.cast(cell, "int", |s| s.parse::<i64>().ok().map(Value::from))?,
                Some(ColumnType::Float) => {
                    self.cast(cell, "float", |s| s.parse::<f64>().ok().map(number_from_f64))?
                }
                _ => Value::String(cell.to_string()),
            };
            values.push(value);
        }
        Ok(values)
    }

    fn cast(&self, cell: &str, target: &str, parse: impl Fn(&str) -> Option<Value>) -> RowqlResult<Value> {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }
        match parse(trimmed) {
            Some(v) => Ok(v),
            None => {
                self.warnings
                    .conversion_warning(target, &Value::String(cell.to_string()))?;
                Ok(Value::Null)
            }
        }
    }
}

impl RowSource for CsvReader {
    fn next_record(&mut self) -> RowqlResult<Option<InputRecord>> {
        if let Some(header) = self.header.take() {
            return Ok(Some(InputRecord::Header(header)));
        }
        let record = match self.sample.pop_front() {
            Some(record) => record,
            None => match self.records.next() {
                Some(record) => record.map_err(FormatError::from)?,
                None => return Ok(None),
            },
        };
        Ok(Some(InputRecord::Values(self.convert(&record)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    fn read_all(text: &str, options: CsvReaderOptions) -> Vec<InputRecord> {
        let mut reader = CsvReader::new(
            Box::new(Cursor::new(text.to_string())),
            options,
            WarningPolicy::Default,
        )
        .unwrap();
        let mut out = Vec::new();
        while let Some(record) = reader.next_record().unwrap() {
            out.push(record);
        }
        out
    }

    #[test]
    fn test_detects_header_and_types() {
        let records = read_all("name,age,score\nalice,30,1.5\nbob,,2\n", CsvReaderOptions::default());
        assert_eq!(
            records,
            vec![
                InputRecord::Header(vec!["name".into(), "age".into(), "score".into()]),
                InputRecord::Values(vec![json!("alice"), json!(30), json!(1.5)]),
                InputRecord::Values(vec![json!("bob"), Value::Null, json!(2.0)]),
            ]
        );
    }

    #[test]
    fn test_no_header_when_first_row_is_data() {
        let records = read_all("1,2\n3,4\n", CsvReaderOptions::default());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], InputRecord::Values(vec![json!(1), json!(2)]));
    }

    #[test]
    fn test_forced_header_and_names_are_sanitised() {
        let options = CsvReaderOptions {
            header: Some(true),
            delimiter: b';',
            infer_dtypes: false,
            ..Default::default()
        };
        let records = read_all("first name;2nd\nx;1\n", options);
        assert_eq!(
            records[0],
            InputRecord::Header(vec!["first_name".into(), "_2nd".into()])
        );
        assert_eq!(records[1], InputRecord::Values(vec![json!("x"), json!("1")]));
    }

    #[test]
    fn test_bad_cell_beyond_sample_becomes_null() {
        let options = CsvReaderOptions {
            header: Some(false),
            sample_size: 1,
            ..Default::default()
        };
        let records = read_all("1\nabc\n", options);
        assert_eq!(records[1], InputRecord::Values(vec![Value::Null]));

        let mut reader = CsvReader::new(
            Box::new(Cursor::new("1\nabc\n".to_string())),
            CsvReaderOptions {
                header: Some(false),
                sample_size: 1,
                ..Default::default()
            },
            WarningPolicy::Error,
        )
        .unwrap();
        assert!(reader.next_record().is_ok());
        assert!(reader.next_record().is_err());
    }

    #[test]
    fn test_empty_input() {
        assert!(read_all("", CsvReaderOptions::default()).is_empty());
    }
}
