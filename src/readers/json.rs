use std::io::{BufRead, BufReader, Lines, Read};

use rowql_core::{InputRecord, RowSource, RowqlResult};
use serde_json::Value;

use crate::error::FormatError;

/// JSON lines: one document per line in a single column named `json`.
/// Blank lines are skipped.
pub struct JsonReader {
    lines: Lines<BufReader<Box<dyn Read>>>,
    header_sent: bool,
    line_number: usize,
}

impl JsonReader {
    pub fn new(input: Box<dyn Read>) -> Self {
        Self {
            lines: BufReader::new(input).lines(),
            header_sent: false,
            line_number: 0,
        }
    }
}

impl RowSource for JsonReader {
    fn next_record(&mut self) -> RowqlResult<Option<InputRecord>> {
        if !self.header_sent {
            self.header_sent = true;
            return Ok(Some(InputRecord::Header(vec!["json".to_string()])));
        }
        for line in self.lines.by_ref() {
            let line = line.map_err(FormatError::from)?;
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(&line).map_err(|source| FormatError::Json {
                line: self.line_number,
                source,
            })?;
            return Ok(Some(InputRecord::Values(vec![value])));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn test_reads_one_document_per_line() {
        let input = "{\"a\": 1}\n\n[1, 2]\nnull\n";
        let mut reader = JsonReader::new(Box::new(Cursor::new(input.to_string())));
        assert_eq!(
            reader.next_record().unwrap(),
            Some(InputRecord::Header(vec!["json".to_string()]))
        );
        assert_eq!(
            reader.next_record().unwrap(),
            Some(InputRecord::Values(vec![json!({"a": 1})]))
        );
        assert_eq!(
            reader.next_record().unwrap(),
            Some(InputRecord::Values(vec![json!([1, 2])]))
        );
        assert_eq!(
            reader.next_record().unwrap(),
            Some(InputRecord::Values(vec![Value::Null]))
        );
        assert_eq!(reader.next_record().unwrap(), None);
    }

    #[test]
    fn test_reports_bad_line() {
        let mut reader = JsonReader::new(Box::new(Cursor::new("{}\n{oops\n".to_string())));
        reader.next_record().unwrap();
        reader.next_record().unwrap();
        let err = reader.next_record().unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}
