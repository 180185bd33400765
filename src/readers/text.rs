use std::io::{BufRead, BufReader, Lines, Read};

use rowql_core::{InputRecord, RowSource, RowqlResult};
use serde_json::Value;

use crate::error::FormatError;

/// One line per row, in a single string column.
pub struct TextReader {
    lines: Lines<BufReader<Box<dyn Read>>>,
}

impl TextReader {
    pub fn new(input: Box<dyn Read>) -> Self {
        Self {
            lines: BufReader::new(input).lines(),
        }
    }
}

impl RowSource for TextReader {
    fn next_record(&mut self) -> RowqlResult<Option<InputRecord>> {
        match self.lines.next() {
            Some(line) => {
                let line = line.map_err(FormatError::from)?;
                let line = line.trim_end_matches('\r').to_string();
                Ok(Some(InputRecord::Values(vec![Value::String(line)])))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_lines_without_terminators() {
        let mut reader = TextReader::new(Box::new(Cursor::new("a\r\n\nb".to_string())));
        let mut lines = Vec::new();
        while let Some(InputRecord::Values(v)) = reader.next_record().unwrap() {
            lines.push(v[0].clone());
        }
        assert_eq!(lines, vec![Value::from("a"), Value::from(""), Value::from("b")]);
    }
}
