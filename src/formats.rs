//! The file readers and writers behind `FROM csv(...)`, `TO json`, ...

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;

use rowql_core::{FormatArgs, FormatRegistry, RowSource, RowWriter, RowqlResult, WarningPolicy};
use serde_json::{Map, Value};

use crate::error::{FormatError, FormatResult};
use crate::readers::{CsvReader, CsvReaderOptions, JsonReader, TextReader};
use crate::writers::{CsvWriter, CsvWriterOptions, JsonWriter, PrettyWriter, SqlWriter, SqlWriterOptions};

/// Keyword arguments of a reader/writer call, consumed option by option.
/// Whatever is left at the end is an unknown option.
pub struct FormatOptions {
    format: String,
    role: &'static str,
    kwargs: Map<String, Value>,
}

impl FormatOptions {
    pub fn new(format: &str, role: &'static str, kwargs: Map<String, Value>) -> Self {
        Self {
            format: format.to_lowercase(),
            role,
            kwargs,
        }
    }

    fn invalid(&self, option: &str, message: &str) -> FormatError {
        FormatError::InvalidOption {
            format: self.format.clone(),
            role: self.role,
            option: option.to_string(),
            message: message.to_string(),
        }
    }

    pub fn take_bool(&mut self, key: &str) -> FormatResult<Option<bool>> {
        match self.kwargs.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(b)),
            Some(Value::Number(n)) => Ok(Some(n.as_f64().map_or(false, |f| f != 0.0))),
            Some(_) => Err(self.invalid(key, "must be a boolean")),
        }
    }

    pub fn take_usize(&mut self, key: &str) -> FormatResult<Option<usize>> {
        match self.kwargs.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(|v| Some(v as usize))
                .ok_or_else(|| self.invalid(key, "must be a non-negative integer")),
            Some(_) => Err(self.invalid(key, "must be a non-negative integer")),
        }
    }

    pub fn take_string(&mut self, key: &str) -> FormatResult<Option<String>> {
        match self.kwargs.remove(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(self.invalid(key, "must be a string")),
        }
    }

    /// A single-byte option such as a delimiter.
    pub fn take_byte(&mut self, key: &str) -> FormatResult<Option<u8>> {
        match self.take_string(key)? {
            None => Ok(None),
            Some(s) => {
                let unescaped = match s.as_str() {
                    "\\t" => "\t",
                    other => other,
                };
                match unescaped.as_bytes() {
                    [b] => Ok(Some(*b)),
                    _ => Err(self.invalid(key, "must be a single character")),
                }
            }
        }
    }

    /// Fails on any option that was not consumed.
    pub fn finish(self) -> FormatResult<()> {
        match self.kwargs.keys().next() {
            None => Ok(()),
            Some(option) => Err(FormatError::UnknownOption {
                format: self.format,
                role: self.role,
                option: option.clone(),
            }),
        }
    }
}

/// Opens readers and writers by name.
#[derive(Debug, Clone, Default)]
pub struct FileFormats {
    pub warnings: WarningPolicy,
    /// Write to this file instead of standard output.
    pub output_path: Option<PathBuf>,
    /// Flush after every row.
    pub unbuffered: bool,
}

impl FileFormats {
    pub fn new(warnings: WarningPolicy) -> Self {
        Self {
            warnings,
            ..Default::default()
        }
    }

    /// Input file from the first positional argument, or standard input.
    fn open_input(name: &str, args: &[Value]) -> FormatResult<Box<dyn Read>> {
        match args {
            [] | [Value::Null] => Ok(Box::new(io::stdin())),
            [Value::String(path)] => {
                tracing::debug!(path = %path, "opening input file");
                Ok(Box::new(BufReader::new(File::open(path)?)))
            }
            [_] => Err(FormatError::InvalidOption {
                format: name.to_lowercase(),
                role: "reader",
                option: "path".to_string(),
                message: "must be a string".to_string(),
            }),
            _ => Err(FormatError::TooManyArguments {
                format: name.to_lowercase(),
                role: "reader",
            }),
        }
    }

    fn open_output(&self) -> FormatResult<Box<dyn Write>> {
        match &self.output_path {
            Some(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
            None if self.unbuffered => Ok(Box::new(io::stdout())),
            None => Ok(Box::new(BufWriter::new(io::stdout()))),
        }
    }

    pub fn reader(&self, name: &str, args: FormatArgs) -> FormatResult<Box<dyn RowSource>> {
        let input = Self::open_input(name, &args.args)?;
        let mut options = FormatOptions::new(name, "reader", args.kwargs);
        let reader: Box<dyn RowSource> = match name.to_uppercase().as_str() {
            "CSV" => {
                let opts = CsvReaderOptions::from_options(&mut options)?;
                options.finish()?;
                Box::new(CsvReader::new(input, opts, self.warnings)?)
            }
            "JSON" => {
                options.finish()?;
                Box::new(JsonReader::new(input))
            }
            "TEXT" => {
                options.finish()?;
                Box::new(TextReader::new(input))
            }
            _ => {
                return Err(FormatError::UnknownFormat {
                    name: name.to_string(),
                    role: "reader",
                })
            }
        };
        Ok(reader)
    }

    pub fn writer(&self, name: &str, args: FormatArgs) -> FormatResult<Box<dyn RowWriter>> {
        if !args.args.is_empty() {
            return Err(FormatError::TooManyArguments {
                format: name.to_lowercase(),
                role: "writer",
            });
        }
        let mut options = FormatOptions::new(name, "writer", args.kwargs);
        let upper = name.to_uppercase();
        let writer: Box<dyn RowWriter> = match upper.as_str() {
            "CSV" => {
                let opts = CsvWriterOptions::from_options(&mut options)?;
                options.finish()?;
                Box::new(CsvWriter::new(self.open_output()?, opts, self.unbuffered))
            }
            "JSON" => {
                options.finish()?;
                Box::new(JsonWriter::new(self.open_output()?, self.unbuffered))
            }
            "PRETTY" => {
                let header = options.take_bool("header")?.unwrap_or(true);
                options.finish()?;
                Box::new(PrettyWriter::new(self.open_output()?, header))
            }
            "SQL" => {
                let opts = SqlWriterOptions::from_options(&mut options)?;
                options.finish()?;
                Box::new(SqlWriter::new(self.open_output()?, opts))
            }
            _ => {
                return Err(FormatError::UnknownFormat {
                    name: name.to_string(),
                    role: "writer",
                })
            }
        };
        tracing::debug!(writer = %upper, "opened writer");
        Ok(writer)
    }
}

impl FormatRegistry for FileFormats {
    fn open_reader(&self, name: &str, args: FormatArgs) -> RowqlResult<Box<dyn RowSource>> {
        Ok(self.reader(name, args)?)
    }

    fn open_writer(&self, name: &str, args: FormatArgs) -> RowqlResult<Box<dyn RowWriter>> {
        Ok(self.writer(name, args)?)
    }
}

/// Value of a `-I key=value` / `-O key=value` option: booleans, numbers and
/// JSON are recognised, anything else is a string.
pub fn parse_option_value(text: &str) -> Value {
    match text.trim() {
        "True" | "TRUE" => Value::Bool(true),
        "False" | "FALSE" => Value::Bool(false),
        "None" | "NULL" | "Null" => Value::Null,
        trimmed => serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(text.to_string())),
    }
}

/// Parse `key=value` pairs into keyword arguments.
pub fn parse_options(pairs: &[String]) -> Result<Map<String, Value>, String> {
    let mut out = Map::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("bad format for option '{}', format must be 'option=value'", pair))?;
        out.insert(key.trim().to_string(), parse_option_value(value));
    }
    Ok(out)
}
