//! Input readers. Each one is a [`rowql_core::RowSource`].

mod csv;
mod json;
mod text;

pub use self::csv::{CsvReader, CsvReaderOptions};
pub use self::json::JsonReader;
pub use self::text::TextReader;
