//! rowql - run SQL-shaped queries over CSV, JSON lines and text files.
//!
//! The query engine lives in `rowql-core`; this crate adds the file readers
//! and writers, the configuration file and logging setup used by the
//! `rowql` binary.

pub mod config;
pub mod error;
pub mod formats;
pub mod logging;
pub mod readers;
pub mod writers;

pub use config::Config;
pub use error::{ConfigError, FormatError, FormatResult};
pub use formats::{parse_option_value, parse_options, FileFormats, FormatOptions};
