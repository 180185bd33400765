use rowql_core::RowqlError;
use thiserror::Error;

/// Failures of the file readers and writers.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON on input line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Could not create '{format}' {role}: unexpected option '{option}'")]
    UnknownOption {
        format: String,
        role: &'static str,
        option: String,
    },

    #[error("Could not create '{format}' {role}: option '{option}' {message}")]
    InvalidOption {
        format: String,
        role: &'static str,
        option: String,
        message: String,
    },

    #[error("Could not create '{format}' {role}: too many positional arguments")]
    TooManyArguments { format: String, role: &'static str },

    #[error("Unknown {role} '{name}'")]
    UnknownFormat { name: String, role: &'static str },
}

impl From<FormatError> for RowqlError {
    fn from(err: FormatError) -> Self {
        match err {
            FormatError::UnknownFormat { .. } => RowqlError::UnknownFormat(err.to_string()),
            other => RowqlError::FormatError(other.to_string()),
        }
    }
}

pub type FormatResult<T> = Result<T, FormatError>;

/// Failures loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_to_core_error() {
        let err: RowqlError = FormatError::UnknownFormat {
            name: "xml".to_string(),
            role: "writer",
        }
        .into();
        assert!(matches!(err, RowqlError::UnknownFormat(_)));
        assert!(err.to_string().contains("Unknown writer 'xml'"));

        let err: RowqlError = FormatError::UnknownOption {
            format: "csv".to_string(),
            role: "reader",
            option: "foo".to_string(),
        }
        .into();
        assert!(matches!(err, RowqlError::FormatError(_)));
        assert!(err.to_string().contains("unexpected option 'foo'"));
    }
}
