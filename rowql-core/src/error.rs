//! Error types for rowql-core.

use std::fmt;

use thiserror::Error;

/// Location of an expression inside a query: the clause keyword plus the
/// 1-based position for multi-expression clauses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseRef {
    pub clause: String,
    pub position: Option<usize>,
}

impl ClauseRef {
    pub fn new(clause: &str) -> Self {
        Self {
            clause: clause.to_string(),
            position: None,
        }
    }

    pub fn at(clause: &str, position: usize) -> Self {
        Self {
            clause: clause.to_string(),
            position: Some(position),
        }
    }
}

impl fmt::Display for ClauseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{} expression #{}", self.clause, pos),
            None => write!(f, "{} clause", self.clause),
        }
    }
}

/// rowql error type
#[derive(Error, Debug)]
pub enum RowqlError {
    /// Structural problems: missing SELECT, misplaced keyword, unterminated literal.
    #[error("Syntax error: {0}")]
    SyntaxError(String),

    #[error("Could not compile {location}: {message}\n  {expression}")]
    CompileError {
        location: ClauseRef,
        expression: String,
        message: String,
    },

    #[error("Error evaluating {location} on input row {row}: {message}\n  values: {values}")]
    RuntimeError {
        location: ClauseRef,
        row: usize,
        values: String,
        message: String,
    },

    #[error("Semantic error: {0}")]
    SemanticError(String),

    /// Raised by the interpreter; the engine wraps it into `RuntimeError`.
    #[error("Evaluation error: {0}")]
    EvalError(String),

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("No module named '{0}'")]
    ModuleNotFound(String),

    #[error("Warning treated as error: {0}")]
    WarningAsError(String),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    /// A reader or writer failed (bad option, malformed input file).
    #[error("Format error: {0}")]
    FormatError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RowqlError {
    /// Whether this error was produced while evaluating an expression, as
    /// opposed to a problem with the query text itself.
    pub fn is_evaluation_error(&self) -> bool {
        matches!(self, RowqlError::EvalError(_) | RowqlError::TypeError(_))
    }

    /// The bare message, without the variant prefix.
    pub fn message(&self) -> String {
        match self {
            RowqlError::EvalError(msg) | RowqlError::TypeError(msg) => msg.clone(),
            RowqlError::SyntaxError(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Result type for rowql operations
pub type RowqlResult<T> = Result<T, RowqlError>;

impl serde::Serialize for RowqlError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = RowqlError::SyntaxError("SELECT keyword is missing".to_string());
        assert_eq!(err.to_string(), "Syntax error: SELECT keyword is missing");

        let err = RowqlError::TypeError("unsupported operand types".to_string());
        assert_eq!(err.to_string(), "Type error: unsupported operand types");

        let err = RowqlError::ModuleNotFound("numpy".to_string());
        assert_eq!(err.to_string(), "No module named 'numpy'");
    }

    #[test]
    fn test_compile_error_location() {
        let err = RowqlError::CompileError {
            location: ClauseRef::at("SELECT", 2),
            expression: "1 +".to_string(),
            message: "unexpected end of expression".to_string(),
        };
        assert!(err.to_string().starts_with("Could not compile SELECT expression #2"));

        let err = RowqlError::CompileError {
            location: ClauseRef::new("WHERE"),
            expression: "(".to_string(),
            message: "unexpected end of expression".to_string(),
        };
        assert!(err.to_string().starts_with("Could not compile WHERE clause"));
    }

    #[test]
    fn test_runtime_error_row() {
        let err = RowqlError::RuntimeError {
            location: ClauseRef::at("SELECT", 1),
            row: 3,
            values: "[1, \"a\"]".to_string(),
            message: "unsupported operand types for +".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("input row 3"));
        assert!(text.contains("[1, \"a\"]"));
    }

    #[test]
    fn test_serialize_as_string() {
        let err = RowqlError::SemanticError("aggregate functions are not allowed in WHERE".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!("Semantic error: aggregate functions are not allowed in WHERE")
        );
    }
}
