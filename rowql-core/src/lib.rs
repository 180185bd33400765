//! rowql core - query parsing and execution over streams of rows.
//!
//! This crate holds everything that does not touch files or the terminal:
//! the clause and expression parsers, the expression interpreter with its
//! built-in library and aggregates, the row loop and the output strategies.
//! File readers and writers plug in through [`RowSource`], [`RowWriter`] and
//! [`FormatRegistry`].
//!
//! # Main Components
//!
//! - **Query parsing** ([`query`]): literal extraction, clause splitting and
//!   expression translation into a [`ParsedQuery`]
//! - **Expressions** ([`parser`], [`ast`]): the expression grammar
//! - **Executor** ([`executor`]): the [`Interpreter`] and [`ExecutionEngine`]
//! - **Output** ([`output`]): LIMIT/OFFSET, DISTINCT, GROUP BY and ORDER BY
//!   handling in front of a writer
//!
//! # Example
//!
//! ```rust
//! use rowql_core::{Query, Vars};
//! use serde_json::json;
//!
//! let query = Query::new("SELECT col1 % 2 AS odd, count_agg(*) AS n FROM range(10) GROUP BY 1").unwrap();
//! let (output, _stats) = query.run(Vars::new()).unwrap();
//! assert_eq!(output.columns, vec!["odd", "n"]);
//! assert_eq!(output.rows, vec![vec![json!(0), json!(5)], vec![json!(1), json!(5)]]);
//! ```

pub mod ast;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod query;
pub mod session;
pub mod source;

// Re-export main types for convenience
pub use ast::{BinaryOperator, Expression, UnaryOperator};
pub use diagnostics::WarningPolicy;
pub use error::{ClauseRef, RowqlError, RowqlResult};
pub use executor::{
    ExecutionEngine, ExecutionOptions, ExecutionStats, ExpressionEvaluator, FormatArgs,
    Interpreter, Scope, Vars,
};
pub use lexer::{Lexer, Token};
pub use output::{MemoryWriter, OutputHandler, OutputRecord, QueryOutput, RowWriter};
pub use query::{
    parse as parse_query, ClauseTarget, FormatCall, ParsedQuery, READER_FORMATS, WRITER_FORMATS,
};
pub use session::{FormatRegistry, Query, MEMORY_FORMAT};
pub use source::{InputRecord, RowSource, VecSource};
