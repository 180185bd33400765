//! Executor module for row queries.
//!
//! Expression evaluation sits behind the [`ExpressionEvaluator`] trait so the
//! execution engine never depends on how expressions are compiled; the
//! shipped implementation is the tree-walking [`Interpreter`].

mod aggregation;
mod builtins;
mod engine;
mod helpers;
mod interpreter;

pub use aggregation::{is_aggregate, AggregationContext, AGGREGATE_FUNCTIONS};
pub use builtins::{BuiltinFunctions, MODULES};
pub use engine::{ExecutionEngine, ExecutionOptions, ExecutionStats, FormatArgs};
pub use helpers::*;
pub use interpreter::Interpreter;

use std::collections::HashMap;

use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};

use crate::diagnostics::WarningPolicy;
use crate::error::RowqlResult;

/// User variables visible to expressions (e.g. `FROM data` with `data`
/// supplied by the caller).
pub type Vars = HashMap<String, Value>;

/// Compiles expression text once and evaluates it per row.
pub trait ExpressionEvaluator {
    type Compiled: Clone;

    /// Compile a single expression.
    fn compile(&self, text: &str) -> RowqlResult<Self::Compiled>;

    /// Compile a top-level comma separated list of expressions.
    fn compile_many(&self, text: &str) -> RowqlResult<Vec<Self::Compiled>>;

    /// Evaluate a compiled expression against the current row.
    fn evaluate(&self, expr: &Self::Compiled, scope: &mut Scope<'_>) -> RowqlResult<Value>;

    /// Overwrite the location named by `target` inside `values` (EXPLODE).
    fn assign(
        &self,
        target: &Self::Compiled,
        values: &mut [Value],
        names: &[String],
        value: Value,
    ) -> RowqlResult<()>;
}

/// Everything an expression can see while a row is evaluated.
pub struct Scope<'a> {
    pub values: &'a [Value],
    pub names: &'a [String],
    /// Rows that passed WHERE so far, including the current one.
    pub row_number: u64,
    /// 1-based position of the row in the input.
    pub input_row_number: u64,
    pub vars: &'a Vars,
    /// alias -> module name
    pub imports: &'a HashMap<String, String>,
    pub aggregates: &'a mut AggregationContext,
    pub warnings: WarningPolicy,
    row: OnceCell<Value>,
}

impl<'a> Scope<'a> {
    pub fn new(
        values: &'a [Value],
        names: &'a [String],
        vars: &'a Vars,
        imports: &'a HashMap<String, String>,
        aggregates: &'a mut AggregationContext,
        warnings: WarningPolicy,
    ) -> Self {
        Self {
            values,
            names,
            row_number: 0,
            input_row_number: 0,
            vars,
            imports,
            aggregates,
            warnings,
            row: OnceCell::new(),
        }
    }

    /// True when the row is a single object column (e.g. a JSON document),
    /// in which case `row` is that object.
    pub fn collapses_row(values: &[Value]) -> bool {
        values.len() == 1 && values[0].is_object()
    }

    /// The `row` variable, built on first use.
    pub fn row(&self) -> &Value {
        self.row.get_or_init(|| {
            if Self::collapses_row(self.values) {
                return self.values[0].clone();
            }
            let obj: Map<String, Value> = self
                .names
                .iter()
                .cloned()
                .zip(self.values.iter().cloned())
                .collect();
            Value::Object(obj)
        })
    }

    /// Module bound to `name`, either through IMPORT or by its own name.
    pub fn module(&self, name: &str) -> Option<&str> {
        if let Some(module) = self.imports.get(name) {
            return Some(module.as_str());
        }
        MODULES.iter().copied().find(|m| *m == name)
    }
}
