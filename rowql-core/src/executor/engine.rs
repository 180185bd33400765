//! The row loop.
//!
//! Pulls rows from a [`RowSource`], binds column names on the first data
//! row, compiles every clause against those bindings and then evaluates
//! EXPLODE, WHERE, GROUP BY, SELECT and ORDER BY per row, handing results to
//! the output handler until the source is exhausted or LIMIT is reached.

use std::collections::HashMap;

use serde_json::{Map, Value};

use super::aggregation::AggregationContext;
use super::helpers::{to_bool, tuple_key, type_name};
use super::interpreter::Interpreter;
use super::{ExpressionEvaluator, Scope, Vars};
use crate::diagnostics::WarningPolicy;
use crate::error::{ClauseRef, RowqlError, RowqlResult};
use crate::output::{make_handler, OutputHandler, OutputRecord, RowWriter};
use crate::query::{
    default_column_name, ClauseTarget, ColumnBindings, ExpressionTranslator, FormatCall,
    OrderTarget, ParsedQuery,
};
use crate::source::{InputRecord, RowSource, VecSource};

/// Per-run settings.
#[derive(Debug, Clone, Default)]
pub struct ExecutionOptions {
    pub warnings: WarningPolicy,
    /// Variables visible to every expression.
    pub vars: Vars,
}

/// Row counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExecutionStats {
    /// Data rows read, header rows excluded.
    pub rows_in: u64,
    pub rows_out: u64,
}

/// Evaluated arguments of a reader or writer call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatArgs {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

enum CompiledProjection<C> {
    Star,
    Expr(C),
}

enum CompiledOrder<C> {
    Expr(C),
    OutputColumn(usize),
}

struct CompiledQuery<C> {
    select: Vec<CompiledProjection<C>>,
    explode: Option<C>,
    where_clause: Option<C>,
    group_by: Vec<C>,
    order_by: Vec<CompiledOrder<C>>,
}

/// Per-run mutable state of the row loop.
struct RunState {
    names: Vec<String>,
    row_number: u64,
    input_row_number: u64,
    aggregates: AggregationContext,
    handler: Box<dyn OutputHandler>,
}

pub struct ExecutionEngine<'q, E: ExpressionEvaluator = Interpreter> {
    query: &'q ParsedQuery,
    evaluator: E,
    options: ExecutionOptions,
    imports: HashMap<String, String>,
}

impl<'q> ExecutionEngine<'q, Interpreter> {
    pub fn new(query: &'q ParsedQuery, options: ExecutionOptions) -> Self {
        let evaluator = Interpreter::new(options.warnings);
        Self::with_evaluator(query, evaluator, options)
    }
}

impl<'q, E: ExpressionEvaluator> ExecutionEngine<'q, E> {
    pub fn with_evaluator(query: &'q ParsedQuery, evaluator: E, options: ExecutionOptions) -> Self {
        let imports = query
            .imports
            .iter()
            .map(|import| (import.alias.clone(), import.module.clone()))
            .collect();
        Self {
            query,
            evaluator,
            options,
            imports,
        }
    }

    pub fn query(&self) -> &ParsedQuery {
        self.query
    }

    /// Evaluate expression text that cannot reference any column.
    pub fn evaluate_constant(&self, text: &str, clause: &str) -> RowqlResult<Value> {
        let prepared =
            ExpressionTranslator::prepare(text, &ColumnBindings::default(), &self.query.literals);
        let compiled = self
            .evaluator
            .compile(&prepared)
            .map_err(|e| compile_error(e, ClauseRef::new(clause), &prepared))?;
        let mut aggregates = AggregationContext::new();
        let mut scope = Scope::new(
            &[],
            &[],
            &self.options.vars,
            &self.imports,
            &mut aggregates,
            self.options.warnings,
        );
        self.evaluator
            .evaluate(&compiled, &mut scope)
            .map_err(|e| runtime_error(e, ClauseRef::new(clause), 0, &[]))
    }

    /// Arguments of a reader/writer call, evaluated as constants.
    pub fn evaluate_format_args(&self, call: &FormatCall, clause: &str) -> RowqlResult<FormatArgs> {
        let mut out = FormatArgs::default();
        for arg in &call.args {
            out.args.push(self.evaluate_constant(arg, clause)?);
        }
        for (name, text) in &call.kwargs {
            out.kwargs
                .insert(name.clone(), self.evaluate_constant(text, clause)?);
        }
        Ok(out)
    }

    /// Source for queries without a reader: the FROM expression's value, or
    /// a single NULL row without FROM.
    pub fn expression_source(&self) -> RowqlResult<Option<VecSource>> {
        match &self.query.from {
            None => Ok(Some(VecSource::single_null())),
            Some(ClauseTarget::Expression(text)) => {
                let value = self.evaluate_constant(text, "FROM")?;
                Ok(Some(VecSource::from_value(value)))
            }
            Some(ClauseTarget::Format(_)) => Ok(None),
        }
    }

    /// Run the query to completion.
    pub fn run(
        &self,
        source: &mut dyn RowSource,
        writer: &mut dyn RowWriter,
    ) -> RowqlResult<ExecutionStats> {
        let mut state = RunState {
            names: Vec::new(),
            row_number: 0,
            input_row_number: 0,
            aggregates: AggregationContext::new(),
            handler: make_handler(self.query),
        };
        let mut declared: Vec<String> = Vec::new();
        let mut compiled: Option<CompiledQuery<E::Compiled>> = None;
        let mut header_written = false;
        let mut rows_in = 0u64;

        while let Some(record) = source.next_record()? {
            let values = match record {
                InputRecord::Header(names) => {
                    if compiled.is_none() {
                        declared = names;
                    }
                    continue;
                }
                InputRecord::Values(values) => values,
            };

            if compiled.is_none() {
                state.names = (0..values.len())
                    .map(|i| {
                        declared
                            .get(i)
                            .cloned()
                            .unwrap_or_else(|| default_column_name(i))
                    })
                    .collect();
                writer.write_header(&self.output_columns(&state.names))?;
                header_written = true;
                if state.handler.is_done() {
                    break;
                }
                let bindings = ColumnBindings::new(values.len(), &declared);
                compiled = Some(self.compile(&bindings)?);
            }
            rows_in += 1;
            state.input_row_number += 1;

            if let Some(clauses) = compiled.as_ref() {
                if self.process_row(clauses, values, &mut state, writer)? {
                    break;
                }
            }
        }

        if !header_written {
            // no data rows: the header still goes out
            writer.write_header(&self.output_columns(&declared))?;
        }

        state.handler.finish(writer)?;
        writer.flush()?;

        let stats = ExecutionStats {
            rows_in,
            rows_out: state.handler.rows_written(),
        };
        tracing::info!(rows_in = stats.rows_in, rows_out = stats.rows_out, "query finished");
        Ok(stats)
    }

    fn output_columns(&self, input_names: &[String]) -> Vec<String> {
        let mut columns = Vec::new();
        for item in &self.query.select {
            if item.is_star {
                columns.extend(input_names.iter().cloned());
            } else {
                columns.push(item.name.clone());
            }
        }
        columns
    }

    fn prepare(&self, text: &str, bindings: &ColumnBindings) -> String {
        let prepared = ExpressionTranslator::prepare(text, bindings, &self.query.literals);
        tracing::debug!(from = %text, to = %prepared, "translated expression");
        prepared
    }

    fn compile_single(
        &self,
        text: &str,
        bindings: &ColumnBindings,
        clause: &str,
    ) -> RowqlResult<E::Compiled> {
        let prepared = self.prepare(text, bindings);
        self.evaluator
            .compile(&prepared)
            .map_err(|e| compile_error(e, ClauseRef::new(clause), &prepared))
    }

    /// Compile a multi-expression clause in one go; on failure compile the
    /// items one by one to point at the culprit.
    /// Compile the expressions of a multi-item clause. Each item carries its
    /// 1-based position in the clause, used when reporting a failure.
    fn compile_list(
        &self,
        items: &[(usize, String)],
        bindings: &ColumnBindings,
        clause: &str,
    ) -> RowqlResult<Vec<E::Compiled>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let prepared: Vec<(usize, String)> = items
            .iter()
            .map(|(pos, text)| (*pos, self.prepare(text, bindings)))
            .collect();
        let joined = prepared
            .iter()
            .map(|(_, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        match self.evaluator.compile_many(&joined) {
            Ok(compiled) if compiled.len() == prepared.len() => Ok(compiled),
            Ok(_) => self.compile_each(&prepared, clause),
            Err(whole) => match self.compile_each(&prepared, clause) {
                Ok(_) => Err(compile_error(whole, ClauseRef::new(clause), &joined)),
                Err(e) => Err(e),
            },
        }
    }

    fn compile_each(&self, prepared: &[(usize, String)], clause: &str) -> RowqlResult<Vec<E::Compiled>> {
        prepared
            .iter()
            .map(|(pos, text)| {
                self.evaluator
                    .compile(text)
                    .map_err(|e| compile_error(e, ClauseRef::at(clause, *pos), text))
            })
            .collect()
    }

    fn compile(&self, bindings: &ColumnBindings) -> RowqlResult<CompiledQuery<E::Compiled>> {
        let q = self.query;

        let select_texts: Vec<(usize, String)> = q
            .select
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.is_star)
            .map(|(i, p)| (i + 1, p.expression.clone()))
            .collect();
        let mut select_exprs = self.compile_list(&select_texts, bindings, "SELECT")?.into_iter();
        let mut select = Vec::with_capacity(q.select.len());
        for item in &q.select {
            if item.is_star {
                select.push(CompiledProjection::Star);
            } else if let Some(expr) = select_exprs.next() {
                select.push(CompiledProjection::Expr(expr));
            }
        }

        let explode = match &q.explode {
            Some(text) => Some(self.compile_single(text, bindings, "EXPLODE")?),
            None => None,
        };
        let where_clause = match &q.where_clause {
            Some(text) => Some(self.compile_single(text, bindings, "WHERE")?),
            None => None,
        };

        let group_texts: Vec<(usize, String)> = q
            .group_by
            .iter()
            .enumerate()
            .map(|(i, k)| (i + 1, k.expression.clone()))
            .collect();
        let group_by = self.compile_list(&group_texts, bindings, "GROUP BY")?;

        let order_texts: Vec<(usize, String)> = q
            .order_by
            .iter()
            .enumerate()
            .filter_map(|(i, k)| match &k.target {
                OrderTarget::Expression(text) => Some((i + 1, text.clone())),
                OrderTarget::OutputColumn(_) => None,
            })
            .collect();
        let mut order_exprs = self.compile_list(&order_texts, bindings, "ORDER BY")?.into_iter();
        let mut order_by = Vec::with_capacity(q.order_by.len());
        for key in &q.order_by {
            match key.target {
                OrderTarget::OutputColumn(i) => order_by.push(CompiledOrder::OutputColumn(i)),
                OrderTarget::Expression(_) => {
                    if let Some(expr) = order_exprs.next() {
                        order_by.push(CompiledOrder::Expr(expr));
                    }
                }
            }
        }

        Ok(CompiledQuery {
            select,
            explode,
            where_clause,
            group_by,
            order_by,
        })
    }

    /// Rows produced by EXPLODE for one input row.
    fn explode(
        &self,
        target: &E::Compiled,
        values: Vec<Value>,
        state: &mut RunState,
    ) -> RowqlResult<Vec<Vec<Value>>> {
        let row = state.input_row_number as usize;
        let items = {
            let mut scope = self.scope(&values, state);
            self.evaluator
                .evaluate(target, &mut scope)
                .map_err(|e| runtime_error(e, ClauseRef::new("EXPLODE"), row, &values))?
        };
        match items {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .into_iter()
                .map(|item| {
                    let mut exploded = values.clone();
                    self.evaluator
                        .assign(target, &mut exploded, &state.names, item)
                        .map_err(|e| runtime_error(e, ClauseRef::new("EXPLODE"), row, &values))?;
                    Ok(exploded)
                })
                .collect(),
            other => Err(runtime_error(
                RowqlError::TypeError(format!(
                    "EXPLODE target must be a list, got '{}'",
                    type_name(&other)
                )),
                ClauseRef::new("EXPLODE"),
                row,
                &values,
            )),
        }
    }

    fn scope<'s>(&'s self, values: &'s [Value], state: &'s mut RunState) -> Scope<'s> {
        let mut scope = Scope::new(
            values,
            &state.names,
            &self.options.vars,
            &self.imports,
            &mut state.aggregates,
            self.options.warnings,
        );
        scope.row_number = state.row_number;
        scope.input_row_number = state.input_row_number;
        scope
    }

    /// Returns true when the output handler wants no more rows.
    fn process_row(
        &self,
        clauses: &CompiledQuery<E::Compiled>,
        values: Vec<Value>,
        state: &mut RunState,
        writer: &mut dyn RowWriter,
    ) -> RowqlResult<bool> {
        let rows = match &clauses.explode {
            Some(target) => self.explode(target, values, state)?,
            None => vec![values],
        };
        let row = state.input_row_number as usize;

        for values in rows {
            let record = {
                let fail = |e: RowqlError, location: ClauseRef| runtime_error(e, location, row, &values);

                if let Some(cond) = &clauses.where_clause {
                    let mut scope = self.scope(&values, state);
                    let keep = self
                        .evaluator
                        .evaluate(cond, &mut scope)
                        .map_err(|e| fail(e, ClauseRef::new("WHERE")))?;
                    if !to_bool(&keep) {
                        continue;
                    }
                }
                state.row_number += 1;

                let mut scope = self.scope(&values, state);

                let group_key = if clauses.group_by.is_empty() {
                    String::new()
                } else {
                    let mut keys = Vec::with_capacity(clauses.group_by.len());
                    for (i, expr) in clauses.group_by.iter().enumerate() {
                        keys.push(
                            self.evaluator
                                .evaluate(expr, &mut scope)
                                .map_err(|e| fail(e, ClauseRef::at("GROUP BY", i + 1)))?,
                        );
                    }
                    let key = tuple_key(&keys);
                    scope.aggregates.start_row(&key);
                    key
                };

                let mut projected = Vec::with_capacity(clauses.select.len());
                for (i, item) in clauses.select.iter().enumerate() {
                    match item {
                        CompiledProjection::Star => projected.extend(values.iter().cloned()),
                        CompiledProjection::Expr(expr) => projected.push(
                            self.evaluator
                                .evaluate(expr, &mut scope)
                                .map_err(|e| fail(e, ClauseRef::at("SELECT", i + 1)))?,
                        ),
                    }
                }

                let mut sort_keys = Vec::with_capacity(clauses.order_by.len());
                for (i, key) in clauses.order_by.iter().enumerate() {
                    let value = match key {
                        CompiledOrder::OutputColumn(col) => {
                            projected.get(*col).cloned().ok_or_else(|| {
                                fail(
                                    RowqlError::EvalError(format!(
                                        "output column {} does not exist, row has {} columns",
                                        col + 1,
                                        projected.len()
                                    )),
                                    ClauseRef::at("ORDER BY", i + 1),
                                )
                            })?
                        }
                        CompiledOrder::Expr(expr) => self
                            .evaluator
                            .evaluate(expr, &mut scope)
                            .map_err(|e| fail(e, ClauseRef::at("ORDER BY", i + 1)))?,
                    };
                    sort_keys.push(value);
                }

                OutputRecord {
                    values: projected,
                    sort_keys,
                    group_key,
                }
            };

            if state.handler.handle(record, writer)? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn compile_error(err: RowqlError, location: ClauseRef, expression: &str) -> RowqlError {
    match err {
        RowqlError::WarningAsError(_) => err,
        other => RowqlError::CompileError {
            location,
            expression: expression.to_string(),
            message: other.message(),
        },
    }
}

/// Attach the clause and input row to an evaluation failure.
fn runtime_error(err: RowqlError, location: ClauseRef, row: usize, values: &[Value]) -> RowqlError {
    if !err.is_evaluation_error() {
        return err;
    }
    RowqlError::RuntimeError {
        location,
        row,
        values: serde_json::to_string(values).unwrap_or_default(),
        message: err.message(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemoryWriter;
    use crate::query::parse;
    use serde_json::json;

    fn run_with_vars(query: &str, vars: Vars) -> RowqlResult<(Vec<String>, Vec<Vec<Value>>, ExecutionStats)> {
        let parsed = parse(query, "memory", WarningPolicy::Default)?;
        let engine = ExecutionEngine::new(
            &parsed,
            ExecutionOptions {
                warnings: WarningPolicy::Default,
                vars,
            },
        );
        let mut source = engine
            .expression_source()?
            .expect("query reads from an expression");
        let mut writer = MemoryWriter::new();
        let stats = engine.run(&mut source, &mut writer)?;
        let out = writer.into_output();
        Ok((out.columns, out.rows, stats))
    }

    fn run(query: &str) -> Vec<Vec<Value>> {
        run_with_vars(query, Vars::new()).unwrap().1
    }

    #[test]
    fn test_select_without_from() {
        let (cols, rows, stats) = run_with_vars("SELECT 1 + 2 AS three", Vars::new()).unwrap();
        assert_eq!(cols, vec!["three"]);
        assert_eq!(rows, vec![vec![json!(3)]]);
        assert_eq!(stats, ExecutionStats { rows_in: 1, rows_out: 1 });
    }

    #[test]
    fn test_where_and_row_number() {
        let rows = run("SELECT col1, row_number FROM range(10) WHERE col1 % 3 == 0");
        assert_eq!(
            rows,
            vec![
                vec![json!(0), json!(1)],
                vec![json!(3), json!(2)],
                vec![json!(6), json!(3)],
                vec![json!(9), json!(4)],
            ]
        );
    }

    #[test]
    fn test_star_and_header() {
        let (cols, rows, _) = run_with_vars("SELECT *, col1 * 10 AS x FROM [[1, 2]]", Vars::new()).unwrap();
        assert_eq!(cols, vec!["col1", "col2", "x"]);
        assert_eq!(rows, vec![vec![json!(1), json!(2), json!(10)]]);
    }

    #[test]
    fn test_limit_zero_stops_after_header() {
        let (cols, rows, stats) = run_with_vars("SELECT col1 FROM [1, 2] LIMIT 0", Vars::new()).unwrap();
        assert_eq!(cols, vec!["col1"]);
        assert!(rows.is_empty());
        assert_eq!(stats.rows_out, 0);
    }

    #[test]
    fn test_limit_stops_pulling() {
        let (_, rows, stats) = run_with_vars("SELECT col1 FROM range(1000) LIMIT 3", Vars::new()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(stats.rows_in, 3);
    }

    #[test]
    fn test_group_by_output_column() {
        let rows = run("SELECT col1 % 2 AS a, count_agg(*) AS c FROM range(101) GROUP BY 1");
        assert_eq!(rows, vec![vec![json!(0), json!(51)], vec![json!(1), json!(50)]]);
    }

    #[test]
    fn test_implicit_group() {
        let rows = run("SELECT sum_agg(col1) AS s, count_agg(*) AS c FROM [1, 2, 3]");
        assert_eq!(rows, vec![vec![json!(6), json!(3)]]);
    }

    #[test]
    fn test_partials() {
        let rows = run("SELECT PARTIALS sum_agg(col1) FROM [1, 2, 3]");
        assert_eq!(rows, vec![vec![json!(1)], vec![json!(3)], vec![json!(6)]]);
    }

    #[test]
    fn test_order_by_expression_and_output_column() {
        let rows = run("SELECT col1 FROM [3, 1, 2] ORDER BY col1 DESC");
        assert_eq!(rows, vec![vec![json!(3)], vec![json!(2)], vec![json!(1)]]);
        let rows = run("SELECT -col1 AS neg FROM [3, 1, 2] ORDER BY 1");
        assert_eq!(rows, vec![vec![json!(-3)], vec![json!(-2)], vec![json!(-1)]]);
    }

    #[test]
    fn test_explode() {
        let mut vars = Vars::new();
        vars.insert(
            "data".to_string(),
            json!([{"name": "a", "tags": [1, 2]}, {"name": "b", "tags": []}, {"name": "c", "tags": [3]}]),
        );
        let (_, rows, _) =
            run_with_vars("SELECT row.name, row.tags FROM data EXPLODE row.tags", vars).unwrap();
        assert_eq!(
            rows,
            vec![
                vec![json!("a"), json!(1)],
                vec![json!("a"), json!(2)],
                vec![json!("c"), json!(3)],
            ]
        );
    }

    #[test]
    fn test_explode_scalar_is_error() {
        let mut vars = Vars::new();
        vars.insert("data".to_string(), json!([{"tags": 5}]));
        let err = run_with_vars("SELECT 1 FROM data EXPLODE row.tags", vars).unwrap_err();
        assert!(matches!(err, RowqlError::RuntimeError { .. }));
    }

    #[test]
    fn test_runtime_error_has_location_and_row() {
        let err = run_with_vars("SELECT 1, col1 + '' FROM [1, 2]", Vars::new()).unwrap_err();
        match err {
            RowqlError::RuntimeError { location, row, .. } => {
                assert_eq!(location, ClauseRef::at("SELECT", 2));
                assert_eq!(row, 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_compile_error_points_at_item() {
        let err = run_with_vars("SELECT 1, (2 +, 3 FROM [1]", Vars::new()).unwrap_err();
        match err {
            RowqlError::CompileError { location, .. } => {
                assert_eq!(location, ClauseRef::at("SELECT", 2));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let err = run_with_vars("SELECT col1 FROM [1] ORDER BY 1, col1 *", Vars::new()).unwrap_err();
        match err {
            RowqlError::CompileError { location, .. } => {
                assert_eq!(location, ClauseRef::at("ORDER BY", 2));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_imports_and_format_args() {
        let rows = run("IMPORT math AS m SELECT m.floor(2.7), math.pi > 3");
        assert_eq!(rows, vec![vec![json!(2), json!(true)]]);

        let parsed = parse("SELECT 1 FROM csv('a.csv', delimiter=';') TO json", "memory", WarningPolicy::Default).unwrap();
        let engine = ExecutionEngine::new(&parsed, ExecutionOptions::default());
        assert!(engine.expression_source().unwrap().is_none());
        if let Some(ClauseTarget::Format(call)) = &parsed.from {
            let args = engine.evaluate_format_args(call, "FROM").unwrap();
            assert_eq!(args.args, vec![json!("a.csv")]);
            assert_eq!(args.kwargs.get("delimiter"), Some(&json!(";")));
        } else {
            panic!("expected a format call");
        }
    }

    #[test]
    fn test_aggregates_reset_between_runs() {
        let parsed = parse("SELECT count_agg(*) FROM [1, 2]", "memory", WarningPolicy::Default).unwrap();
        let engine = ExecutionEngine::new(&parsed, ExecutionOptions::default());
        for _ in 0..2 {
            let mut source = engine.expression_source().unwrap().unwrap();
            let mut writer = MemoryWriter::new();
            engine.run(&mut source, &mut writer).unwrap();
            assert_eq!(writer.output().rows, vec![vec![json!(2)]]);
        }
    }
}
