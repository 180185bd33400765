//! Library facade: parse once, run many times.

use serde_json::{Map, Value};

use crate::diagnostics::WarningPolicy;
use crate::error::{RowqlError, RowqlResult};
use crate::executor::{ExecutionEngine, ExecutionOptions, ExecutionStats, FormatArgs, Vars};
use crate::output::{MemoryWriter, QueryOutput, RowWriter};
use crate::query::{parse, ClauseTarget, FormatCall, ParsedQuery};
use crate::source::RowSource;

/// Name of the writer that collects rows into a [`QueryOutput`].
pub const MEMORY_FORMAT: &str = "memory";

/// Opens readers and writers named in FROM/TO clauses.
pub trait FormatRegistry {
    fn open_reader(&self, name: &str, args: FormatArgs) -> RowqlResult<Box<dyn RowSource>>;

    fn open_writer(&self, name: &str, args: FormatArgs) -> RowqlResult<Box<dyn RowWriter>>;
}

/// A parsed query.
///
/// ```
/// use rowql_core::Query;
/// use serde_json::json;
///
/// let query = Query::new("SELECT row.name FROM data WHERE row.age > 30").unwrap();
/// let mut vars = rowql_core::Vars::new();
/// vars.insert("data".into(), json!([{"name": "Alice", "age": 20}, {"name": "Bob", "age": 40}]));
/// let (output, stats) = query.run(vars).unwrap();
/// assert_eq!(output.rows, vec![vec![json!("Bob")]]);
/// assert_eq!(stats.rows_in, 2);
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
    parsed: ParsedQuery,
    warnings: WarningPolicy,
}

impl Query {
    pub fn new(text: &str) -> RowqlResult<Self> {
        Self::with_options(text, MEMORY_FORMAT, WarningPolicy::Default)
    }

    /// `default_to` is the writer used when the query has no TO clause.
    pub fn with_options(text: &str, default_to: &str, warnings: WarningPolicy) -> RowqlResult<Self> {
        let parsed = parse(text, default_to, warnings)?;
        Ok(Self {
            text: text.to_string(),
            parsed,
            warnings,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parsed(&self) -> &ParsedQuery {
        &self.parsed
    }

    fn engine(&self, vars: Vars) -> ExecutionEngine<'_> {
        ExecutionEngine::new(
            &self.parsed,
            ExecutionOptions {
                warnings: self.warnings,
                vars,
            },
        )
    }

    /// Run against in-memory variables, collecting the output. The FROM
    /// clause must be an expression (or absent); TO is ignored.
    pub fn run(&self, vars: Vars) -> RowqlResult<(QueryOutput, ExecutionStats)> {
        let engine = self.engine(vars);
        let mut source = match engine.expression_source()? {
            Some(source) => source,
            None => return Err(reader_needed(&self.parsed)),
        };
        let mut writer = MemoryWriter::new();
        let stats = engine.run(&mut source, &mut writer)?;
        Ok((writer.into_output(), stats))
    }

    /// Run with a caller-supplied source and writer.
    pub fn run_with(
        &self,
        vars: Vars,
        source: &mut dyn RowSource,
        writer: &mut dyn RowWriter,
    ) -> RowqlResult<ExecutionStats> {
        self.engine(vars).run(source, writer)
    }

    /// Run with readers and writers resolved through `registry`. Options
    /// given here are defaults; arguments written in the query win. Returns
    /// the collected output when writing `TO memory`.
    pub fn run_formats(
        &self,
        vars: Vars,
        registry: &dyn FormatRegistry,
        input_options: &Map<String, Value>,
        output_options: &Map<String, Value>,
    ) -> RowqlResult<(Option<QueryOutput>, ExecutionStats)> {
        let engine = self.engine(vars);

        let mut source: Box<dyn RowSource> = match (&self.parsed.from, engine.expression_source()?) {
            (_, Some(source)) => Box::new(source),
            (Some(ClauseTarget::Format(call)), None) => {
                let args = merged_args(&engine, call, "FROM", input_options)?;
                registry.open_reader(&call.name, args)?
            }
            (_, None) => return Err(reader_needed(&self.parsed)),
        };

        let call = match &self.parsed.to {
            ClauseTarget::Format(call) => call,
            ClauseTarget::Expression(text) => {
                return Err(RowqlError::UnknownFormat(format!("TO {}", text)))
            }
        };

        if call.name.eq_ignore_ascii_case(MEMORY_FORMAT) {
            let mut writer = MemoryWriter::new();
            let stats = engine.run(source.as_mut(), &mut writer)?;
            return Ok((Some(writer.into_output()), stats));
        }

        let args = merged_args(&engine, call, "TO", output_options)?;
        let mut writer = registry.open_writer(&call.name, args)?;
        let stats = engine.run(source.as_mut(), writer.as_mut())?;
        Ok((None, stats))
    }
}

fn merged_args(
    engine: &ExecutionEngine<'_>,
    call: &FormatCall,
    clause: &str,
    defaults: &Map<String, Value>,
) -> RowqlResult<FormatArgs> {
    let mut args = engine.evaluate_format_args(call, clause)?;
    let mut kwargs = defaults.clone();
    kwargs.append(&mut args.kwargs);
    args.kwargs = kwargs;
    Ok(args)
}

fn reader_needed(parsed: &ParsedQuery) -> RowqlError {
    let name = match &parsed.from {
        Some(ClauseTarget::Format(call)) => call.name.clone(),
        _ => String::new(),
    };
    RowqlError::UnknownFormat(format!("no reader available for '{}'", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSource;
    use serde_json::json;

    struct FixedRegistry;

    impl FormatRegistry for FixedRegistry {
        fn open_reader(&self, name: &str, args: FormatArgs) -> RowqlResult<Box<dyn RowSource>> {
            assert_eq!(name, "csv");
            assert_eq!(args.kwargs.get("delimiter"), Some(&json!(";")));
            assert_eq!(args.kwargs.get("header"), Some(&json!(false)));
            Ok(Box::new(VecSource::with_header(
                vec!["n".to_string()],
                vec![vec![json!(1)], vec![json!(2)]],
            )))
        }

        fn open_writer(&self, name: &str, _args: FormatArgs) -> RowqlResult<Box<dyn RowWriter>> {
            Err(RowqlError::UnknownFormat(name.to_string()))
        }
    }

    #[test]
    fn test_run_with_vars() {
        let q = Query::new("SELECT row.x * 2 AS y FROM data").unwrap();
        let mut vars = Vars::new();
        vars.insert("data".to_string(), json!([{"x": 1}, {"x": 2}]));
        let (out, stats) = q.run(vars).unwrap();
        assert_eq!(out.columns, vec!["y"]);
        assert_eq!(out.column("y"), Some(vec![json!(2), json!(4)]));
        assert_eq!(stats, ExecutionStats { rows_in: 2, rows_out: 2 });
    }

    #[test]
    fn test_run_needs_reader_for_format() {
        let q = Query::new("SELECT 1 FROM csv('x.csv')").unwrap();
        assert!(matches!(q.run(Vars::new()), Err(RowqlError::UnknownFormat(_))));
    }

    #[test]
    fn test_run_formats_merges_options() {
        let q = Query::new("SELECT n FROM csv(delimiter=';')").unwrap();
        let mut input = Map::new();
        input.insert("delimiter".to_string(), json!(","));
        input.insert("header".to_string(), json!(false));
        let (out, stats) = q
            .run_formats(Vars::new(), &FixedRegistry, &input, &Map::new())
            .unwrap();
        assert_eq!(out.unwrap().rows, vec![vec![json!(1)], vec![json!(2)]]);
        assert_eq!(stats.rows_in, 2);

        let q = Query::new("SELECT 1 TO csv").unwrap();
        assert!(q
            .run_formats(Vars::new(), &FixedRegistry, &Map::new(), &Map::new())
            .is_err());
    }
}
