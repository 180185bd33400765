//! Tree-walking evaluator over the expression AST.

use serde_json::Value;

use super::aggregation::is_aggregate;
use super::builtins::BuiltinFunctions;
use super::helpers::{
    display_value, evaluate_binary_op, evaluate_unary_op, get_item, slice_value, to_bool,
    values_equal,
};
use super::{ExpressionEvaluator, Scope};
use crate::ast::{BinaryOperator, Expression};
use crate::diagnostics::WarningPolicy;
use crate::error::{RowqlError, RowqlResult};
use crate::parser;

/// The shipped [`ExpressionEvaluator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter {
    warnings: WarningPolicy,
}

impl Interpreter {
    pub fn new(warnings: WarningPolicy) -> Self {
        Self { warnings }
    }

    /// Aggregate calls that only run on some rows shift the call positions
    /// of every later aggregate in the row.
    fn check_conditional_aggregates(&self, expr: &Expression) -> RowqlResult<()> {
        for branch in expr.conditional_branches() {
            if let Some(name) = branch
                .called_functions()
                .into_iter()
                .find(|name| is_aggregate(name))
            {
                self.warnings.warn(&format!(
                    "aggregate function {} is called inside a conditional expression; \
                     results may be inconsistent across rows",
                    name
                ))?;
            }
        }
        Ok(())
    }

    fn evaluate_expression(&self, expr: &Expression, scope: &mut Scope<'_>) -> RowqlResult<Value> {
        match expr {
            Expression::Literal(v) => Ok(v.clone()),

            Expression::Column(i) => Ok(scope.values.get(*i).cloned().unwrap_or(Value::Null)),

            Expression::Variable(name) => self.resolve_variable(name, scope),

            Expression::FieldAccess(base, field) => {
                if let Expression::Variable(alias) = base.as_ref() {
                    if let Some(module) = self.module_alias(alias, scope) {
                        let constants = BuiltinFunctions::module_constants(&module);
                        return constants.get(field).cloned().ok_or_else(|| {
                            RowqlError::EvalError(format!(
                                "module '{}' has no attribute '{}'",
                                module, field
                            ))
                        });
                    }
                }
                let base_val = self.evaluate_expression(base, scope)?;
                get_item(&base_val, &Value::String(field.clone()))
            }

            Expression::Index(base, index) => {
                let base_val = self.evaluate_expression(base, scope)?;
                let index_val = self.evaluate_expression(index, scope)?;
                get_item(&base_val, &index_val)
            }

            Expression::Slice { base, start, end } => {
                let base_val = self.evaluate_expression(base, scope)?;
                let start_val = match start {
                    Some(s) => self.evaluate_expression(s, scope)?,
                    None => Value::Null,
                };
                let end_val = match end {
                    Some(e) => self.evaluate_expression(e, scope)?,
                    None => Value::Null,
                };
                slice_value(&base_val, &start_val, &end_val)
            }

            Expression::BinaryOp { left, op, right } => {
                // AND/OR follow three-valued logic and short-circuit
                match op {
                    BinaryOperator::And => {
                        let left_val = self.evaluate_expression(left, scope)?;
                        if !left_val.is_null() && !to_bool(&left_val) {
                            return Ok(Value::Bool(false));
                        }
                        let right_val = self.evaluate_expression(right, scope)?;
                        if !right_val.is_null() && !to_bool(&right_val) {
                            return Ok(Value::Bool(false));
                        }
                        if left_val.is_null() || right_val.is_null() {
                            return Ok(Value::Null);
                        }
                        Ok(Value::Bool(true))
                    }
                    BinaryOperator::Or => {
                        let left_val = self.evaluate_expression(left, scope)?;
                        if to_bool(&left_val) {
                            return Ok(Value::Bool(true));
                        }
                        let right_val = self.evaluate_expression(right, scope)?;
                        if to_bool(&right_val) {
                            return Ok(Value::Bool(true));
                        }
                        if left_val.is_null() || right_val.is_null() {
                            return Ok(Value::Null);
                        }
                        Ok(Value::Bool(false))
                    }
                    BinaryOperator::NullCoalesce => {
                        let left_val = self.evaluate_expression(left, scope)?;
                        if !left_val.is_null() {
                            return Ok(left_val);
                        }
                        self.evaluate_expression(right, scope)
                    }
                    _ => {
                        let left_val = self.evaluate_expression(left, scope)?;
                        let right_val = self.evaluate_expression(right, scope)?;
                        evaluate_binary_op(&left_val, op, &right_val)
                    }
                }
            }

            Expression::UnaryOp { op, operand } => {
                let operand_val = self.evaluate_expression(operand, scope)?;
                evaluate_unary_op(op, &operand_val)
            }

            Expression::IsNull { operand, negated } => {
                let operand_val = self.evaluate_expression(operand, scope)?;
                Ok(Value::Bool(operand_val.is_null() != *negated))
            }

            Expression::Object(fields) => {
                let mut obj = serde_json::Map::new();
                for (key_expr, value_expr) in fields {
                    let key = match self.evaluate_expression(key_expr, scope)? {
                        Value::String(s) => s,
                        other => display_value(&other),
                    };
                    let value = self.evaluate_expression(value_expr, scope)?;
                    obj.insert(key, value);
                }
                Ok(Value::Object(obj))
            }

            Expression::Array(elements) => {
                let mut arr = Vec::with_capacity(elements.len());
                for elem in elements {
                    arr.push(self.evaluate_expression(elem, scope)?);
                }
                Ok(Value::Array(arr))
            }

            Expression::FunctionCall { name, args } => {
                let args = self.evaluate_args(args, scope)?;
                self.call_function(name, &args, scope)
            }

            Expression::MethodCall {
                receiver,
                name,
                args,
            } => {
                if let Expression::Variable(alias) = receiver.as_ref() {
                    if let Some(module) = self.module_alias(alias, scope) {
                        let args = self.evaluate_args(args, scope)?;
                        return BuiltinFunctions::call_module(&module, name, &args);
                    }
                }
                // x.f(a) is f(x, a)
                let mut all_args = vec![self.evaluate_expression(receiver, scope)?];
                all_args.extend(self.evaluate_args(args, scope)?);
                self.call_function(name, &all_args, scope)
            }

            Expression::Ternary {
                condition,
                true_expr,
                false_expr,
            } => {
                let cond = self.evaluate_expression(condition, scope)?;
                if to_bool(&cond) {
                    self.evaluate_expression(true_expr, scope)
                } else {
                    self.evaluate_expression(false_expr, scope)
                }
            }

            Expression::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                let operand_val = match operand {
                    Some(op) => Some(self.evaluate_expression(op, scope)?),
                    None => None,
                };

                for (condition, result) in when_clauses {
                    let cond_val = self.evaluate_expression(condition, scope)?;
                    let matches = match &operand_val {
                        Some(op_val) => !op_val.is_null() && values_equal(op_val, &cond_val),
                        None => to_bool(&cond_val),
                    };
                    if matches {
                        return self.evaluate_expression(result, scope);
                    }
                }

                match else_clause {
                    Some(else_expr) => self.evaluate_expression(else_expr, scope),
                    None => Ok(Value::Null),
                }
            }
        }
    }

    fn evaluate_args(&self, args: &[Expression], scope: &mut Scope<'_>) -> RowqlResult<Vec<Value>> {
        args.iter()
            .map(|arg| self.evaluate_expression(arg, scope))
            .collect()
    }

    fn call_function(&self, name: &str, args: &[Value], scope: &mut Scope<'_>) -> RowqlResult<Value> {
        if is_aggregate(name) {
            return scope.aggregates.call(name, args);
        }
        BuiltinFunctions::call(name, args, scope.warnings)
    }

    /// Module behind an identifier, unless a user variable shadows it.
    fn module_alias(&self, name: &str, scope: &Scope<'_>) -> Option<String> {
        if scope.vars.contains_key(name) {
            return None;
        }
        scope.module(name).map(str::to_string)
    }

    fn resolve_variable(&self, name: &str, scope: &Scope<'_>) -> RowqlResult<Value> {
        match name {
            "_values" | "cols" => Ok(Value::Array(scope.values.to_vec())),
            "_names" => Ok(Value::Array(
                scope.names.iter().cloned().map(Value::String).collect(),
            )),
            "row" => Ok(scope.row().clone()),
            "row_number" => Ok(Value::from(scope.row_number)),
            "input_row_number" => Ok(Value::from(scope.input_row_number)),
            _ => {
                if let Some(value) = scope.vars.get(name) {
                    return Ok(value.clone());
                }
                if let Some(module) = scope.module(name) {
                    return Ok(BuiltinFunctions::module_constants(module));
                }
                Err(RowqlError::EvalError(format!(
                    "name '{}' is not defined",
                    name
                )))
            }
        }
    }
}

/// Where an EXPLODE target lives in the row.
enum AssignRoot {
    Column(usize),
    Row,
}

fn assignment_path(expr: &Expression, path: &mut Vec<Value>) -> RowqlResult<AssignRoot> {
    match expr {
        Expression::Column(i) => Ok(AssignRoot::Column(*i)),
        Expression::Variable(name) if name == "row" => Ok(AssignRoot::Row),
        Expression::FieldAccess(base, field) => {
            let root = assignment_path(base, path)?;
            path.push(Value::String(field.clone()));
            Ok(root)
        }
        Expression::Index(base, index) => match index.as_ref() {
            Expression::Literal(key @ (Value::String(_) | Value::Number(_))) => {
                let root = assignment_path(base, path)?;
                path.push(key.clone());
                Ok(root)
            }
            _ => Err(not_assignable()),
        },
        _ => Err(not_assignable()),
    }
}

fn not_assignable() -> RowqlError {
    RowqlError::EvalError(
        "EXPLODE target must be a column or a path of constant keys into a column".to_string(),
    )
}

fn descend<'v>(target: &'v mut Value, key: &Value) -> RowqlResult<&'v mut Value> {
    match (target, key) {
        (Value::Object(obj), Value::String(k)) => {
            Ok(obj.entry(k.clone()).or_insert(Value::Null))
        }
        (Value::Array(arr), Value::Number(n)) => {
            let len = arr.len() as i64;
            let i = n.as_i64().unwrap_or(len);
            let i = if i < 0 { len + i } else { i };
            if (0..len).contains(&i) {
                Ok(&mut arr[i as usize])
            } else {
                Err(RowqlError::EvalError(format!("list index {} out of range", i)))
            }
        }
        (other, _) => Err(RowqlError::TypeError(format!(
            "cannot assign into '{}'",
            super::helpers::type_name(other)
        ))),
    }
}

impl ExpressionEvaluator for Interpreter {
    type Compiled = Expression;

    fn compile(&self, text: &str) -> RowqlResult<Expression> {
        let expr = parser::parse(text)?;
        self.check_conditional_aggregates(&expr)?;
        Ok(expr)
    }

    fn compile_many(&self, text: &str) -> RowqlResult<Vec<Expression>> {
        let exprs = parser::parse_list(text)?;
        for expr in &exprs {
            self.check_conditional_aggregates(expr)?;
        }
        Ok(exprs)
    }

    fn evaluate(&self, expr: &Expression, scope: &mut Scope<'_>) -> RowqlResult<Value> {
        self.evaluate_expression(expr, scope)
    }

    fn assign(
        &self,
        target: &Expression,
        values: &mut [Value],
        names: &[String],
        value: Value,
    ) -> RowqlResult<()> {
        let mut path = Vec::new();
        let root = assignment_path(target, &mut path)?;

        let (column, keys) = match root {
            AssignRoot::Column(i) => (i, &path[..]),
            AssignRoot::Row if Scope::collapses_row(values) => (0, &path[..]),
            AssignRoot::Row => {
                let first = path.first().and_then(Value::as_str).ok_or_else(not_assignable)?;
                let i = names.iter().position(|n| n == first).ok_or_else(|| {
                    RowqlError::EvalError(format!("no column named '{}'", first))
                })?;
                (i, &path[1..])
            }
        };

        let mut slot = values.get_mut(column).ok_or_else(|| {
            RowqlError::EvalError(format!("column {} does not exist", column + 1))
        })?;
        for key in keys {
            slot = descend(slot, key)?;
        }
        *slot = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{AggregationContext, Vars};
    use serde_json::json;
    use std::collections::HashMap;

    fn eval_row(text: &str, values: &[Value], names: &[&str]) -> RowqlResult<Value> {
        let interp = Interpreter::default();
        let expr = interp.compile(text)?;
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let vars = Vars::new();
        let imports = HashMap::from([("regex".to_string(), "re".to_string())]);
        let mut aggs = AggregationContext::new();
        let mut scope = Scope::new(values, &names, &vars, &imports, &mut aggs, WarningPolicy::Default);
        scope.row_number = 3;
        interp.evaluate(&expr, &mut scope)
    }

    fn eval(text: &str) -> Value {
        eval_row(text, &[], &[]).unwrap()
    }

    #[test]
    fn test_arithmetic_and_precedence() {
        assert_eq!(eval("1 + 2 * 3"), json!(7));
        assert_eq!(eval("2 ** 3 ** 2"), json!(512));
        assert_eq!(eval("7 // 2 + 7 % 2"), json!(4));
        assert_eq!(eval("-2 ** 2"), json!(-4));
    }

    #[test]
    fn test_three_valued_logic() {
        assert_eq!(eval("NULL AND FALSE"), json!(false));
        assert_eq!(eval("NULL AND TRUE"), json!(null));
        assert_eq!(eval("NULL OR TRUE"), json!(true));
        assert_eq!(eval("NULL OR FALSE"), json!(null));
        assert_eq!(eval("NOT NULL"), json!(null));
        assert_eq!(eval("NULL IS NULL"), json!(true));
        assert_eq!(eval("1 IS NOT NULL"), json!(true));
    }

    #[test]
    fn test_columns_and_row() {
        let values = [json!(1), json!("x")];
        assert_eq!(eval_row("_values[0] + 1", &values, &["a", "b"]).unwrap(), json!(2));
        assert_eq!(eval_row("row.b", &values, &["a", "b"]).unwrap(), json!("x"));
        assert_eq!(eval_row("_names", &values, &["a", "b"]).unwrap(), json!(["a", "b"]));
        assert_eq!(eval_row("row_number", &values, &["a", "b"]).unwrap(), json!(3));
    }

    #[test]
    fn test_single_object_row_collapses() {
        let values = [json!({"name": "ann", "tags": ["a"]})];
        assert_eq!(eval_row("row.name", &values, &["json"]).unwrap(), json!("ann"));
        assert_eq!(eval_row("_values[0]['missing']", &values, &["json"]).unwrap(), json!(null));
    }

    #[test]
    fn test_method_sugar_and_modules() {
        assert_eq!(eval("'abc'.upper()"), json!("ABC"));
        assert_eq!(eval("','.join(['a', 'b'])"), json!("a,b"));
        assert_eq!(eval("math.floor(2.7)"), json!(2));
        assert_eq!(eval("regex.sub('a', 'b', 'aa')"), json!("bb"));
        assert_eq!(eval("math.pi > 3"), json!(true));
    }

    #[test]
    fn test_case_and_ternary() {
        assert_eq!(eval("CASE WHEN 1 > 2 THEN 'a' ELSE 'b' END"), json!("b"));
        assert_eq!(eval("CASE 2 WHEN 1 THEN 'one' WHEN 2 THEN 'two' END"), json!("two"));
        assert_eq!(eval("'y' if 1 < 2 else 'n'"), json!("y"));
        assert_eq!(eval("NULL ?? 5"), json!(5));
    }

    #[test]
    fn test_runtime_errors() {
        assert!(eval_row("2 + ''", &[], &[]).unwrap_err().is_evaluation_error());
        let err = eval_row("nope + 1", &[], &[]).unwrap_err();
        assert!(err.to_string().contains("name 'nope' is not defined"));
    }

    #[test]
    fn test_aggregates_use_context() {
        let interp = Interpreter::default();
        let expr = interp.compile("sum_agg(_values[0])").unwrap();
        let (names, vars, imports) = (vec!["col1".to_string()], Vars::new(), HashMap::new());
        let mut aggs = AggregationContext::new();
        let mut last = Value::Null;
        for v in [json!(1), json!(null), json!(4)] {
            aggs.start_row("");
            let values = [v];
            let mut scope = Scope::new(&values, &names, &vars, &imports, &mut aggs, WarningPolicy::Default);
            last = interp.evaluate(&expr, &mut scope).unwrap();
        }
        assert_eq!(last, json!(5));
    }

    #[test]
    fn test_conditional_aggregate_warning() {
        let strict = Interpreter::new(WarningPolicy::Error);
        assert!(strict.compile("sum_agg(_values[0]) if _values[0] > 0 else 0").is_err());
        assert!(strict.compile("sum_agg(_values[0] if _values[0] > 0 else 0)").is_ok());
    }

    #[test]
    fn test_assign_paths() {
        let interp = Interpreter::default();
        let names = vec!["json".to_string()];

        let mut values = vec![json!({"a": {"items": [1, 2]}})];
        let target = interp.compile("_values[0]['a'].items").unwrap();
        interp.assign(&target, &mut values, &names, json!(1)).unwrap();
        assert_eq!(values[0], json!({"a": {"items": 1}}));

        let target = interp.compile("row.a").unwrap();
        interp.assign(&target, &mut values, &names, json!("x")).unwrap();
        assert_eq!(values[0], json!({"a": "x"}));

        let mut flat = vec![json!(1), json!([3, 4])];
        let names = vec!["id".to_string(), "list".to_string()];
        let target = interp.compile("row.list").unwrap();
        interp.assign(&target, &mut flat, &names, json!(3)).unwrap();
        assert_eq!(flat, vec![json!(1), json!(3)]);

        assert!(interp.compile("1 + 2").and_then(|t| interp.assign(&t, &mut flat, &names, json!(0))).is_err());
    }
}
