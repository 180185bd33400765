//! Builtin functions available inside row expressions.
//!
//! Plain functions (`upper(x)`, `coalesce(a, b)`) are dispatched through
//! [`BuiltinFunctions::call`]; module functions (`re.sub(...)`,
//! `json.loads(...)`) through [`BuiltinFunctions::call_module`].

mod collections;
mod convert;
mod datetime;
mod json_funcs;
mod math;
mod regex_funcs;
mod string;

use serde_json::Value;

use crate::diagnostics::WarningPolicy;
use crate::error::{RowqlError, RowqlResult};

/// Modules that can be imported (and are always reachable by their own name).
pub const MODULES: &[&str] = &["math", "re", "json", "datetime"];

/// Functions that receive NULL arguments as-is. Every other builtin returns
/// NULL as soon as one of its arguments is NULL.
const NULL_AWARE: &[&str] = &[
    "coalesce", "ifnull", "nullif", "is_null", "bool", "str", "get", "format",
];

/// Container for builtin function implementations.
pub struct BuiltinFunctions;

impl BuiltinFunctions {
    /// Call a plain builtin function by name.
    pub fn call(name: &str, args: &[Value], warnings: WarningPolicy) -> RowqlResult<Value> {
        let lower_name = name.to_lowercase();

        if !NULL_AWARE.contains(&lower_name.as_str()) && args.iter().any(Value::is_null) {
            if Self::exists(&lower_name) {
                return Ok(Value::Null);
            }
            return Err(unknown_function(name));
        }

        // Null helpers and conversions
        if let Some(result) = convert::call(&lower_name, args, warnings)? {
            return Ok(result);
        }

        // String functions
        if let Some(result) = string::call(&lower_name, args)? {
            return Ok(result);
        }

        // Math functions
        if let Some(result) = math::call(&lower_name, args)? {
            return Ok(result);
        }

        // Collection functions
        if let Some(result) = collections::call(&lower_name, args)? {
            return Ok(result);
        }

        Err(unknown_function(name))
    }

    /// Call a function of an imported module, e.g. `re.sub`.
    pub fn call_module(module: &str, name: &str, args: &[Value]) -> RowqlResult<Value> {
        let lower_name = name.to_lowercase();
        let null_aware = module == "json" && lower_name == "dumps";
        if !null_aware && args.iter().any(Value::is_null) {
            return Ok(Value::Null);
        }

        let result = match module {
            "math" => math::call(&lower_name, args)?,
            "re" => regex_funcs::call(&lower_name, args)?,
            "json" => json_funcs::call(&lower_name, args)?,
            "datetime" => datetime::call(&lower_name, args)?,
            _ => return Err(RowqlError::ModuleNotFound(module.to_string())),
        };

        result.ok_or_else(|| {
            RowqlError::EvalError(format!(
                "module '{}' has no attribute '{}'",
                module, name
            ))
        })
    }

    /// Constants exposed when a module alias is used as a value (`math.pi`).
    pub fn module_constants(module: &str) -> Value {
        match module {
            "math" => math::constants(),
            _ => Value::Object(serde_json::Map::new()),
        }
    }

    fn exists(name: &str) -> bool {
        [
            convert::FUNCTIONS,
            string::FUNCTIONS,
            math::FUNCTIONS,
            collections::FUNCTIONS,
        ]
        .iter()
        .any(|names| names.contains(&name))
    }
}

fn unknown_function(name: &str) -> RowqlError {
    RowqlError::EvalError(format!("name '{}' is not defined", name))
}

pub(crate) fn check_args(name: &str, args: &[Value], expected: usize) -> RowqlResult<()> {
    if args.len() != expected {
        return Err(RowqlError::EvalError(format!(
            "{}() takes {} argument(s) ({} given)",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn check_arg_range(
    name: &str,
    args: &[Value],
    min: usize,
    max: usize,
) -> RowqlResult<()> {
    if args.len() < min || args.len() > max {
        return Err(RowqlError::EvalError(format!(
            "{}() takes from {} to {} arguments ({} given)",
            name,
            min,
            max,
            args.len()
        )));
    }
    Ok(())
}

pub(crate) fn get_number(v: &Value, func_name: &str) -> RowqlResult<f64> {
    super::helpers::as_float(v).ok_or_else(|| {
        RowqlError::TypeError(format!(
            "{}() argument must be a number, not '{}'",
            func_name,
            super::helpers::type_name(v)
        ))
    })
}

pub(crate) fn get_str<'a>(v: &'a Value, func_name: &str) -> RowqlResult<&'a str> {
    v.as_str().ok_or_else(|| {
        RowqlError::TypeError(format!(
            "{}() argument must be str, not '{}'",
            func_name,
            super::helpers::type_name(v)
        ))
    })
}

pub(crate) fn get_int(v: &Value, func_name: &str) -> RowqlResult<i64> {
    match v {
        Value::Number(n) if n.is_i64() => Ok(n.as_i64().unwrap_or(0)),
        Value::Bool(b) => Ok(*b as i64),
        other => Err(RowqlError::TypeError(format!(
            "{}() argument must be an integer, not '{}'",
            func_name,
            super::helpers::type_name(other)
        ))),
    }
}

pub(crate) fn get_array<'a>(v: &'a Value, func_name: &str) -> RowqlResult<&'a Vec<Value>> {
    v.as_array().ok_or_else(|| {
        RowqlError::TypeError(format!(
            "{}() argument must be a list, not '{}'",
            func_name,
            super::helpers::type_name(v)
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: &[Value]) -> Value {
        BuiltinFunctions::call(name, args, WarningPolicy::Default).unwrap()
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(call("upper", &[json!("hello")]), json!("HELLO"));
        assert_eq!(call("LOWER", &[json!("HELLO")]), json!("hello"));
        assert_eq!(call("len", &[json!("hello")]), json!(5));
    }

    #[test]
    fn test_null_propagation() {
        assert_eq!(call("upper", &[json!(null)]), json!(null));
        assert_eq!(call("abs", &[json!(null)]), json!(null));
        assert_eq!(call("coalesce", &[json!(null), json!(2)]), json!(2));
        assert_eq!(call("is_null", &[json!(null)]), json!(true));
    }

    #[test]
    fn test_unknown_function() {
        let err = BuiltinFunctions::call("nope", &[json!(1)], WarningPolicy::Default).unwrap_err();
        assert_eq!(err.to_string(), "Evaluation error: name 'nope' is not defined");
        assert!(BuiltinFunctions::call("nope", &[json!(null)], WarningPolicy::Default).is_err());
    }

    #[test]
    fn test_module_functions() {
        assert_eq!(
            BuiltinFunctions::call_module("math", "sqrt", &[json!(16)]).unwrap(),
            json!(4.0)
        );
        assert_eq!(
            BuiltinFunctions::call_module("json", "dumps", &[json!(null)]).unwrap(),
            json!("null")
        );
        assert!(BuiltinFunctions::call_module("json", "nothing", &[json!(1)]).is_err());
        assert_eq!(
            BuiltinFunctions::module_constants("math")["pi"],
            json!(std::f64::consts::PI)
        );
    }
}
