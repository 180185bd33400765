//! NULL helpers and NULL-safe type conversions.

use serde_json::Value;

use super::{check_arg_range, check_args};
use crate::diagnostics::WarningPolicy;
use crate::error::RowqlResult;
use crate::executor::helpers::{display_value, number_from_f64, to_bool, values_equal};

pub(super) const FUNCTIONS: &[&str] = &[
    "coalesce", "ifnull", "nullif", "is_null", "int", "float", "str", "bool",
];

/// Call a conversion function. Returns None if function not found.
pub fn call(name: &str, args: &[Value], warnings: WarningPolicy) -> RowqlResult<Option<Value>> {
    let result = match name {
        "coalesce" => args.iter().find(|v| !v.is_null()).cloned().unwrap_or(Value::Null),

        "ifnull" => {
            check_args(name, args, 2)?;
            if args[0].is_null() {
                args[1].clone()
            } else {
                args[0].clone()
            }
        }

        "nullif" => {
            check_args(name, args, 2)?;
            if values_equal(&args[0], &args[1]) {
                Value::Null
            } else {
                args[0].clone()
            }
        }

        "is_null" => {
            check_args(name, args, 1)?;
            Value::Bool(args[0].is_null())
        }

        "int" => {
            check_arg_range(name, args, 1, 2)?;
            let base = match args.get(1) {
                Some(b) => b.as_u64().map(|b| b as u32).unwrap_or(10),
                None => 10,
            };
            match to_int(&args[0], base) {
                Some(v) => v,
                None => {
                    warnings.conversion_warning("int", &args[0])?;
                    Value::Null
                }
            }
        }

        "float" => {
            check_args(name, args, 1)?;
            match to_float(&args[0]) {
                Some(v) => v,
                None => {
                    warnings.conversion_warning("float", &args[0])?;
                    Value::Null
                }
            }
        }

        "str" => {
            check_args(name, args, 1)?;
            if args[0].is_null() {
                Value::Null
            } else {
                Value::String(display_value(&args[0]))
            }
        }

        "bool" => {
            check_args(name, args, 1)?;
            Value::Bool(to_bool(&args[0]))
        }

        _ => return Ok(None),
    };

    Ok(Some(result))
}

fn to_int(value: &Value, base: u32) -> Option<Value> {
    match value {
        Value::Null => Some(Value::Null),
        Value::Bool(b) => Some(Value::from(*b as i64)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Value::from(i)),
            None => {
                let f = n.as_f64()?.trunc();
                (f.is_finite() && f.abs() < i64::MAX as f64).then(|| Value::from(f as i64))
            }
        },
        Value::String(s) => {
            let cleaned = s.trim().replace('_', "");
            i64::from_str_radix(&cleaned, base).ok().map(Value::from)
        }
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<Value> {
    match value {
        Value::Null => Some(Value::Null),
        Value::Bool(b) => Some(number_from_f64(if *b { 1.0 } else { 0.0 })),
        Value::Number(n) => n.as_f64().map(number_from_f64),
        Value::String(s) => s.trim().parse::<f64>().ok().map(number_from_f64),
        _ => None,
    }
}
