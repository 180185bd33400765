//! Math builtin functions, also reachable as `math.<name>`.

use serde_json::{Map, Value};

use super::{check_arg_range, check_args, get_array, get_int, get_number};
use crate::ast::BinaryOperator;
use crate::error::{RowqlError, RowqlResult};
use crate::executor::helpers::{compare_values, evaluate_binary_op, number_from_f64};

pub(super) const FUNCTIONS: &[&str] = &[
    "abs", "round", "floor", "ceil", "trunc", "sqrt", "pow", "exp", "log", "log10", "log2",
    "sin", "cos", "tan", "asin", "acos", "atan", "atan2", "degrees", "radians", "min", "max",
    "sum",
];

/// `math.pi` and friends.
pub fn constants() -> Value {
    let mut obj = Map::new();
    obj.insert("pi".to_string(), number_from_f64(std::f64::consts::PI));
    obj.insert("e".to_string(), number_from_f64(std::f64::consts::E));
    obj.insert("tau".to_string(), number_from_f64(std::f64::consts::TAU));
    Value::Object(obj)
}

/// Call a math function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> RowqlResult<Option<Value>> {
    let result = match name {
        "abs" => {
            check_args(name, args, 1)?;
            match args[0].as_i64() {
                Some(i) => i
                    .checked_abs()
                    .map(Value::from)
                    .unwrap_or_else(|| number_from_f64((i as f64).abs())),
                None => number_from_f64(get_number(&args[0], name)?.abs()),
            }
        }

        "round" => {
            check_arg_range(name, args, 1, 2)?;
            let num = get_number(&args[0], name)?;
            match args.get(1) {
                None => float_to_int(round_half_even(num)),
                Some(d) => {
                    let multiplier = 10f64.powi(get_int(d, name)? as i32);
                    number_from_f64(round_half_even(num * multiplier) / multiplier)
                }
            }
        }

        "floor" => {
            check_args(name, args, 1)?;
            float_to_int(get_number(&args[0], name)?.floor())
        }

        "ceil" => {
            check_args(name, args, 1)?;
            float_to_int(get_number(&args[0], name)?.ceil())
        }

        "trunc" => {
            check_args(name, args, 1)?;
            float_to_int(get_number(&args[0], name)?.trunc())
        }

        "sqrt" => {
            check_args(name, args, 1)?;
            let num = get_number(&args[0], name)?;
            if num < 0.0 {
                return Err(math_domain_error());
            }
            number_from_f64(num.sqrt())
        }

        "pow" => {
            check_args(name, args, 2)?;
            let base = get_number(&args[0], name)?;
            let exp = get_number(&args[1], name)?;
            number_from_f64(base.powf(exp))
        }

        "exp" => {
            check_args(name, args, 1)?;
            number_from_f64(get_number(&args[0], name)?.exp())
        }

        "log" => {
            check_arg_range(name, args, 1, 2)?;
            let num = positive(get_number(&args[0], name)?)?;
            match args.get(1) {
                Some(base) => number_from_f64(num.ln() / positive(get_number(base, name)?)?.ln()),
                None => number_from_f64(num.ln()),
            }
        }

        "log10" => {
            check_args(name, args, 1)?;
            number_from_f64(positive(get_number(&args[0], name)?)?.log10())
        }

        "log2" => {
            check_args(name, args, 1)?;
            number_from_f64(positive(get_number(&args[0], name)?)?.log2())
        }

        "sin" | "cos" | "tan" | "atan" | "degrees" | "radians" => {
            check_args(name, args, 1)?;
            let num = get_number(&args[0], name)?;
            number_from_f64(match name {
                "sin" => num.sin(),
                "cos" => num.cos(),
                "tan" => num.tan(),
                "atan" => num.atan(),
                "degrees" => num.to_degrees(),
                _ => num.to_radians(),
            })
        }

        "asin" | "acos" => {
            check_args(name, args, 1)?;
            let num = get_number(&args[0], name)?;
            if !(-1.0..=1.0).contains(&num) {
                return Err(math_domain_error());
            }
            number_from_f64(if name == "asin" { num.asin() } else { num.acos() })
        }

        "atan2" => {
            check_args(name, args, 2)?;
            let y = get_number(&args[0], name)?;
            let x = get_number(&args[1], name)?;
            number_from_f64(y.atan2(x))
        }

        "min" | "max" => {
            let items = candidates(name, args)?;
            let best = items
                .into_iter()
                .filter(|v| !v.is_null())
                .reduce(|best, v| {
                    let ord = compare_values(v, best);
                    let better = if name == "min" { ord.is_lt() } else { ord.is_gt() };
                    if better {
                        v
                    } else {
                        best
                    }
                });
            best.cloned().unwrap_or(Value::Null)
        }

        "sum" => {
            check_args(name, args, 1)?;
            let items = get_array(&args[0], name)?;
            let mut total = Value::from(0);
            for item in items.iter().filter(|v| !v.is_null()) {
                total = evaluate_binary_op(&total, &BinaryOperator::Add, item)?;
            }
            total
        }

        _ => return Ok(None),
    };

    Ok(Some(result))
}

/// `min(list)` or `min(a, b, ...)`.
fn candidates<'a>(name: &str, args: &'a [Value]) -> RowqlResult<Vec<&'a Value>> {
    match args {
        [] => Err(RowqlError::EvalError(format!(
            "{}() expected at least 1 argument",
            name
        ))),
        [single] => Ok(get_array(single, name)?.iter().collect()),
        many => Ok(many.iter().collect()),
    }
}

fn round_half_even(x: f64) -> f64 {
    let rounded = x.round();
    if (x - x.trunc()).abs() == 0.5 && rounded % 2.0 != 0.0 {
        rounded - x.signum()
    } else {
        rounded
    }
}

fn float_to_int(f: f64) -> Value {
    if f.is_finite() && f.abs() < i64::MAX as f64 {
        Value::from(f as i64)
    } else {
        number_from_f64(f)
    }
}

fn positive(num: f64) -> RowqlResult<f64> {
    if num <= 0.0 {
        return Err(math_domain_error());
    }
    Ok(num)
}

fn math_domain_error() -> RowqlError {
    RowqlError::EvalError("math domain error".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn m(name: &str, args: &[Value]) -> Value {
        call(name, args).unwrap().unwrap()
    }

    #[test]
    fn test_rounding_returns_integers() {
        assert_eq!(m("floor", &[json!(3.7)]), json!(3));
        assert_eq!(m("ceil", &[json!(3.2)]), json!(4));
        assert_eq!(m("round", &[json!(2.5)]), json!(2));
        assert_eq!(m("round", &[json!(3.5)]), json!(4));
        assert_eq!(m("round", &[json!(3.14159), json!(2)]), json!(3.14));
        assert_eq!(m("abs", &[json!(-5)]), json!(5));
    }

    #[test]
    fn test_domain_errors() {
        assert!(call("sqrt", &[json!(-1)]).is_err());
        assert!(call("log", &[json!(0)]).is_err());
        assert_eq!(m("log", &[json!(8), json!(2)]), json!(3.0));
    }

    #[test]
    fn test_min_max_sum() {
        assert_eq!(m("min", &[json!([3, 1, 2])]), json!(1));
        assert_eq!(m("max", &[json!(3), json!(7), json!(2)]), json!(7));
        assert_eq!(m("max", &[json!([null, 2])]), json!(2));
        assert_eq!(m("sum", &[json!([1, 2, 3.5])]), json!(6.5));
        assert_eq!(m("sum", &[json!([])]), json!(0));
    }

    #[test]
    fn test_constants() {
        assert_eq!(constants()["tau"], json!(std::f64::consts::TAU));
    }
}
