//! List and object builtin functions.

use serde_json::Value;

use super::{check_arg_range, check_args, get_array, get_int};
use crate::error::{RowqlError, RowqlResult};
use crate::executor::helpers::{
    compare_values, contains, get_item, to_bool, tuple_key, type_name, values_equal, MAX_SEQUENCE_LEN,
};

pub(super) const FUNCTIONS: &[&str] = &[
    "len", "range", "list", "sorted", "reversed", "keys", "values", "items", "get", "count",
    "contains", "unique", "zip", "enumerate", "flatten", "index",
];


/// Call a collection function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> RowqlResult<Option<Value>> {
    let result = match name {
        "len" => {
            check_args(name, args, 1)?;
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(arr) => arr.len(),
                Value::Object(obj) => obj.len(),
                other => {
                    return Err(RowqlError::TypeError(format!(
                        "object of type '{}' has no len()",
                        type_name(other)
                    )))
                }
            };
            Value::from(len as i64)
        }

        "range" => {
            check_arg_range(name, args, 1, 3)?;
            let (start, stop) = match args.len() {
                1 => (0, get_int(&args[0], name)?),
                _ => (get_int(&args[0], name)?, get_int(&args[1], name)?),
            };
            let step = match args.get(2) {
                Some(s) => get_int(s, name)?,
                None => 1,
            };
            if step == 0 {
                return Err(RowqlError::EvalError(
                    "range() arg 3 must not be zero".to_string(),
                ));
            }
            let (start, stop, step) = (i128::from(start), i128::from(stop), i128::from(step));
            let span = if step > 0 { stop - start } else { start - stop };
            let count = if span <= 0 { 0 } else { (span - 1) / step.abs() + 1 };
            if count > MAX_SEQUENCE_LEN as i128 {
                return Err(RowqlError::EvalError(format!(
                    "range() too large ({} elements)",
                    count
                )));
            }
            Value::Array(
                (0..count)
                    .map(|i| Value::from((start + i * step) as i64))
                    .collect(),
            )
        }

        "list" => {
            check_args(name, args, 1)?;
            Value::Array(iterate(&args[0], name)?)
        }

        "sorted" => {
            check_arg_range(name, args, 1, 2)?;
            let mut items = iterate(&args[0], name)?;
            items.sort_by(compare_values);
            if args.get(1).map(to_bool).unwrap_or(false) {
                items.reverse();
            }
            Value::Array(items)
        }

        "reversed" => {
            check_args(name, args, 1)?;
            match &args[0] {
                Value::String(s) => Value::String(s.chars().rev().collect()),
                other => {
                    let mut items = iterate(other, name)?;
                    items.reverse();
                    Value::Array(items)
                }
            }
        }

        "keys" | "values" | "items" => {
            check_args(name, args, 1)?;
            let obj = args[0].as_object().ok_or_else(|| {
                RowqlError::TypeError(format!(
                    "{}() argument must be a dict, not '{}'",
                    name,
                    type_name(&args[0])
                ))
            })?;
            Value::Array(match name {
                "keys" => obj.keys().map(|k| Value::String(k.clone())).collect(),
                "values" => obj.values().cloned().collect(),
                _ => obj
                    .iter()
                    .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
                    .collect(),
            })
        }

        "get" => {
            check_arg_range(name, args, 2, 3)?;
            let default = args.get(2).cloned().unwrap_or(Value::Null);
            match get_item(&args[0], &args[1])? {
                Value::Null => default,
                found => found,
            }
        }

        "count" => {
            check_args(name, args, 2)?;
            let n = match &args[0] {
                Value::String(s) => match args[1].as_str() {
                    Some("") => s.chars().count() + 1,
                    Some(sub) => s.matches(sub).count(),
                    None => 0,
                },
                other => get_array(other, name)?
                    .iter()
                    .filter(|v| values_equal(v, &args[1]))
                    .count(),
            };
            Value::from(n as i64)
        }

        "contains" => {
            check_args(name, args, 2)?;
            Value::Bool(contains(&args[0], &args[1])?)
        }

        "unique" => {
            check_args(name, args, 1)?;
            let mut seen = std::collections::HashSet::new();
            let items = get_array(&args[0], name)?
                .iter()
                .filter(|v| seen.insert(tuple_key(std::slice::from_ref(*v))))
                .cloned()
                .collect();
            Value::Array(items)
        }

        "zip" => {
            let lists = args
                .iter()
                .map(|a| get_array(a, name))
                .collect::<RowqlResult<Vec<_>>>()?;
            let len = lists.iter().map(|l| l.len()).min().unwrap_or(0);
            Value::Array(
                (0..len)
                    .map(|i| Value::Array(lists.iter().map(|l| l[i].clone()).collect()))
                    .collect(),
            )
        }

        "enumerate" => {
            check_arg_range(name, args, 1, 2)?;
            let start = match args.get(1) {
                Some(s) => get_int(s, name)?,
                None => 0,
            };
            let items = iterate(&args[0], name)?;
            Value::Array(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| Value::Array(vec![Value::from(start + i as i64), v]))
                    .collect(),
            )
        }

        "flatten" => {
            check_args(name, args, 1)?;
            let mut out = Vec::new();
            for item in get_array(&args[0], name)? {
                match item {
                    Value::Array(inner) => out.extend(inner.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Value::Array(out)
        }

        "index" => {
            check_args(name, args, 2)?;
            get_array(&args[0], name)?
                .iter()
                .position(|v| values_equal(v, &args[1]))
                .map(|p| Value::from(p as i64))
                .unwrap_or(Value::Null)
        }

        _ => return Ok(None),
    };

    Ok(Some(result))
}

/// Elements of an iterable value: list items, string characters, object keys.
fn iterate(value: &Value, func_name: &str) -> RowqlResult<Vec<Value>> {
    match value {
        Value::Array(arr) => Ok(arr.clone()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        Value::Object(obj) => Ok(obj.keys().map(|k| Value::String(k.clone())).collect()),
        other => Err(RowqlError::TypeError(format!(
            "{}() argument must be iterable, not '{}'",
            func_name,
            type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn c(name: &str, args: &[Value]) -> Value {
        call(name, args).unwrap().unwrap()
    }

    #[test]
    fn test_range() {
        assert_eq!(c("range", &[json!(3)]), json!([0, 1, 2]));
        assert_eq!(c("range", &[json!(1), json!(7), json!(3)]), json!([1, 4]));
        assert_eq!(c("range", &[json!(3), json!(0), json!(-1)]), json!([3, 2, 1]));
        assert_eq!(c("range", &[json!(5), json!(2)]), json!([]));
        assert!(call("range", &[json!(1), json!(2), json!(0)]).is_err());
        assert!(call("range", &[json!(i64::MIN + 1), json!(i64::MAX)]).is_err());
        assert!(call("range", &[json!(i64::MAX), json!(i64::MIN), json!(-1)]).is_err());
        assert_eq!(
            c("range", &[json!(i64::MAX - 2), json!(i64::MAX), json!(1)]),
            json!([i64::MAX - 2, i64::MAX - 1])
        );
    }

    #[test]
    fn test_len() {
        assert_eq!(c("len", &[json!([1, 2])]), json!(2));
        assert_eq!(c("len", &[json!({"a": 1})]), json!(1));
        assert!(call("len", &[json!(5)]).is_err());
    }

    #[test]
    fn test_object_functions() {
        let obj = json!({"a": 1, "b": 2});
        assert_eq!(c("keys", &[obj.clone()]), json!(["a", "b"]));
        assert_eq!(c("items", &[obj.clone()]), json!([["a", 1], ["b", 2]]));
        assert_eq!(c("get", &[obj.clone(), json!("z"), json!(0)]), json!(0));
        assert_eq!(c("get", &[json!(null), json!("a")]), json!(null));
    }

    #[test]
    fn test_list_functions() {
        assert_eq!(c("sorted", &[json!([3, 1, 2])]), json!([1, 2, 3]));
        assert_eq!(c("sorted", &[json!([3, 1, 2]), json!(true)]), json!([3, 2, 1]));
        assert_eq!(c("unique", &[json!([1, 2, 1, null, null])]), json!([1, 2, null]));
        assert_eq!(c("zip", &[json!([1, 2]), json!(["a"])]), json!([[1, "a"]]));
        assert_eq!(c("flatten", &[json!([[1], 2, [3, 4]])]), json!([1, 2, 3, 4]));
        assert_eq!(c("enumerate", &[json!(["x"])]), json!([[0, "x"]]));
        assert_eq!(c("index", &[json!([5, 6]), json!(6)]), json!(1));
        assert_eq!(c("count", &[json!([1, 1, 2]), json!(1)]), json!(2));
        assert_eq!(c("reversed", &[json!("abc")]), json!("cba"));
    }
}
