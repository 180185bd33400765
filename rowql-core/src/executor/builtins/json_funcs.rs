//! The `json` module.

use serde_json::Value;

use super::{check_arg_range, check_args, get_str};
use crate::error::{RowqlError, RowqlResult};

/// Call a JSON function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> RowqlResult<Option<Value>> {
    let result = match name {
        "dumps" => {
            check_arg_range(name, args, 1, 2)?;
            let pretty = args.get(1).map(|v| !v.is_null()).unwrap_or(false);
            let text = if pretty {
                serde_json::to_string_pretty(&args[0])?
            } else {
                serde_json::to_string(&args[0])?
            };
            Value::String(text)
        }

        "loads" => {
            check_args(name, args, 1)?;
            let text = get_str(&args[0], name)?;
            serde_json::from_str(text)
                .map_err(|e| RowqlError::EvalError(format!("invalid JSON document: {}", e)))?
        }

        _ => return Ok(None),
    };

    Ok(Some(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dumps() {
        assert_eq!(
            call("dumps", &[json!({"a": [1, null]})]).unwrap(),
            Some(json!("{\"a\":[1,null]}"))
        );
    }

    #[test]
    fn test_loads() {
        assert_eq!(
            call("loads", &[json!("{\"b\": 2}")]).unwrap(),
            Some(json!({"b": 2}))
        );
        assert!(call("loads", &[json!("{oops")]).is_err());
    }
}
