//! The `re` module.
//!
//! Match functions return the matched text (or NULL), so they can be used
//! directly in WHERE clauses and projections.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use super::{check_arg_range, check_args, get_int, get_str};
use crate::error::RowqlResult;
use crate::executor::helpers::safe_regex;

static BACKREF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(\d+)|\\g<(\w+)>|\$").expect("valid regex"));

/// Call a regex function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> RowqlResult<Option<Value>> {
    let result = match name {
        "match" | "fullmatch" => {
            check_args(name, args, 2)?;
            let pattern = get_str(&args[0], name)?;
            let text = get_str(&args[1], name)?;
            let anchored = if name == "match" {
                format!("^(?:{})", pattern)
            } else {
                format!("^(?:{})$", pattern)
            };
            match safe_regex(&anchored)?.find(text) {
                Some(m) => Value::String(m.as_str().to_string()),
                None => Value::Null,
            }
        }

        "search" => {
            check_args(name, args, 2)?;
            let re = safe_regex(get_str(&args[0], name)?)?;
            match re.find(get_str(&args[1], name)?) {
                Some(m) => Value::String(m.as_str().to_string()),
                None => Value::Null,
            }
        }

        "sub" => {
            check_arg_range(name, args, 3, 4)?;
            let re = safe_regex(get_str(&args[0], name)?)?;
            let replacement = convert_replacement(get_str(&args[1], name)?);
            let text = get_str(&args[2], name)?;
            let limit = match args.get(3) {
                Some(c) => get_int(c, name)?.max(0) as usize,
                None => 0,
            };
            Value::String(re.replacen(text, limit, replacement.as_str()).into_owned())
        }

        "findall" => {
            check_args(name, args, 2)?;
            let re = safe_regex(get_str(&args[0], name)?)?;
            let text = get_str(&args[1], name)?;
            let groups = re.captures_len() - 1;
            let found = re
                .captures_iter(text)
                .map(|caps| match groups {
                    0 => group_text(&caps, 0),
                    1 => group_text(&caps, 1),
                    n => Value::Array((1..=n).map(|i| group_text(&caps, i)).collect()),
                })
                .collect();
            Value::Array(found)
        }

        "split" => {
            check_args(name, args, 2)?;
            let re = safe_regex(get_str(&args[0], name)?)?;
            let parts = re
                .split(get_str(&args[1], name)?)
                .map(|p| Value::String(p.to_string()))
                .collect();
            Value::Array(parts)
        }

        _ => return Ok(None),
    };

    Ok(Some(result))
}

fn group_text(caps: &Captures<'_>, i: usize) -> Value {
    Value::String(caps.get(i).map(|m| m.as_str()).unwrap_or("").to_string())
}

/// Rewrite `\1` / `\g<name>` backreferences into the `${1}` syntax of the
/// regex crate, escaping literal dollars.
fn convert_replacement(replacement: &str) -> String {
    BACKREF_RE
        .replace_all(replacement, |caps: &Captures<'_>| {
            if let Some(n) = caps.get(1).or_else(|| caps.get(2)) {
                format!("${{{}}}", n.as_str())
            } else {
                "$$".to_string()
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn re(name: &str, args: &[Value]) -> Value {
        call(name, args).unwrap().unwrap()
    }

    #[test]
    fn test_match_and_search() {
        assert_eq!(re("match", &[json!(r"\d+"), json!("123abc")]), json!("123"));
        assert_eq!(re("match", &[json!(r"\d+"), json!("abc123")]), json!(null));
        assert_eq!(re("search", &[json!(r"\d+"), json!("abc123")]), json!("123"));
        assert_eq!(re("fullmatch", &[json!(r"\d+"), json!("123a")]), json!(null));
    }

    #[test]
    fn test_sub_with_backreferences() {
        assert_eq!(
            re("sub", &[json!(r"(\w+)@(\w+)"), json!(r"\2 at \1"), json!("me@home")]),
            json!("home at me")
        );
        assert_eq!(
            re("sub", &[json!("a"), json!("$"), json!("banana"), json!(1)]),
            json!("b$nana")
        );
    }

    #[test]
    fn test_findall_and_split() {
        assert_eq!(re("findall", &[json!(r"\d"), json!("a1b2")]), json!(["1", "2"]));
        assert_eq!(
            re("findall", &[json!(r"(\w)=(\d)"), json!("a=1,b=2")]),
            json!([["a", "1"], ["b", "2"]])
        );
        assert_eq!(re("split", &[json!(r"\s*,\s*"), json!("a , b,c")]), json!(["a", "b", "c"]));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(call("search", &[json!("("), json!("x")]).is_err());
    }
}
