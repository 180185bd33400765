//! String builtin functions.

use serde_json::Value;

use super::{check_arg_range, check_args, get_array, get_int, get_str};
use crate::error::{RowqlError, RowqlResult};
use crate::executor::helpers::display_value;

pub(super) const FUNCTIONS: &[&str] = &[
    "upper", "lower", "strip", "lstrip", "rstrip", "replace", "split", "join", "startswith",
    "endswith", "find", "title", "capitalize", "substr", "format",
];

/// Call a string function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> RowqlResult<Option<Value>> {
    let result = match name {
        "upper" => {
            check_args(name, args, 1)?;
            Value::String(get_str(&args[0], name)?.to_uppercase())
        }

        "lower" => {
            check_args(name, args, 1)?;
            Value::String(get_str(&args[0], name)?.to_lowercase())
        }

        "strip" | "lstrip" | "rstrip" => {
            check_arg_range(name, args, 1, 2)?;
            let s = get_str(&args[0], name)?;
            let chars: Option<Vec<char>> = match args.get(1) {
                Some(v) => Some(get_str(v, name)?.chars().collect()),
                None => None,
            };
            let matches = |c: char| match &chars {
                Some(set) => set.contains(&c),
                None => c.is_whitespace(),
            };
            let stripped = match name {
                "strip" => s.trim_matches(matches),
                "lstrip" => s.trim_start_matches(matches),
                _ => s.trim_end_matches(matches),
            };
            Value::String(stripped.to_string())
        }

        "replace" => {
            check_args(name, args, 3)?;
            let s = get_str(&args[0], name)?;
            let from = get_str(&args[1], name)?;
            let to = get_str(&args[2], name)?;
            Value::String(s.replace(from, to))
        }

        "split" => {
            check_arg_range(name, args, 1, 2)?;
            let s = get_str(&args[0], name)?;
            let parts: Vec<Value> = match args.get(1) {
                Some(sep) => {
                    let sep = get_str(sep, name)?;
                    if sep.is_empty() {
                        return Err(RowqlError::EvalError("empty separator".to_string()));
                    }
                    s.split(sep).map(|p| Value::String(p.to_string())).collect()
                }
                None => s
                    .split_whitespace()
                    .map(|p| Value::String(p.to_string()))
                    .collect(),
            };
            Value::Array(parts)
        }

        "join" => {
            // `','.join(items)` arrives as join(',', items)
            check_args(name, args, 2)?;
            let sep = get_str(&args[0], name)?;
            let items = get_array(&args[1], name)?;
            let parts: Vec<String> = items.iter().map(display_value).collect();
            Value::String(parts.join(sep))
        }

        "startswith" => {
            check_args(name, args, 2)?;
            Value::Bool(get_str(&args[0], name)?.starts_with(get_str(&args[1], name)?))
        }

        "endswith" => {
            check_args(name, args, 2)?;
            Value::Bool(get_str(&args[0], name)?.ends_with(get_str(&args[1], name)?))
        }

        "find" => {
            check_args(name, args, 2)?;
            let s = get_str(&args[0], name)?;
            let needle = get_str(&args[1], name)?;
            match s.find(needle) {
                Some(byte_pos) => Value::from(s[..byte_pos].chars().count() as i64),
                None => Value::from(-1),
            }
        }

        "title" => {
            check_args(name, args, 1)?;
            let s = get_str(&args[0], name)?;
            let mut out = String::with_capacity(s.len());
            let mut at_word_start = true;
            for c in s.chars() {
                if c.is_alphabetic() {
                    if at_word_start {
                        out.extend(c.to_uppercase());
                    } else {
                        out.extend(c.to_lowercase());
                    }
                    at_word_start = false;
                } else {
                    out.push(c);
                    at_word_start = true;
                }
            }
            Value::String(out)
        }

        "capitalize" => {
            check_args(name, args, 1)?;
            let s = get_str(&args[0], name)?;
            let mut chars = s.chars();
            let out = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
                None => String::new(),
            };
            Value::String(out)
        }

        "substr" => {
            check_arg_range(name, args, 2, 3)?;
            let chars: Vec<char> = get_str(&args[0], name)?.chars().collect();
            let start = get_int(&args[1], name)?.max(0) as usize;
            if start >= chars.len() {
                return Ok(Some(Value::String(String::new())));
            }
            let result: String = match args.get(2) {
                Some(len) => chars[start..]
                    .iter()
                    .take(get_int(len, name)?.max(0) as usize)
                    .collect(),
                None => chars[start..].iter().collect(),
            };
            Value::String(result)
        }

        "format" => {
            if args.is_empty() {
                return Err(RowqlError::EvalError(
                    "format() requires a template argument".to_string(),
                ));
            }
            if args[0].is_null() {
                return Ok(Some(Value::Null));
            }
            Value::String(format_template(get_str(&args[0], name)?, &args[1..])?)
        }

        _ => return Ok(None),
    };

    Ok(Some(result))
}

/// Replace `{}` (sequential) and `{n}` (positional) fields; `{{`/`}}` escape braces.
fn format_template(template: &str, values: &[Value]) -> RowqlResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut next_auto = 0;

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut field = String::new();
                for f in chars.by_ref() {
                    if f == '}' {
                        break;
                    }
                    field.push(f);
                }
                let index = if field.trim().is_empty() {
                    next_auto += 1;
                    next_auto - 1
                } else {
                    field.trim().parse::<usize>().map_err(|_| {
                        RowqlError::EvalError(format!("invalid format field '{{{}}}'", field))
                    })?
                };
                let value = values.get(index).ok_or_else(|| {
                    RowqlError::EvalError(format!(
                        "format field {} out of range for {} argument(s)",
                        index,
                        values.len()
                    ))
                })?;
                out.push_str(&display_value(value));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn s(name: &str, args: &[Value]) -> Value {
        call(name, args).unwrap().unwrap()
    }

    #[test]
    fn test_case_functions() {
        assert_eq!(s("title", &[json!("hello wORLD")]), json!("Hello World"));
        assert_eq!(s("capitalize", &[json!("hELLO")]), json!("Hello"));
    }

    #[test]
    fn test_strip() {
        assert_eq!(s("strip", &[json!("  a b ")]), json!("a b"));
        assert_eq!(s("lstrip", &[json!("xxaxx"), json!("x")]), json!("axx"));
        assert_eq!(s("rstrip", &[json!("xxaxx"), json!("x")]), json!("xxa"));
    }

    #[test]
    fn test_split_join() {
        assert_eq!(s("split", &[json!("a,b,c"), json!(",")]), json!(["a", "b", "c"]));
        assert_eq!(s("split", &[json!(" a  b ")]), json!(["a", "b"]));
        assert_eq!(s("join", &[json!("-"), json!(["a", 1, null])]), json!("a-1-"));
    }

    #[test]
    fn test_find_substr() {
        assert_eq!(s("find", &[json!("héllo"), json!("l")]), json!(2));
        assert_eq!(s("find", &[json!("abc"), json!("z")]), json!(-1));
        assert_eq!(s("substr", &[json!("abcdef"), json!(2), json!(3)]), json!("cde"));
    }

    #[test]
    fn test_format() {
        assert_eq!(
            s("format", &[json!("{} + {} = {2}"), json!(1), json!(2), json!(3)]),
            json!("1 + 2 = 3")
        );
        assert_eq!(s("format", &[json!("{{x}}")]), json!("{x}"));
        assert!(call("format", &[json!("{5}"), json!(1)]).is_err());
    }

    #[test]
    fn test_wrong_type() {
        assert!(call("upper", &[json!(1)]).is_err());
    }
}
