//! The `datetime` module.
//!
//! Date-times travel as ISO-8601 strings (`2024-05-01T10:30:00`); epoch
//! numbers are accepted wherever a date-time is expected.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use super::{check_args, get_number, get_str};
use crate::error::{RowqlError, RowqlResult};

const ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Call a datetime function. Returns None if function not found.
pub fn call(name: &str, args: &[Value]) -> RowqlResult<Option<Value>> {
    let result = match name {
        "now" | "utcnow" => {
            check_args(name, args, 0)?;
            Value::String(Utc::now().naive_utc().format(ISO_FORMAT).to_string())
        }

        "fromtimestamp" => {
            check_args(name, args, 1)?;
            let secs = get_number(&args[0], name)?;
            let dt = DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
                .ok_or_else(|| RowqlError::EvalError(format!("timestamp out of range: {}", secs)))?;
            Value::String(dt.naive_utc().format(ISO_FORMAT).to_string())
        }

        "timestamp" => {
            check_args(name, args, 1)?;
            let dt = parse_datetime(&args[0])?;
            serde_json::Number::from_f64(dt.and_utc().timestamp_millis() as f64 / 1000.0)
                .map(Value::Number)
                .unwrap_or(Value::Null)
        }

        "strftime" => {
            check_args(name, args, 2)?;
            let dt = parse_datetime(&args[0])?;
            let fmt = get_str(&args[1], name)?;
            let mut out = String::new();
            write!(out, "{}", dt.format(fmt))
                .map_err(|_| RowqlError::EvalError(format!("invalid format string: {}", fmt)))?;
            Value::String(out)
        }

        "strptime" => {
            check_args(name, args, 2)?;
            let text = get_str(&args[0], name)?;
            let fmt = get_str(&args[1], name)?;
            let dt = NaiveDateTime::parse_from_str(text, fmt)
                .or_else(|_| {
                    NaiveDate::parse_from_str(text, fmt)
                        .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
                })
                .map_err(|e| {
                    RowqlError::EvalError(format!(
                        "time data '{}' does not match format '{}': {}",
                        text, fmt, e
                    ))
                })?;
            Value::String(dt.format(ISO_FORMAT).to_string())
        }

        "date" => {
            check_args(name, args, 1)?;
            Value::String(parse_datetime(&args[0])?.date().format("%Y-%m-%d").to_string())
        }

        _ => return Ok(None),
    };

    Ok(Some(result))
}

fn parse_datetime(v: &Value) -> RowqlResult<NaiveDateTime> {
    match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.naive_utc())
            .or_else(|_| NaiveDateTime::parse_from_str(s, ISO_FORMAT))
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
            .or_else(|_| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
            })
            .map_err(|_| RowqlError::EvalError(format!("Cannot parse date string: {}", s))),
        Value::Number(n) => {
            let secs = n
                .as_f64()
                .ok_or_else(|| RowqlError::EvalError("Invalid timestamp number".to_string()))?;
            DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
                .map(|dt| dt.naive_utc())
                .ok_or_else(|| RowqlError::EvalError("Invalid timestamp".to_string()))
        }
        other => Err(RowqlError::TypeError(format!(
            "expected a date-time string or timestamp, not '{}'",
            crate::executor::helpers::type_name(other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dt(name: &str, args: &[Value]) -> Value {
        call(name, args).unwrap().unwrap()
    }

    #[test]
    fn test_fromtimestamp() {
        assert_eq!(dt("fromtimestamp", &[json!(0)]), json!("1970-01-01T00:00:00"));
        assert_eq!(dt("timestamp", &[json!("1970-01-01T00:01:00")]), json!(60.0));
    }

    #[test]
    fn test_strftime_strptime() {
        assert_eq!(
            dt("strftime", &[json!("2024-05-01T10:30:00"), json!("%d/%m/%Y")]),
            json!("01/05/2024")
        );
        assert_eq!(
            dt("strptime", &[json!("01/05/2024"), json!("%d/%m/%Y")]),
            json!("2024-05-01T00:00:00")
        );
        assert!(call("strptime", &[json!("nope"), json!("%Y")]).is_err());
    }

    #[test]
    fn test_date() {
        assert_eq!(dt("date", &[json!("2024-05-01 10:30:00")]), json!("2024-05-01"));
    }
}
