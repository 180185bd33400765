//! Core evaluation helper functions.
//!
//! This module contains helper functions for expression evaluation:
//! - values_equal: Compare two JSON values for equality
//! - compare_values: Total ordering used by sorting and min/max
//! - evaluate_binary_op: Evaluate binary operators with NULL propagation
//! - evaluate_unary_op: Evaluate unary operators
//! - get_item / slice_value: Item access that never fails on missing keys
//! - to_bool: Convert JSON value to boolean

use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Number, Value};

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::error::{RowqlError, RowqlResult};

/// Short type name used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NULL",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Integer view of a value; booleans count as 0/1.
#[inline]
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Float view of a value; booleans count as 0/1.
#[inline]
pub fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn is_int(value: &Value) -> bool {
    matches!(value, Value::Bool(_)) || matches!(value, Value::Number(n) if n.is_i64())
}

/// Create a JSON number from an f64; NaN and infinities become NULL.
#[inline]
pub fn number_from_f64(n: f64) -> Value {
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

/// Compare two JSON values for equality.
///
/// Numbers are compared numerically, so `1 == 1.0`.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => a.as_f64() == b.as_f64(),
        },
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).map(|w| values_equal(v, w)).unwrap_or(false))
        }
        _ => left == right,
    }
}

/// Convert JSON value to boolean (NULL is false).
#[inline]
pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(arr) => !arr.is_empty(),
        Value::Object(obj) => !obj.is_empty(),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Total ordering over values: numbers numerically, strings
/// lexicographically, arrays element-wise, mixed types by type rank.
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = a.as_f64().unwrap_or(0.0);
                let y = b.as_f64().unwrap_or(0.0);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ord = compare_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            a.len().cmp(&b.len())
        }
        (Value::Object(a), Value::Object(b)) => a.len().cmp(&b.len()),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

/// Ordering for the comparison operators: values of different kinds cannot
/// be compared (except numbers with booleans).
fn ordered_compare(left: &Value, right: &Value, op: &BinaryOperator) -> RowqlResult<Ordering> {
    let comparable = matches!(
        (left, right),
        (Value::Number(_) | Value::Bool(_), Value::Number(_) | Value::Bool(_))
            | (Value::String(_), Value::String(_))
            | (Value::Array(_), Value::Array(_))
    );
    if !comparable {
        return Err(RowqlError::TypeError(format!(
            "'{}' not supported between instances of '{}' and '{}'",
            op.symbol(),
            type_name(left),
            type_name(right)
        )));
    }
    if let (Some(a), Some(b)) = (as_float(left), as_float(right)) {
        if !is_int(left) || !is_int(right) {
            return Ok(a.partial_cmp(&b).unwrap_or(Ordering::Equal));
        }
    }
    match (as_integer(left), as_integer(right)) {
        (Some(a), Some(b)) if is_int(left) && is_int(right) => Ok(a.cmp(&b)),
        _ => Ok(compare_values(left, right)),
    }
}

fn unsupported(op: &BinaryOperator, left: &Value, right: &Value) -> RowqlError {
    RowqlError::TypeError(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        type_name(left),
        type_name(right)
    ))
}

/// Membership test; `x in NULL` is false.
pub fn contains(container: &Value, item: &Value) -> RowqlResult<bool> {
    match container {
        Value::Null => Ok(false),
        Value::Array(arr) => Ok(arr.iter().any(|v| values_equal(item, v))),
        Value::Object(obj) => Ok(item.as_str().map(|k| obj.contains_key(k)).unwrap_or(false)),
        Value::String(s) => match item {
            Value::String(sub) => Ok(s.contains(sub.as_str())),
            Value::Null => Ok(false),
            other => Err(RowqlError::TypeError(format!(
                "'in <string>' requires string as left operand, not {}",
                type_name(other)
            ))),
        },
        other => Err(RowqlError::TypeError(format!(
            "argument of type '{}' is not iterable",
            type_name(other)
        ))),
    }
}

/// Compile a user-supplied regex with a pattern length limit.
pub fn safe_regex(pattern: &str) -> RowqlResult<Regex> {
    if pattern.len() > 1000 {
        return Err(RowqlError::EvalError(
            "Pattern too long (max 1000 chars)".to_string(),
        ));
    }
    Regex::new(pattern).map_err(|e| RowqlError::EvalError(format!("invalid regex: {}", e)))
}

/// Translate a SQL LIKE pattern into an anchored regex.
pub fn like_to_regex(pattern: &str) -> RowqlResult<Regex> {
    let mut regex_pattern = String::from("(?s)^");
    for c in pattern.chars() {
        match c {
            '%' => regex_pattern.push_str(".*"),
            '_' => regex_pattern.push('.'),
            other => regex_pattern.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex_pattern.push('$');
    safe_regex(&regex_pattern)
}

fn int_or_float(result: Option<i64>, fallback: f64) -> Value {
    match result {
        Some(n) => Value::from(n),
        None => number_from_f64(fallback),
    }
}

fn arithmetic(left: &Value, op: &BinaryOperator, right: &Value) -> RowqlResult<Value> {
    if is_int(left) && is_int(right) {
        let (a, b) = (as_integer(left).unwrap_or(0), as_integer(right).unwrap_or(0));
        return match op {
            BinaryOperator::Add => Ok(int_or_float(a.checked_add(b), a as f64 + b as f64)),
            BinaryOperator::Subtract => Ok(int_or_float(a.checked_sub(b), a as f64 - b as f64)),
            BinaryOperator::Multiply => Ok(int_or_float(a.checked_mul(b), a as f64 * b as f64)),
            BinaryOperator::Divide => {
                if b == 0 {
                    return Err(RowqlError::EvalError("division by zero".to_string()));
                }
                Ok(number_from_f64(a as f64 / b as f64))
            }
            BinaryOperator::FloorDivide => {
                if b == 0 {
                    return Err(RowqlError::EvalError("integer division by zero".to_string()));
                }
                // i64::MIN // -1 does not fit in an i64
                match (a.checked_div(b), a.checked_rem(b)) {
                    (Some(q), Some(r)) if r != 0 && ((a < 0) != (b < 0)) => Ok(Value::from(q - 1)),
                    (Some(q), Some(_)) => Ok(Value::from(q)),
                    _ => Ok(number_from_f64((a as f64 / b as f64).floor())),
                }
            }
            BinaryOperator::Modulus => {
                if b == 0 {
                    return Err(RowqlError::EvalError("integer modulo by zero".to_string()));
                }
                let mut r = a.wrapping_rem(b);
                if r != 0 && ((r < 0) != (b < 0)) {
                    r += b;
                }
                Ok(Value::from(r))
            }
            BinaryOperator::Exponent => {
                if b >= 0 {
                    let checked = u32::try_from(b).ok().and_then(|e| a.checked_pow(e));
                    Ok(int_or_float(checked, (a as f64).powf(b as f64)))
                } else {
                    Ok(number_from_f64((a as f64).powf(b as f64)))
                }
            }
            _ => Err(unsupported(op, left, right)),
        };
    }

    let (a, b) = match (as_float(left), as_float(right)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(unsupported(op, left, right)),
    };
    match op {
        BinaryOperator::Add => Ok(number_from_f64(a + b)),
        BinaryOperator::Subtract => Ok(number_from_f64(a - b)),
        BinaryOperator::Multiply => Ok(number_from_f64(a * b)),
        BinaryOperator::Divide | BinaryOperator::FloorDivide | BinaryOperator::Modulus
            if b == 0.0 =>
        {
            Err(RowqlError::EvalError("float division by zero".to_string()))
        }
        BinaryOperator::Divide => Ok(number_from_f64(a / b)),
        BinaryOperator::FloorDivide => Ok(number_from_f64((a / b).floor())),
        BinaryOperator::Modulus => Ok(number_from_f64(a - b * (a / b).floor())),
        BinaryOperator::Exponent => Ok(number_from_f64(a.powf(b))),
        _ => Err(unsupported(op, left, right)),
    }
}

/// Largest string (in bytes) or list built by `*` repetition or `range()`.
pub const MAX_SEQUENCE_LEN: usize = 10_000_000;

fn repeat(value: &Value, times: i64) -> RowqlResult<Value> {
    let times = usize::try_from(times.max(0)).unwrap_or(usize::MAX);
    let check = |unit: usize| match unit.checked_mul(times) {
        Some(total) if total <= MAX_SEQUENCE_LEN => Ok(()),
        _ => Err(RowqlError::EvalError(format!(
            "repeated {} too large ({} x {})",
            type_name(value),
            unit,
            times
        ))),
    };
    match value {
        Value::String(s) => {
            check(s.len())?;
            Ok(Value::String(s.repeat(times)))
        }
        Value::Array(arr) => {
            check(arr.len())?;
            let total = arr.len() * times;
            Ok(Value::Array(arr.iter().cloned().cycle().take(total).collect()))
        }
        other => Err(RowqlError::TypeError(format!(
            "can't multiply sequence of type '{}'",
            type_name(other)
        ))),
    }
}

/// Evaluate a binary operation on two already evaluated values.
///
/// Logical and null-coalescing operators are short-circuited by the
/// interpreter and never reach this function.
pub fn evaluate_binary_op(left: &Value, op: &BinaryOperator, right: &Value) -> RowqlResult<Value> {
    match op {
        BinaryOperator::In => return contains(right, left).map(Value::Bool),
        BinaryOperator::NotIn => return contains(right, left).map(|b| Value::Bool(!b)),
        _ => {}
    }

    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    match op {
        BinaryOperator::Equal => Ok(Value::Bool(values_equal(left, right))),
        BinaryOperator::NotEqual => Ok(Value::Bool(!values_equal(left, right))),
        BinaryOperator::LessThan => Ok(Value::Bool(ordered_compare(left, right, op)? == Ordering::Less)),
        BinaryOperator::LessThanOrEqual => Ok(Value::Bool(
            ordered_compare(left, right, op)? != Ordering::Greater,
        )),
        BinaryOperator::GreaterThan => Ok(Value::Bool(
            ordered_compare(left, right, op)? == Ordering::Greater,
        )),
        BinaryOperator::GreaterThanOrEqual => {
            Ok(Value::Bool(ordered_compare(left, right, op)? != Ordering::Less))
        }

        BinaryOperator::Like | BinaryOperator::NotLike => {
            let (Some(s), Some(pattern)) = (left.as_str(), right.as_str()) else {
                return Err(unsupported(op, left, right));
            };
            let is_match = like_to_regex(pattern)?.is_match(s);
            Ok(Value::Bool(if matches!(op, BinaryOperator::NotLike) {
                !is_match
            } else {
                is_match
            }))
        }

        BinaryOperator::Add => match (left, right) {
            (Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
            (Value::Array(a), Value::Array(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().cloned());
                Ok(Value::Array(out))
            }
            (Value::Object(a), Value::Object(b)) => {
                let mut out = a.clone();
                out.extend(b.iter().map(|(k, v)| (k.clone(), v.clone())));
                Ok(Value::Object(out))
            }
            _ => arithmetic(left, op, right),
        },

        BinaryOperator::Multiply => match (left, right) {
            (Value::String(_) | Value::Array(_), n) if is_int(n) => {
                repeat(left, as_integer(n).unwrap_or(0))
            }
            (n, Value::String(_) | Value::Array(_)) if is_int(n) => {
                repeat(right, as_integer(n).unwrap_or(0))
            }
            _ => arithmetic(left, op, right),
        },

        BinaryOperator::Subtract
        | BinaryOperator::Divide
        | BinaryOperator::FloorDivide
        | BinaryOperator::Modulus
        | BinaryOperator::Exponent => arithmetic(left, op, right),

        BinaryOperator::BitwiseAnd
        | BinaryOperator::BitwiseOr
        | BinaryOperator::BitwiseXor
        | BinaryOperator::LeftShift
        | BinaryOperator::RightShift => {
            if !is_int(left) || !is_int(right) {
                return Err(unsupported(op, left, right));
            }
            let (a, b) = (as_integer(left).unwrap_or(0), as_integer(right).unwrap_or(0));
            let result = match op {
                BinaryOperator::BitwiseAnd => a & b,
                BinaryOperator::BitwiseOr => a | b,
                BinaryOperator::BitwiseXor => a ^ b,
                BinaryOperator::LeftShift => {
                    if !(0..64).contains(&b) {
                        return Err(RowqlError::EvalError("shift count out of range".to_string()));
                    }
                    a << b
                }
                _ => {
                    if !(0..64).contains(&b) {
                        return Err(RowqlError::EvalError("shift count out of range".to_string()));
                    }
                    a >> b
                }
            };
            Ok(Value::from(result))
        }

        BinaryOperator::And
        | BinaryOperator::Or
        | BinaryOperator::NullCoalesce
        | BinaryOperator::In
        | BinaryOperator::NotIn => Err(RowqlError::EvalError(format!(
            "operator {} is not evaluated here",
            op.symbol()
        ))),
    }
}

/// Evaluate a unary operation. NOT follows three-valued logic.
pub fn evaluate_unary_op(op: &UnaryOperator, value: &Value) -> RowqlResult<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match op {
        UnaryOperator::Not => Ok(Value::Bool(!to_bool(value))),
        UnaryOperator::Negate => match value {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(int_or_float(i.checked_neg(), -(i as f64))),
                None => Ok(number_from_f64(-n.as_f64().unwrap_or(0.0))),
            },
            Value::Bool(b) => Ok(Value::from(-(*b as i64))),
            other => Err(RowqlError::TypeError(format!(
                "bad operand type for unary -: '{}'",
                type_name(other)
            ))),
        },
        UnaryOperator::Plus => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::Bool(b) => Ok(Value::from(*b as i64)),
            other => Err(RowqlError::TypeError(format!(
                "bad operand type for unary +: '{}'",
                type_name(other)
            ))),
        },
        UnaryOperator::BitwiseNot => match as_integer(value) {
            Some(i) if is_int(value) => Ok(Value::from(!i)),
            _ => Err(RowqlError::TypeError(format!(
                "bad operand type for unary ~: '{}'",
                type_name(value)
            ))),
        },
    }
}

fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let idx = if index < 0 { len + index } else { index };
    (0..len).contains(&idx).then_some(idx as usize)
}

/// Item access: missing keys and out-of-range indexes give NULL.
pub fn get_item(base: &Value, key: &Value) -> RowqlResult<Value> {
    match (base, key) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Object(obj), Value::String(k)) => Ok(obj.get(k).cloned().unwrap_or(Value::Null)),
        (Value::Object(obj), other) => {
            let k = display_value(other);
            Ok(obj.get(&k).cloned().unwrap_or(Value::Null))
        }
        (Value::Array(arr), idx) if is_int(idx) => Ok(normalize_index(as_integer(idx).unwrap_or(0), arr.len())
            .map(|i| arr[i].clone())
            .unwrap_or(Value::Null)),
        (Value::String(s), idx) if is_int(idx) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(normalize_index(as_integer(idx).unwrap_or(0), chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .unwrap_or(Value::Null))
        }
        (Value::Array(_) | Value::String(_), other) => Err(RowqlError::TypeError(format!(
            "{} indices must be integers, not {}",
            type_name(base),
            type_name(other)
        ))),
        (other, _) => Err(RowqlError::TypeError(format!(
            "'{}' object is not subscriptable",
            type_name(other)
        ))),
    }
}

fn slice_bounds(start: Option<i64>, end: Option<i64>, len: usize) -> (usize, usize) {
    let len_i = len as i64;
    let clamp = |v: i64| -> usize {
        let v = if v < 0 { len_i + v } else { v };
        v.clamp(0, len_i) as usize
    };
    let s = start.map(clamp).unwrap_or(0);
    let e = end.map(clamp).unwrap_or(len);
    (s, e.max(s))
}

/// Python-style slice of a list or string.
pub fn slice_value(base: &Value, start: &Value, end: &Value) -> RowqlResult<Value> {
    let bound = |v: &Value| -> RowqlResult<Option<i64>> {
        match v {
            Value::Null => Ok(None),
            other if is_int(other) => Ok(as_integer(other)),
            other => Err(RowqlError::TypeError(format!(
                "slice indices must be integers, not {}",
                type_name(other)
            ))),
        }
    };
    let (start, end) = (bound(start)?, bound(end)?);
    match base {
        Value::Null => Ok(Value::Null),
        Value::Array(arr) => {
            let (s, e) = slice_bounds(start, end, arr.len());
            Ok(Value::Array(arr[s..e].to_vec()))
        }
        Value::String(text) => {
            let chars: Vec<char> = text.chars().collect();
            let (s, e) = slice_bounds(start, end, chars.len());
            Ok(Value::String(chars[s..e].iter().collect()))
        }
        other => Err(RowqlError::TypeError(format!(
            "'{}' object is not subscriptable",
            type_name(other)
        ))),
    }
}

/// Text rendering of a value, as used by `str()` and text writers.
/// NULL renders as the empty string.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Canonical key of a tuple of values, used for grouping and DISTINCT.
pub fn tuple_key(values: &[Value]) -> String {
    serde_json::to_string(values).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bin(l: Value, op: BinaryOperator, r: Value) -> Value {
        evaluate_binary_op(&l, &op, &r).unwrap()
    }

    #[test]
    fn test_integer_arithmetic_stays_integer() {
        assert_eq!(bin(json!(2), BinaryOperator::Add, json!(3)), json!(5));
        assert_eq!(bin(json!(7), BinaryOperator::FloorDivide, json!(2)), json!(3));
        assert_eq!(bin(json!(-7), BinaryOperator::FloorDivide, json!(2)), json!(-4));
        assert_eq!(bin(json!(-7), BinaryOperator::Modulus, json!(3)), json!(2));
        assert_eq!(bin(json!(2), BinaryOperator::Exponent, json!(10)), json!(1024));
        assert_eq!(bin(json!(7), BinaryOperator::Divide, json!(2)), json!(3.5));
        assert_eq!(bin(json!(1.5), BinaryOperator::Add, json!(1)), json!(2.5));
    }

    #[test]
    fn test_integer_overflow_does_not_panic() {
        assert_eq!(
            bin(json!(i64::MIN), BinaryOperator::FloorDivide, json!(-1)),
            json!(9223372036854775808.0)
        );
        assert_eq!(bin(json!(i64::MIN), BinaryOperator::Modulus, json!(-1)), json!(0));
        assert_eq!(bin(json!(i64::MAX), BinaryOperator::Add, json!(1)), json!(9223372036854775808.0));
    }

    #[test]
    fn test_huge_repetition_is_an_error() {
        let err = evaluate_binary_op(&json!("ab"), &BinaryOperator::Multiply, &json!(i64::MAX)).unwrap_err();
        assert!(matches!(err, RowqlError::EvalError(_)));
        assert!(evaluate_binary_op(&json!(i64::MAX), &BinaryOperator::Multiply, &json!([1, 2])).is_err());
        assert_eq!(bin(json!([0]), BinaryOperator::Multiply, json!(3)), json!([0, 0, 0]));
        assert_eq!(bin(json!("ab"), BinaryOperator::Multiply, json!(-2)), json!(""));
        assert_eq!(bin(json!([]), BinaryOperator::Multiply, json!(i64::MAX)), json!([]));
    }

    #[test]
    fn test_null_propagation() {
        assert_eq!(bin(json!(null), BinaryOperator::Add, json!(1)), json!(null));
        assert_eq!(bin(json!(1), BinaryOperator::LessThan, json!(null)), json!(null));
        assert_eq!(bin(json!(null), BinaryOperator::Equal, json!(null)), json!(null));
        assert_eq!(bin(json!(1), BinaryOperator::In, json!(null)), json!(false));
        assert_eq!(
            evaluate_unary_op(&UnaryOperator::Negate, &json!(null)).unwrap(),
            json!(null)
        );
    }

    #[test]
    fn test_type_errors() {
        assert!(evaluate_binary_op(&json!(2), &BinaryOperator::Add, &json!("")).is_err());
        assert!(evaluate_binary_op(&json!(1), &BinaryOperator::LessThan, &json!("a")).is_err());
        assert!(evaluate_binary_op(&json!(1), &BinaryOperator::Divide, &json!(0)).is_err());
    }

    #[test]
    fn test_strings_and_lists() {
        assert_eq!(bin(json!("a"), BinaryOperator::Add, json!("b")), json!("ab"));
        assert_eq!(bin(json!("ab"), BinaryOperator::Multiply, json!(2)), json!("abab"));
        assert_eq!(bin(json!([1]), BinaryOperator::Add, json!([2])), json!([1, 2]));
        assert_eq!(bin(json!("b"), BinaryOperator::In, json!("abc")), json!(true));
        assert_eq!(bin(json!(2), BinaryOperator::NotIn, json!([1, 2])), json!(false));
        assert_eq!(bin(json!("hello"), BinaryOperator::Like, json!("h%o")), json!(true));
        assert_eq!(bin(json!("a.c"), BinaryOperator::Like, json!("a_c")), json!(true));
        assert_eq!(bin(json!("abc"), BinaryOperator::Like, json!("a.c")), json!(false));
    }

    #[test]
    fn test_equality_is_numeric() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(values_equal(&json!([1, {"a": 2}]), &json!([1.0, {"a": 2.0}])));
        assert!(!values_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
        assert_eq!(compare_values(&json!("b"), &json!("a")), Ordering::Greater);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1, 3])), Ordering::Less);
        assert_eq!(compare_values(&json!(1), &json!("a")), Ordering::Less);
    }

    #[test]
    fn test_get_item() {
        let obj = json!({"a": {"b": 1}});
        assert_eq!(get_item(&obj, &json!("a")).unwrap(), json!({"b": 1}));
        assert_eq!(get_item(&obj, &json!("zz")).unwrap(), json!(null));
        assert_eq!(get_item(&json!([1, 2, 3]), &json!(-1)).unwrap(), json!(3));
        assert_eq!(get_item(&json!([1, 2, 3]), &json!(5)).unwrap(), json!(null));
        assert_eq!(get_item(&json!(null), &json!("a")).unwrap(), json!(null));
        assert_eq!(get_item(&json!("abc"), &json!(1)).unwrap(), json!("b"));
        assert!(get_item(&json!(5), &json!(0)).is_err());
    }

    #[test]
    fn test_slice() {
        let arr = json!([1, 2, 3, 4]);
        assert_eq!(slice_value(&arr, &json!(1), &json!(3)).unwrap(), json!([2, 3]));
        assert_eq!(slice_value(&arr, &json!(null), &json!(-1)).unwrap(), json!([1, 2, 3]));
        assert_eq!(slice_value(&json!("hello"), &json!(-3), &json!(null)).unwrap(), json!("llo"));
    }

    #[test]
    fn test_to_bool() {
        assert!(!to_bool(&json!(null)));
        assert!(!to_bool(&json!(0)));
        assert!(to_bool(&json!("x")));
        assert!(!to_bool(&json!([])));
    }

    #[test]
    fn test_tuple_key_treats_null_as_value() {
        assert_eq!(tuple_key(&[json!(null)]), tuple_key(&[json!(null)]));
        assert_ne!(tuple_key(&[json!(null)]), tuple_key(&[json!(0)]));
    }
}
