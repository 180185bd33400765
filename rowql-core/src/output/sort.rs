use std::cmp::Ordering;

use serde_json::Value;

use super::OutputRecord;
use crate::executor::compare_values;
use crate::query::OrderKey;

/// Compare two values of one ORDER BY key. NULL placement follows the key's
/// NULLS FIRST/LAST setting regardless of direction.
pub(crate) fn compare_sort_values(a: &Value, b: &Value, key: &OrderKey) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if key.nulls_first() {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, true) => {
            if key.nulls_first() {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, false) => {
            let cmp = compare_values(a, b);
            if key.descending {
                cmp.reverse()
            } else {
                cmp
            }
        }
    }
}

/// Stable multi-key sort: one stable pass per key, least significant first.
pub(crate) fn sort_records(records: &mut [OutputRecord], order_by: &[OrderKey]) {
    for (i, key) in order_by.iter().enumerate().rev() {
        records.sort_by(|a, b| {
            let av = a.sort_keys.get(i).unwrap_or(&Value::Null);
            let bv = b.sort_keys.get(i).unwrap_or(&Value::Null);
            compare_sort_values(av, bv, key)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{NullsOrder, OrderTarget};
    use serde_json::json;

    fn key(descending: bool, nulls: Option<NullsOrder>) -> OrderKey {
        OrderKey {
            target: OrderTarget::OutputColumn(0),
            descending,
            nulls,
        }
    }

    fn record(sort_keys: Vec<Value>) -> OutputRecord {
        OutputRecord {
            values: sort_keys.clone(),
            sort_keys,
            group_key: String::new(),
        }
    }

    fn firsts(records: &[OutputRecord]) -> Vec<Value> {
        records.iter().map(|r| r.sort_keys[0].clone()).collect()
    }

    #[test]
    fn test_nulls_default_placement() {
        let mut rows = vec![record(vec![json!(2)]), record(vec![Value::Null]), record(vec![json!(1)])];
        sort_records(&mut rows, &[key(false, None)]);
        assert_eq!(firsts(&rows), vec![json!(1), json!(2), Value::Null]);
        sort_records(&mut rows, &[key(true, None)]);
        assert_eq!(firsts(&rows), vec![Value::Null, json!(2), json!(1)]);
    }

    #[test]
    fn test_nulls_override_is_direction_independent() {
        let mut rows = vec![record(vec![json!(2)]), record(vec![Value::Null]), record(vec![json!(1)])];
        sort_records(&mut rows, &[key(true, Some(NullsOrder::Last))]);
        assert_eq!(firsts(&rows), vec![json!(2), json!(1), Value::Null]);
        sort_records(&mut rows, &[key(false, Some(NullsOrder::First))]);
        assert_eq!(firsts(&rows), vec![Value::Null, json!(1), json!(2)]);
    }

    #[test]
    fn test_multi_key_is_lexicographic() {
        let mut rows = vec![
            record(vec![json!(1), json!("a")]),
            record(vec![json!(0), json!("b")]),
            record(vec![json!(1), json!("c")]),
            record(vec![json!(0), json!("a")]),
        ];
        sort_records(&mut rows, &[key(false, None), key(true, None)]);
        let pairs: Vec<(Value, Value)> = rows
            .iter()
            .map(|r| (r.sort_keys[0].clone(), r.sort_keys[1].clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (json!(0), json!("b")),
                (json!(0), json!("a")),
                (json!(1), json!("c")),
                (json!(1), json!("a")),
            ]
        );
    }
}
