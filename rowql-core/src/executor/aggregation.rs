//! Position-keyed aggregate accumulation.
//!
//! Every aggregate call inside an output row consumes the next call
//! position; its running value lives under `(group key, position)`.
//! [`AggregationContext::start_row`] must be called before each row so the
//! positions line up across rows of the same group.

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::{Map, Value};

use super::helpers::{compare_values, display_value, evaluate_binary_op, to_bool, tuple_key};
use crate::ast::BinaryOperator;
use crate::error::{RowqlError, RowqlResult};

/// Names of the aggregate functions.
pub const AGGREGATE_FUNCTIONS: &[&str] = &[
    "sum_agg",
    "prod_agg",
    "count_agg",
    "avg_agg",
    "min_agg",
    "max_agg",
    "list_agg",
    "string_agg",
    "set_agg",
    "dict_agg",
    "first_agg",
    "last_agg",
    "lag_agg",
    "count_distinct_agg",
    "any_agg",
    "every_agg",
];

#[inline]
pub fn is_aggregate(name: &str) -> bool {
    AGGREGATE_FUNCTIONS.contains(&name.to_lowercase().as_str())
}

/// Running state of one aggregate call.
#[derive(Debug, Clone, Default)]
enum Accumulator {
    #[default]
    Empty,
    /// sum, prod, count, min, max, any, every
    Running(Value),
    /// first, last (the chosen value may itself be NULL)
    Chosen(Value),
    Average {
        total: Value,
        count: i64,
    },
    Items(Vec<Value>),
    Strings(Vec<String>),
    Distinct {
        seen: HashSet<String>,
        items: Vec<Value>,
    },
    Dict(Map<String, Value>),
    History(VecDeque<Value>),
}

/// Aggregate state for one query execution.
#[derive(Debug, Default)]
pub struct AggregationContext {
    group_key: String,
    position: usize,
    states: HashMap<String, Vec<Accumulator>>,
}

impl AggregationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the call position and select the group of the next row.
    pub fn start_row(&mut self, group_key: &str) {
        self.position = 0;
        if self.group_key != group_key {
            self.group_key = group_key.to_string();
        }
    }

    /// Number of groups seen so far.
    pub fn group_count(&self) -> usize {
        self.states.len()
    }

    fn next_slot(&mut self) -> &mut Accumulator {
        let position = self.position;
        self.position += 1;
        let slots = self.states.entry(self.group_key.clone()).or_default();
        if slots.len() <= position {
            slots.resize_with(position + 1, Accumulator::default);
        }
        &mut slots[position]
    }

    /// Evaluate an aggregate call with already evaluated arguments.
    pub fn call(&mut self, name: &str, args: &[Value]) -> RowqlResult<Value> {
        let name = name.to_lowercase();
        let name = name.as_str();
        match name {
            "sum_agg" | "prod_agg" => {
                check_args(name, args, 1, 1)?;
                let op = if name == "sum_agg" {
                    BinaryOperator::Add
                } else {
                    BinaryOperator::Multiply
                };
                self.fold(&args[0], |prev, val| evaluate_binary_op(prev, &op, val))
            }

            "count_agg" => {
                check_args(name, args, 1, 1)?;
                let slot = self.next_slot();
                let count = match slot {
                    Accumulator::Running(Value::Number(n)) => n.as_i64().unwrap_or(0),
                    _ => 0,
                };
                let count = if args[0].is_null() { count } else { count + 1 };
                *slot = Accumulator::Running(Value::from(count));
                Ok(Value::from(count))
            }

            "avg_agg" => {
                check_args(name, args, 1, 1)?;
                let slot = self.next_slot();
                let (mut total, mut count) = match slot {
                    Accumulator::Average { total, count } => (total.clone(), *count),
                    _ => (Value::Null, 0),
                };
                if !args[0].is_null() {
                    total = if total.is_null() {
                        args[0].clone()
                    } else {
                        evaluate_binary_op(&total, &BinaryOperator::Add, &args[0])?
                    };
                    count += 1;
                }
                let avg = if count == 0 {
                    Value::Null
                } else {
                    evaluate_binary_op(&total, &BinaryOperator::Divide, &Value::from(count))?
                };
                *slot = Accumulator::Average { total, count };
                Ok(avg)
            }

            "min_agg" | "max_agg" => {
                check_args(name, args, 1, 1)?;
                let want_min = name == "min_agg";
                self.fold(&args[0], |prev, val| {
                    let ord = compare_values(val, prev);
                    let better = if want_min { ord.is_lt() } else { ord.is_gt() };
                    Ok(if better { val.clone() } else { prev.clone() })
                })
            }

            "any_agg" | "every_agg" => {
                check_args(name, args, 1, 1)?;
                let is_any = name == "any_agg";
                let val = if args[0].is_null() {
                    Value::Null
                } else {
                    Value::Bool(to_bool(&args[0]))
                };
                self.fold(&val, |prev, val| {
                    let (a, b) = (to_bool(prev), to_bool(val));
                    Ok(Value::Bool(if is_any { a || b } else { a && b }))
                })
            }

            "list_agg" => {
                check_args(name, args, 1, 2)?;
                let respect_nulls = args.get(1).map(to_bool).unwrap_or(true);
                let slot = self.next_slot();
                if !matches!(slot, Accumulator::Items(_)) {
                    *slot = Accumulator::Items(Vec::new());
                }
                let Accumulator::Items(items) = slot else {
                    unreachable!()
                };
                if respect_nulls || !args[0].is_null() {
                    items.push(args[0].clone());
                }
                Ok(Value::Array(items.clone()))
            }

            "string_agg" => {
                check_args(name, args, 2, 3)?;
                let sep = display_value(&args[1]);
                let respect_nulls = args.get(2).map(to_bool).unwrap_or(false);
                let slot = self.next_slot();
                if !matches!(slot, Accumulator::Strings(_)) {
                    *slot = Accumulator::Strings(Vec::new());
                }
                let Accumulator::Strings(parts) = slot else {
                    unreachable!()
                };
                if respect_nulls || !args[0].is_null() {
                    parts.push(display_value(&args[0]));
                }
                Ok(Value::String(parts.join(&sep)))
            }

            "set_agg" | "count_distinct_agg" => {
                let is_set = name == "set_agg";
                if is_set {
                    check_args(name, args, 1, 2)?;
                } else {
                    check_args(name, args, 1, 1)?;
                }
                let keep = if is_set {
                    args.get(1).map(to_bool).unwrap_or(true) || !args[0].is_null()
                } else {
                    !args[0].is_null()
                };
                let slot = self.next_slot();
                if !matches!(slot, Accumulator::Distinct { .. }) {
                    *slot = Accumulator::Distinct {
                        seen: HashSet::new(),
                        items: Vec::new(),
                    };
                }
                let Accumulator::Distinct { seen, items } = slot else {
                    unreachable!()
                };
                if keep && seen.insert(tuple_key(std::slice::from_ref(&args[0]))) {
                    items.push(args[0].clone());
                }
                Ok(if is_set {
                    Value::Array(items.clone())
                } else {
                    Value::from(items.len() as i64)
                })
            }

            "dict_agg" => {
                check_args(name, args, 2, 2)?;
                let slot = self.next_slot();
                if !matches!(slot, Accumulator::Dict(_)) {
                    *slot = Accumulator::Dict(Map::new());
                }
                let Accumulator::Dict(map) = slot else {
                    unreachable!()
                };
                if !args[0].is_null() {
                    map.insert(display_value(&args[0]), args[1].clone());
                }
                Ok(Value::Object(map.clone()))
            }

            "first_agg" | "last_agg" => {
                check_args(name, args, 1, 2)?;
                let respect_nulls = args.get(1).map(to_bool).unwrap_or(true);
                let is_first = name == "first_agg";
                let slot = self.next_slot();
                if respect_nulls || !args[0].is_null() {
                    let replace = !is_first || !matches!(slot, Accumulator::Chosen(_));
                    if replace {
                        *slot = Accumulator::Chosen(args[0].clone());
                    }
                }
                Ok(match slot {
                    Accumulator::Chosen(v) => v.clone(),
                    _ => Value::Null,
                })
            }

            "lag_agg" => {
                check_args(name, args, 1, 3)?;
                let offset = match args.get(1) {
                    Some(Value::Number(n)) if n.as_u64().is_some() => {
                        n.as_u64().unwrap_or(1) as usize
                    }
                    Some(other) => {
                        return Err(RowqlError::TypeError(format!(
                            "lag_agg() offset must be a non-negative integer, got {}",
                            other
                        )))
                    }
                    None => 1,
                };
                let default = args.get(2).cloned().unwrap_or(Value::Null);
                let slot = self.next_slot();
                if !matches!(slot, Accumulator::History(_)) {
                    *slot = Accumulator::History(VecDeque::new());
                }
                let Accumulator::History(history) = slot else {
                    unreachable!()
                };
                history.push_front(args[0].clone());
                history.truncate(offset + 1);
                Ok(history.get(offset).cloned().unwrap_or(default))
            }

            other => Err(RowqlError::EvalError(format!(
                "name '{}' is not defined",
                other
            ))),
        }
    }

    /// Shared NULL-transparent fold: a NULL input leaves the running value
    /// untouched, the first non-NULL input seeds it.
    fn fold<F>(&mut self, val: &Value, op: F) -> RowqlResult<Value>
    where
        F: FnOnce(&Value, &Value) -> RowqlResult<Value>,
    {
        let slot = self.next_slot();
        let prev = match slot {
            Accumulator::Running(v) => v.clone(),
            _ => Value::Null,
        };
        if val.is_null() {
            return Ok(prev);
        }
        let next = if prev.is_null() {
            val.clone()
        } else {
            op(&prev, val)?
        };
        *slot = Accumulator::Running(next.clone());
        Ok(next)
    }
}

fn check_args(name: &str, args: &[Value], min: usize, max: usize) -> RowqlResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{} to {}", min, max)
        };
        return Err(RowqlError::EvalError(format!(
            "{}() takes {} argument(s) ({} given)",
            name,
            expected,
            args.len()
        )));
    }
    Ok(())
}
