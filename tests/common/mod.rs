//! Common test utilities for query tests
//!
//! Provides shared helper functions for:
//! - Running queries against in-memory variables
//! - Writing input files into a temporary directory

#![allow(dead_code)]

use std::path::PathBuf;

use rowql_core::{Query, QueryOutput, RowqlResult, Vars, WarningPolicy};
use serde_json::Value;
use tempfile::TempDir;

pub fn try_run(query: &str) -> RowqlResult<QueryOutput> {
    try_run_with(query, Vars::new(), WarningPolicy::Default)
}

pub fn try_run_with(query: &str, vars: Vars, warnings: WarningPolicy) -> RowqlResult<QueryOutput> {
    let query = Query::with_options(query, "memory", warnings)?;
    let (output, _stats) = query.run(vars)?;
    Ok(output)
}

pub fn run(query: &str) -> QueryOutput {
    try_run(query).unwrap_or_else(|e| panic!("Query failed: {}\n{}", query, e))
}

pub fn run_data(query: &str, data: Value) -> QueryOutput {
    let mut vars = Vars::new();
    vars.insert("data".to_string(), data);
    try_run_with(query, vars, WarningPolicy::Default)
        .unwrap_or_else(|e| panic!("Query failed: {}\n{}", query, e))
}

/// Values of the first output column.
pub fn first_column(output: &QueryOutput) -> Vec<Value> {
    output.column_at(0)
}

pub fn write_input(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).expect("Failed to write input file");
    path
}
