//! File Reader and Writer Tests
//!
//! Queries run through `FileFormats` against files in a temporary directory:
//! - CSV header detection, typing and options
//! - JSON lines input and output
//! - text input
//! - SQL and pretty output

mod common;

use common::write_input;
use rowql::{FileFormats, FormatError};
use rowql_core::{Query, RowqlError, Vars, WarningPolicy};
use serde_json::{json, Map, Value};
use tempfile::TempDir;

/// Run `query` with output sent to a file; returns the file contents.
fn run_to_file(dir: &TempDir, query: &str, input_options: Map<String, Value>) -> String {
    let out_path = dir.path().join("out.txt");
    let formats = FileFormats {
        warnings: WarningPolicy::Default,
        output_path: Some(out_path.clone()),
        unbuffered: false,
    };
    let query = Query::with_options(query, "csv", WarningPolicy::Default)
        .unwrap_or_else(|e| panic!("Failed to parse: {}\n{}", query, e));
    let (output, _stats) = query
        .run_formats(Vars::new(), &formats, &input_options, &Map::new())
        .unwrap_or_else(|e| panic!("Query failed: {}", e));
    assert!(output.is_none());
    std::fs::read_to_string(out_path).expect("Failed to read output")
}

fn run_to_memory(query: &str) -> rowql_core::QueryOutput {
    let formats = FileFormats::new(WarningPolicy::Default);
    let query = Query::new(query).unwrap();
    let (output, _) = query
        .run_formats(Vars::new(), &formats, &Map::new(), &Map::new())
        .unwrap();
    output.expect("TO memory collects rows")
}

const PEOPLE: &str = "name,age,score\nalice,30,1.5\nbob,19,\ncarol,25,3\n";

#[test]
fn test_csv_to_json() {
    let dir = TempDir::new().unwrap();
    let path = write_input(&dir, "people.csv", PEOPLE);
    let query = format!(
        "SELECT name, age * 2 AS double, score FROM csv('{}') WHERE age > 20 TO json",
        path.display()
    );
    let out = run_to_file(&dir, &query, Map::new());
    assert_eq!(
        out,
        "{\"name\":\"alice\",\"double\":60,\"score\":1.5}\n\
         {\"name\":\"carol\",\"double\":50,\"score\":3.0}\n"
    );
}

#[test]
fn test_csv_typed_nulls_and_default_writer() {
    let dir = TempDir::new().unwrap();
    let path = write_input(&dir, "people.csv", PEOPLE);
    // No TO clause: the default writer is CSV.
    let query = format!(
        "SELECT name, score IS NULL AS missing FROM csv('{}') ORDER BY name DESC",
        path.display()
    );
    let out = run_to_file(&dir, &query, Map::new());
    assert_eq!(out, "name,missing\ncarol,false\nbob,true\nalice,false\n");
}

#[test]
fn test_csv_options_from_command_line_and_query() {
    let dir = TempDir::new().unwrap();
    let path = write_input(&dir, "data.csv", "1;2\n3;4\n");

    let mut input_options = Map::new();
    input_options.insert("delimiter".to_string(), json!(";"));
    input_options.insert("header".to_string(), json!(false));
    let query = format!("SELECT col1 + col2 AS s FROM csv('{}') TO csv(header=False)", path.display());
    let out = run_to_file(&dir, &query, input_options);
    assert_eq!(out, "3\n7\n");

    // Query arguments override command-line options.
    let mut input_options = Map::new();
    input_options.insert("delimiter".to_string(), json!(","));
    let query = format!(
        "SELECT col2 FROM csv('{}', delimiter=';', header=False) TO csv",
        path.display()
    );
    let out = run_to_file(&dir, &query, input_options);
    assert_eq!(out, "col2\n2\n4\n");
}

#[test]
fn test_unknown_reader_option_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = write_input(&dir, "data.csv", "a\n1\n");
    let formats = FileFormats::new(WarningPolicy::Default);
    let query = Query::new(&format!("SELECT a FROM csv('{}', colour='red')", path.display())).unwrap();
    let err = query
        .run_formats(Vars::new(), &formats, &Map::new(), &Map::new())
        .unwrap_err();
    assert!(matches!(err, RowqlError::FormatError(_)));
    assert!(err.to_string().contains("colour"));
}

#[test]
fn test_json_lines_input() {
    let dir = TempDir::new().unwrap();
    let path = write_input(
        &dir,
        "events.jsonl",
        "{\"user\": \"a\", \"n\": 1}\n\n{\"user\": \"b\", \"n\": 5}\n{\"user\": \"a\", \"n\": 2}\n",
    );
    let output = run_to_memory(&format!(
        "SELECT json.user AS user, sum_agg(json.n) AS total FROM json('{}') GROUP BY 1 TO memory",
        path.display()
    ));
    assert_eq!(
        output.to_objects(),
        vec![json!({"user": "a", "total": 3}), json!({"user": "b", "total": 5})]
    );
}

#[test]
fn test_json_column_names_drop_reader_prefix() {
    let dir = TempDir::new().unwrap();
    let path = write_input(&dir, "nested.jsonl", "{\"two\": {\"b\": 1}}\n");
    let output = run_to_memory(&format!("SELECT json.two.b FROM json('{}') TO memory", path.display()));
    assert_eq!(output.columns, vec!["two_b"]);
    assert_eq!(output.rows, vec![vec![json!(1)]]);
}

#[test]
fn test_bad_json_reports_line() {
    let dir = TempDir::new().unwrap();
    let path = write_input(&dir, "bad.jsonl", "{\"a\": 1}\n{oops\n");
    let formats = FileFormats::new(WarningPolicy::Default);
    let query = Query::new(&format!("SELECT json.a FROM json('{}') TO memory", path.display())).unwrap();
    let err = query
        .run_formats(Vars::new(), &formats, &Map::new(), &Map::new())
        .unwrap_err();
    assert!(err.to_string().contains("line 2"), "{}", err);
}

#[test]
fn test_text_input() {
    let dir = TempDir::new().unwrap();
    let path = write_input(&dir, "lines.txt", "hello world\r\nfoo\n");
    let output = run_to_memory(&format!(
        "SELECT upper(col1) AS up, len(col1) AS n FROM text('{}') TO memory",
        path.display()
    ));
    assert_eq!(
        output.rows,
        vec![vec![json!("HELLO WORLD"), json!(11)], vec![json!("FOO"), json!(3)]]
    );
}

#[test]
fn test_sql_and_pretty_output() {
    let dir = TempDir::new().unwrap();
    let out = run_to_file(
        &dir,
        "SELECT col1 AS id, 'it''s' AS note FROM [1, 2] TO sql(table='notes')",
        Map::new(),
    );
    assert_eq!(
        out,
        "INSERT INTO \"notes\"(\"id\",\"note\") VALUES (1,'it''s'),(2,'it''s');\n"
    );

    let out = run_to_file(&dir, "SELECT col1 AS x FROM [1, 20] TO pretty", Map::new());
    assert_eq!(out, "x\n--\n 1\n20\n");
}

#[test]
fn test_unknown_writer() {
    let formats = FileFormats::new(WarningPolicy::Default);
    let err = formats.writer("xml", Default::default()).err();
    assert!(matches!(err, Some(FormatError::UnknownFormat { .. })));
}
