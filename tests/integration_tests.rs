// tests/integration_tests.rs
//
// End-to-end: query text over JSON input, through the structure parser and
// the in-memory executor.

use qmodel_ir::cli::{CliError, RunOptions, execute_run, explain};
use qmodel_ir::parser::ParseError;
use qmodel_ir::ast::Expr;
use qmodel_ir::types::Type;
use qmodel_ir::{InMemoryExecutor, QueryError, QueryExecutor, QueryParser, Value, parse_query};
use serde_json::json;

const ROWS: &str = r#"[{"v": 1, "c": "x"}, {"v": 2, "c": "x"}, {"v": 3, "c": "y"}]"#;

fn run(query: &str) -> serde_json::Value {
    run_on(query, ROWS).unwrap()
}

fn run_on(query: &str, input: &str) -> Result<serde_json::Value, CliError> {
    execute_run(&RunOptions {
        query: query.to_string(),
        input: Some(input.to_string()),
        pretty: false,
    })
}

// ============================================================================
// Grouping
// ============================================================================

#[test]
fn test_group_by_with_element_selector() {
    assert_eq!(
        run("$.group_by(x => x.c, x => x.v)"),
        json!([
            {"key": "x", "elements": [1, 2]},
            {"key": "y", "elements": [3]},
        ])
    );
}

#[test]
fn test_group_by_keeps_whole_items() {
    assert_eq!(
        run("$.group_by(x => x.c)"),
        json!([
            {"key": "x", "elements": [{"v": 1, "c": "x"}, {"v": 2, "c": "x"}]},
            {"key": "y", "elements": [{"v": 3, "c": "y"}]},
        ])
    );
}

#[test]
fn test_group_by_computed_key() {
    assert_eq!(
        run("$.group_by(x => x.v % 2 == 0, x => x.c.upper())"),
        json!([
            {"key": false, "elements": ["X", "Y"]},
            {"key": true, "elements": ["X"]},
        ])
    );
}

#[test]
fn test_group_by_after_projection() {
    // The key is a node stored inside the projection, read back by accessor.
    assert_eq!(
        run("$.select(x => new { n = x.v * 10, cat = x.c }).group_by(y => y.cat, y => y.n)"),
        json!([
            {"key": "x", "elements": [10, 20]},
            {"key": "y", "elements": [30]},
        ])
    );
}

#[test]
fn test_group_count() {
    assert_eq!(run("$.group_by(x => x.c).count()"), json!(2));
}

#[test]
fn test_group_then_first() {
    assert_eq!(
        run("$.where(x => x.v > 1).group_by(x => x.c, x => x.v).first()"),
        json!({"key": "x", "elements": [2]})
    );
}

// ============================================================================
// Body clauses and other operators
// ============================================================================

#[test]
fn test_where_and_select() {
    assert_eq!(run("$.where(x => x.v >= 2).select(x => x.c)"), json!(["x", "y"]));
}

#[test]
fn test_order_by_descending_then_take() {
    assert_eq!(
        run("$.order_by_desc(x => x.v).select(x => x.v).take(2)"),
        json!([3, 2])
    );
}

#[test]
fn test_later_ordering_is_stable_over_earlier() {
    assert_eq!(
        run("$.order_by_desc(x => x.v).order_by(x => x.c).select(x => x.v)"),
        json!([2, 1, 3])
    );
}

#[test]
fn test_skip_and_distinct() {
    assert_eq!(run("$.select(x => x.c).distinct()"), json!(["x", "y"]));
    assert_eq!(run("$.select(x => x.v).skip(1)"), json!([2, 3]));
}

#[test]
fn test_construction_output_keeps_member_order() {
    assert_eq!(
        run("$.where(x => x.c == 'y').select(x => new { label = x.c + '!', half = x.v / 2.0 })"),
        json!([{"label": "y!", "half": 1.5}])
    );
}

#[test]
fn test_first_and_first_or_default() {
    assert_eq!(run("$.order_by_desc(x => x.v).first()"), json!({"v": 3, "c": "y"}));
    assert_eq!(run("$.where(x => x.v > 10).first_or_default()"), json!(null));

    let err = run_on("$.where(x => x.v > 10).first()", ROWS).unwrap_err();
    assert!(matches!(err, CliError::Query(QueryError::EmptySequence)));
}

#[test]
fn test_mixed_numeric_input() {
    let input = r#"[{"p": 1}, {"p": 2.5}]"#;
    assert_eq!(run_on("$.select(x => x.p * 2.0)", input).unwrap(), json!([2.0, 5.0]));
}

#[test]
fn test_equal_numbers_of_different_kinds_match_everywhere() {
    let input = r#"[{"v": 1, "c": "a"}, {"v": 1.0, "c": "b"}]"#;
    assert_eq!(
        run_on("$.group_by(x => x.v, x => x.c)", input).unwrap(),
        json!([{"key": 1, "elements": ["a", "b"]}])
    );
    assert_eq!(run_on("$.select(x => x.v).distinct()", input).unwrap(), json!([1]));
    assert_eq!(run_on("$.where(x => x.v == 1).count()", input).unwrap(), json!(2));
}

#[test]
fn test_null_members_propagate() {
    let input = r#"[{"v": 1}, {"v": null}]"#;
    assert_eq!(run_on("$.select(x => x.v + 1)", input).unwrap(), json!([2, null]));
}

// ============================================================================
// Library path
// ============================================================================

#[test]
fn test_executor_over_constant_root() {
    let root = Expr::constant(
        Value::Array(vec![Value::Integer(4), Value::Integer(1), Value::Integer(3)]),
        Type::sequence(Type::Int),
    )
    .unwrap();
    let chain = parse_query("$.where(n => n > 1).order_by(n => n).count()", root).unwrap();
    let model = QueryParser::new().parse(&chain).unwrap();
    let data = InMemoryExecutor::new().execute(&model).unwrap();
    assert_eq!(data.into_value(), Value::Integer(2));
}

// ============================================================================
// Explain
// ============================================================================

#[test]
fn test_explain_without_input() {
    let out = explain(&RunOptions {
        query: "$.where(x => x.v > 1).select(x => x.v)".to_string(),
        ..Default::default()
    })
    .unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines[0].starts_with("from any x in "));
    assert!(lines[0].ends_with(" where ([x].v > 1) select [x].v"));
    assert_eq!(lines[1], "output: seq<any> of [x].v");
}

#[test]
fn test_explain_shows_result_operators() {
    let out = explain(&RunOptions {
        query: "$.group_by(x => x.c, x => x.v).count()".to_string(),
        input: Some(ROWS.to_string()),
        pretty: false,
    })
    .unwrap();
    assert!(out.contains(" select [x] => GroupBy([x].c, [x].v) => Count()"));
    assert!(out.ends_with("output: int\n"));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_input_must_be_an_array() {
    assert!(matches!(run_on("$", r#""rows""#), Err(CliError::NotASequence("string"))));
    assert!(matches!(run_on("$", "[1,"), Err(CliError::Json(_))));
}

#[test]
fn test_unknown_member_fails_while_parsing() {
    let err = run_on("$.select(x => x.missing)", ROWS).unwrap_err();
    assert!(matches!(err, CliError::Parse(ParseError::Query { .. })));
}

#[test]
fn test_clause_after_result_operator_is_unsupported() {
    let err = run_on("$.take(1).where(x => x.v > 0)", ROWS).unwrap_err();
    assert!(matches!(err, CliError::Query(QueryError::Unsupported(_))));
}

#[test]
fn test_runtime_errors_surface() {
    let err = run_on("$.select(x => x.v / 0)", ROWS).unwrap_err();
    assert!(matches!(err, CliError::Query(QueryError::DivisionByZero)));
}
