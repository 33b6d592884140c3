// tests/parser_tests.rs

use qmodel_ir::ast::{BinOp, ConvertKind, Expr, ExprKind, Method, QueryMethod, Token};
use qmodel_ir::parser::{ParseError, Parser, parse_query};
use qmodel_ir::types::{ObjectType, Type};
use qmodel_ir::{QueryError, Value};

fn rows_root() -> Expr {
    let row = ObjectType::anonymous(vec![
        ("v".into(), Type::Int),
        ("c".into(), Type::String),
        ("price".into(), Type::Float),
    ]);
    Expr::constant(Value::Array(vec![]), Type::sequence(Type::Object(row))).unwrap()
}

fn query(text: &str) -> Expr {
    parse_query(text, rows_root()).unwrap()
}

/// Body of the lambda passed as the first argument of the outermost call.
fn first_lambda_body(chain: &Expr) -> Expr {
    match chain.kind() {
        ExprKind::MethodCall { args, .. } => args[0].as_lambda().unwrap().body().clone(),
        other => panic!("Expected method call, got {:?}", other),
    }
}

// ============================================================================
// Query chains
// ============================================================================

#[test]
fn test_bare_root() {
    let root = rows_root();
    let chain = parse_query("$", root.clone()).unwrap();
    assert!(chain.is_same(&root));
}

#[test]
fn test_chain_nests_innermost_first() {
    let chain = query("$.where(x => x.v > 1).take(2)");
    match chain.kind() {
        ExprKind::MethodCall {
            object: Some(source),
            method: Method::Query(QueryMethod::Take),
            args,
        } => {
            assert_eq!(args[0].to_string(), "2");
            assert!(matches!(
                source.kind(),
                ExprKind::MethodCall {
                    method: Method::Query(QueryMethod::Where),
                    ..
                }
            ));
        }
        other => panic!("Expected take call, got {:?}", other),
    }
}

#[test]
fn test_call_result_types() {
    assert_eq!(query("$.select(x => x.c)").ty(), &Type::sequence(Type::String));
    assert_eq!(query("$.count()").ty(), &Type::Int);
    assert_eq!(
        query("$.group_by(x => x.c, x => x.v)").ty().to_string(),
        "seq<grouping<string, int>>"
    );
    assert_eq!(query("$.first()").ty().to_string(), "{v: int, c: string, price: float}");
}

#[test]
fn test_group_lambda_sees_grouping_type() {
    let chain = query("$.group_by(x => x.c).group_by(g => g.key.length())");
    assert_eq!(chain.ty().to_string(), "seq<grouping<int, grouping<string, {v: int, c: string, price: float}>>>");
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_comparison_and_logic() {
    let body = first_lambda_body(&query("$.where(x => x.v > 1 and x.c == 'a' or !(x.v < 0))"));
    assert_eq!(body.to_string(), "(((x.v > 1) and (x.c == \"a\")) or !(x.v < 0))");
    assert_eq!(body.ty(), &Type::Bool);
}

#[test]
fn test_arithmetic_promotion() {
    let body = first_lambda_body(&query("$.select(x => x.v * 2 + x.price)"));
    assert_eq!(body.to_string(), "((x.v * 2) + x.price)");
    assert_eq!(body.ty(), &Type::Float);
}

#[test]
fn test_unary_minus() {
    let body = first_lambda_body(&query("$.select(x => -x.v - 1)"));
    assert_eq!(body.to_string(), "(-x.v - 1)");
}

#[test]
fn test_string_methods() {
    let body = first_lambda_body(&query("$.where(x => x.c.trim().starts_with('a'))"));
    assert_eq!(body.to_string(), "x.c.trim().starts_with(\"a\")");
}

#[test]
fn test_conversions() {
    let body = first_lambda_body(&query("$.select(x => x.price as int)"));
    assert!(matches!(body.kind(), ExprKind::Convert { kind: ConvertKind::Unchecked, .. }));
    assert_eq!(body.ty(), &Type::Int);

    let body = first_lambda_body(&query("$.select(x => x.price as checked int)"));
    assert!(matches!(body.kind(), ExprKind::Convert { kind: ConvertKind::Checked, .. }));
}

#[test]
fn test_anonymous_construction() {
    let body = first_lambda_body(&query("$.select(x => new { n = x.v, label = 'k' })"));
    assert_eq!(body.to_string(), "new {n = x.v, label = \"k\"}");
    assert_eq!(body.ty().to_string(), "{n: int, label: string}");
}

#[test]
fn test_named_construction_is_a_member_init() {
    let point = ObjectType::named("Point", vec![("x".into(), Type::Int), ("y".into(), Type::Int)]);
    let chain = Parser::new("$.select(r => new Point { y = r.v })", rows_root())
        .unwrap()
        .with_type(point)
        .parse_query()
        .unwrap();
    let body = first_lambda_body(&chain);
    assert!(matches!(body.kind(), ExprKind::MemberInit { .. }));
    assert_eq!(body.to_string(), "new Point() {y = r.v}");
}

#[test]
fn test_standalone_expression() {
    let mut parser = Parser::new("(1 + 2) * 3", rows_root()).unwrap();
    let expr = parser.parse().unwrap();
    match expr.kind() {
        ExprKind::MethodCall {
            method: Method::Binary(BinOp::Multiply),
            args,
            ..
        } => assert_eq!(args[0].to_string(), "(1 + 2)"),
        other => panic!("Expected multiplication, got {:?}", other),
    }
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_member_is_a_type_error() {
    let err = parse_query("$.where(x => x.missing > 1)", rows_root()).unwrap_err();
    assert!(matches!(
        err,
        ParseError::Query {
            error: QueryError::TypeMismatch { .. },
            position: 15
        }
    ));
}

#[test]
fn test_operand_types_are_checked() {
    let err = parse_query("$.select(x => x.c * 2)", rows_root()).unwrap_err();
    assert!(matches!(err, ParseError::Query { error: QueryError::TypeMismatch { .. }, .. }));
}

#[test]
fn test_unknown_type_after_as() {
    let err = parse_query("$.select(x => x.v as Money)", rows_root()).unwrap_err();
    assert!(matches!(err, ParseError::UnknownType { ref name, .. } if name == "Money"));
}

#[test]
fn test_missing_root() {
    let err = parse_query("where(x => x)", rows_root()).unwrap_err();
    assert!(matches!(
        err,
        ParseError::Unexpected {
            found: Token::Identifier(_),
            position: 0,
            ..
        }
    ));
}

#[test]
fn test_trailing_tokens() {
    let err = parse_query("$.count() 1", rows_root()).unwrap_err();
    assert!(matches!(err, ParseError::Unexpected { found: Token::Integer(1), .. }));
}

#[test]
fn test_lex_errors_surface() {
    let err = parse_query("$.where(x => x.c == 'open)", rows_root()).unwrap_err();
    assert!(matches!(err, ParseError::Lex(_)));
}
