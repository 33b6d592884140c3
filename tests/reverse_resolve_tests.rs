// tests/reverse_resolve_tests.rs

use indexmap::IndexMap;
use qmodel_ir::ast::{BinOp, Expr, Lambda, Param, QuerySource, StringMethod};
use qmodel_ir::types::{ObjectType, Type};
use qmodel_ir::{QueryError, Value, resolve_lambda, reverse_resolve};

fn row_type() -> std::sync::Arc<ObjectType> {
    ObjectType::named("Row", vec![("v".into(), Type::Int), ("c".into(), Type::String)])
}

fn row(v: i64, c: &str) -> Value {
    let mut map = IndexMap::new();
    map.insert("v".to_string(), Value::Integer(v));
    map.insert("c".to_string(), Value::String(c.to_string()));
    Value::Object(map)
}

#[test]
fn test_plain_reference_item() {
    let row = row_type();
    let s = QuerySource::new("s", Type::Object(row.clone()));
    let item = Expr::source_ref(&s);
    let v = Expr::member_access(Expr::source_ref(&s), row.member("v").unwrap().clone()).unwrap();
    let resolved = Expr::binary(BinOp::Multiply, v, Expr::int(10)).unwrap();

    let lambda = reverse_resolve(&item, &resolved).unwrap();
    assert_eq!(lambda.to_string(), "input => (input.v * 10)");
}

#[test]
fn test_reference_inside_projection() {
    let s = QuerySource::new("s", Type::Int);
    let item = Expr::new_anonymous(vec![
        ("n".into(), Expr::source_ref(&s)),
        ("tag".into(), Expr::string("t")),
    ]);
    let resolved = Expr::binary(BinOp::Add, Expr::source_ref(&s), Expr::int(1)).unwrap();

    let lambda = reverse_resolve(&item, &resolved).unwrap();
    assert_eq!(lambda.to_string(), "input => (input.n + 1)");
    assert_eq!(lambda.params()[0].ty(), item.ty());
}

#[test]
fn test_every_reference_is_replaced() {
    let s = QuerySource::new("s", Type::String);
    let t = QuerySource::new("t", Type::String);
    let item = Expr::new_anonymous(vec![
        ("left".into(), Expr::source_ref(&s)),
        ("right".into(), Expr::source_ref(&t)),
    ]);
    let upper = Expr::string_call(Expr::source_ref(&t), StringMethod::Upper, vec![]).unwrap();
    let resolved = Expr::binary(BinOp::Add, Expr::source_ref(&s), upper).unwrap();

    let lambda = reverse_resolve(&item, &resolved).unwrap();
    assert_eq!(lambda.to_string(), "input => (input.left + input.right.upper())");
}

#[test]
fn test_last_reference_to_a_source_is_used() {
    let s = QuerySource::new("s", Type::Int);
    let item = Expr::new_anonymous(vec![
        ("first".into(), Expr::source_ref(&s)),
        ("second".into(), Expr::source_ref(&s)),
    ]);

    let lambda = reverse_resolve(&item, &Expr::source_ref(&s)).unwrap();
    assert_eq!(lambda.to_string(), "input => input.second");
}

#[test]
fn test_unaddressable_reference_falls_back_to_an_earlier_one() {
    let s = QuerySource::new("s", Type::Int);
    let doubled = Expr::binary(BinOp::Multiply, Expr::source_ref(&s), Expr::int(2)).unwrap();
    let item = Expr::new_anonymous(vec![
        ("plain".into(), Expr::source_ref(&s)),
        ("doubled".into(), doubled),
    ]);

    let lambda = reverse_resolve(&item, &Expr::source_ref(&s)).unwrap();
    assert_eq!(lambda.to_string(), "input => input.plain");
}

#[test]
fn test_missing_source_is_unresolved() {
    let s = QuerySource::new("s", Type::Int);
    let t = QuerySource::new("t", Type::Int);
    let item = Expr::new_anonymous(vec![("a".into(), Expr::source_ref(&s))]);

    let err = reverse_resolve(&item, &Expr::source_ref(&t)).unwrap_err();
    match err {
        QueryError::UnresolvedSource { item_name, .. } => assert_eq!(item_name, "t"),
        other => panic!("Expected UnresolvedSource, got {:?}", other),
    }
}

#[test]
fn test_source_hidden_in_computation_is_not_addressable() {
    let s = QuerySource::new("s", Type::Int);
    let doubled = Expr::binary(BinOp::Multiply, Expr::source_ref(&s), Expr::int(2)).unwrap();
    let item = Expr::new_anonymous(vec![("d".into(), doubled)]);

    let err = reverse_resolve(&item, &Expr::source_ref(&s)).unwrap_err();
    assert!(matches!(err, QueryError::AccessorNotFound { .. }));
}

#[test]
fn test_resolved_lambda_evaluates_on_items() {
    let row_ty = row_type();
    let s = QuerySource::new("s", Type::Object(row_ty.clone()));
    let item = Expr::source_ref(&s);
    let c = Expr::member_access(Expr::source_ref(&s), row_ty.member("c").unwrap().clone()).unwrap();
    let resolved = Expr::binary(BinOp::Equal, c, Expr::string("x")).unwrap();

    let compiled = reverse_resolve(&item, &resolved).unwrap().compile().unwrap();
    assert_eq!(compiled.invoke(&[row(1, "x")]).unwrap(), Value::Boolean(true));
    assert_eq!(compiled.invoke(&[row(2, "y")]).unwrap(), Value::Boolean(false));
}

// ============================================================================
// Forward resolution
// ============================================================================

#[test]
fn test_resolve_lambda_substitutes_the_item() {
    let row = row_type();
    let s = QuerySource::new("s", Type::Object(row.clone()));
    let x = Param::new("x", Type::Object(row.clone()));
    let body = Expr::member_access(x.to_expr(), row.member("v").unwrap().clone()).unwrap();

    let resolved = resolve_lambda(&Lambda::new(vec![x], body), &Expr::source_ref(&s)).unwrap();
    assert_eq!(resolved.to_string(), "[s].v");
}

#[test]
fn test_resolve_lambda_rejects_wrong_item_type() {
    let x = Param::new("x", Type::String);
    let lambda = Lambda::new(vec![x.clone()], x.to_expr());
    let err = resolve_lambda(&lambda, &Expr::int(1)).unwrap_err();
    assert!(matches!(err, QueryError::TypeMismatch { .. }));
}
