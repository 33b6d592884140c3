// tests/accessor_tests.rs

use std::sync::Arc;

use qmodel_ir::ast::{BinOp, Expr, Lambda, MemberBinding, Param, QuerySource};
use qmodel_ir::types::{Member, ObjectType, Type};
use qmodel_ir::{QueryError, Value, find_accessor};

fn anonymous(fields: Vec<(&str, Expr)>) -> Expr {
    Expr::new_anonymous(fields.into_iter().map(|(n, e)| (n.to_string(), e)).collect())
}

// ============================================================================
// Paths through constructions
// ============================================================================

#[test]
fn test_member_of_anonymous_construction() {
    let s = QuerySource::new("s", Type::Int);
    let searched = Expr::source_ref(&s);
    let tree = anonymous(vec![("a", searched.clone()), ("b", Expr::string("lit"))]);
    let p = Param::new("p", tree.ty().clone());

    let accessor = find_accessor(&searched, &tree, &p).unwrap();
    assert_eq!(accessor.to_string(), "p => p.a");
    assert_eq!(accessor.body().ty(), &Type::Int);
}

#[test]
fn test_nested_constructions() {
    let s = QuerySource::new("s", Type::Int);
    let searched = Expr::source_ref(&s);
    let inner = anonymous(vec![("b", searched.clone()), ("c", Expr::string("x"))]);
    let tree = anonymous(vec![("a", inner), ("d", Expr::string("y"))]);
    let input = Param::new("input", tree.ty().clone());

    let accessor = find_accessor(&searched, &tree, &input).unwrap();
    assert_eq!(accessor.to_string(), "input => input.a.b");
}

#[test]
fn test_member_init_binding() {
    let point = ObjectType::named("Point", vec![("x".into(), Type::Int), ("y".into(), Type::Int)]);
    let s = QuerySource::new("s", Type::Int);
    let searched = Expr::source_ref(&s);
    let new = Expr::new_object(point.clone(), vec![], vec![]).unwrap();
    let tree = Expr::member_init(
        new,
        vec![
            MemberBinding::Assignment {
                member: point.member("x").unwrap().clone(),
                expr: Expr::int(0),
            },
            MemberBinding::Assignment {
                member: point.member("y").unwrap().clone(),
                expr: searched.clone(),
            },
        ],
    )
    .unwrap();
    let p = Param::new("p", tree.ty().clone());

    let accessor = find_accessor(&searched, &tree, &p).unwrap();
    assert_eq!(accessor.to_string(), "p => p.y");
}

#[test]
fn test_method_valued_member_is_read_through_a_call() {
    let boxed = Arc::new(ObjectType {
        name: "Boxed".into(),
        members: vec![
            Member::method("get_value", "Boxed", Type::Int),
            Member::field("tag", "Boxed", Type::String),
        ],
        anonymous: false,
    });
    let s = QuerySource::new("s", Type::Int);
    let searched = Expr::source_ref(&s);
    let tree = Expr::new_object(
        boxed.clone(),
        boxed.members.clone(),
        vec![searched.clone(), Expr::string("t")],
    )
    .unwrap();
    let p = Param::new("p", tree.ty().clone());

    let accessor = find_accessor(&searched, &tree, &p).unwrap();
    assert_eq!(accessor.to_string(), "p => p.get_value()");
}

#[test]
fn test_conversion_is_reversed() {
    let s = QuerySource::new("s", Type::Int);
    let searched = Expr::source_ref(&s);
    let tree = Expr::convert(searched.clone(), Type::Float).unwrap();
    let input = Param::new("input", Type::Float);

    let accessor = find_accessor(&searched, &tree, &input).unwrap();
    assert_eq!(accessor.to_string(), "input => Convert(input, int)");
    assert_eq!(accessor.body().ty(), &Type::Int);
}

#[test]
fn test_last_occurrence_wins() {
    let s = QuerySource::new("s", Type::Int);
    let shared = Expr::source_ref(&s);
    let tree = anonymous(vec![("a", shared.clone()), ("b", shared.clone())]);
    let p = Param::new("p", tree.ty().clone());

    let accessor = find_accessor(&shared, &tree, &p).unwrap();
    assert_eq!(accessor.to_string(), "p => p.b");
}

#[test]
fn test_later_nested_occurrence_wins() {
    let s = QuerySource::new("s", Type::Int);
    let shared = Expr::source_ref(&s);
    let inner = anonymous(vec![("x", shared.clone())]);
    let tree = anonymous(vec![("a", shared.clone()), ("b", inner), ("c", Expr::string("lit"))]);
    let p = Param::new("p", tree.ty().clone());

    let accessor = find_accessor(&shared, &tree, &p).unwrap();
    assert_eq!(accessor.to_string(), "p => p.b.x");
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_untyped_branch_reports_the_step_error() {
    // `slot` is declared int but holds an object erased to `any`; the reverse
    // conversion from int back to the object type cannot be built.
    let s = QuerySource::new("s", Type::Int);
    let searched = Expr::source_ref(&s);
    let erased = Expr::convert(anonymous(vec![("b", searched.clone())]), Type::Any).unwrap();
    let holder = ObjectType::named("Holder", vec![("slot".into(), Type::Int)]);
    let tree = Expr::new_object(holder.clone(), holder.members.clone(), vec![erased]).unwrap();
    let p = Param::new("p", tree.ty().clone());

    let err = find_accessor(&searched, &tree, &p).unwrap_err();
    assert!(matches!(err, QueryError::TypeMismatch { .. }));
}

#[test]
fn test_node_inside_computation_is_not_found() {
    let s = QuerySource::new("s", Type::Int);
    let searched = Expr::source_ref(&s);
    let sum = Expr::binary(BinOp::Add, searched.clone(), Expr::int(1)).unwrap();
    let tree = anonymous(vec![("a", sum)]);
    let p = Param::new("p", tree.ty().clone());

    let err = find_accessor(&searched, &tree, &p).unwrap_err();
    assert!(matches!(err, QueryError::AccessorNotFound { .. }));
}

#[test]
fn test_search_is_by_identity_not_shape() {
    let s = QuerySource::new("s", Type::Int);
    let tree = anonymous(vec![("a", Expr::source_ref(&s))]);
    let lookalike = Expr::source_ref(&s);
    let p = Param::new("p", tree.ty().clone());

    let err = find_accessor(&lookalike, &tree, &p).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The given expression 'new {a = [s]}' does not contain the searched expression '[s]' \
         in a nested construction with member assignments or a member binding"
    );
}

#[test]
fn test_input_type_mismatch() {
    let s = QuerySource::new("s", Type::Int);
    let searched = Expr::source_ref(&s);
    let tree = anonymous(vec![("a", searched.clone())]);
    let p = Param::new("p", Type::Int);

    let err = find_accessor(&searched, &tree, &p).unwrap_err();
    assert!(matches!(err, QueryError::TypeMismatch { .. }));
}

// ============================================================================
// Round trip
// ============================================================================

#[test]
fn test_accessor_extracts_what_the_tree_stored() {
    let row = ObjectType::named("Row", vec![("v".into(), Type::Int), ("c".into(), Type::String)]);
    let q = Param::new("q", Type::Object(row.clone()));
    let v = Expr::member_access(q.to_expr(), row.member("v").unwrap().clone()).unwrap();
    let c = Expr::member_access(q.to_expr(), row.member("c").unwrap().clone()).unwrap();
    let inner = anonymous(vec![("value", v.clone()), ("label", Expr::string("k"))]);
    let tree = anonymous(vec![("outer", inner), ("category", c)]);

    let mut row_value = indexmap::IndexMap::new();
    row_value.insert("v".to_string(), Value::Integer(42));
    row_value.insert("c".to_string(), Value::String("x".into()));
    let item = Lambda::new(vec![q], tree.clone())
        .compile()
        .unwrap()
        .invoke(&[Value::Object(row_value)])
        .unwrap();

    let input = Param::new("input", tree.ty().clone());
    let accessor = find_accessor(&v, &tree, &input).unwrap();
    let extracted = accessor.compile().unwrap().invoke(&[item]).unwrap();
    assert_eq!(extracted, Value::Integer(42));
}
