//! JSON <-> Value conversion and type inference for JSON input

use std::sync::Arc;

use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;

use crate::{
    types::{ObjectType, Type},
    value::Value,
};

/// Convert serde_json::Value to Value
pub fn json_to_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Boolean(b),
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Value::Integer(i),
            (None, Some(f)) => Value::Float(f),
            (None, None) => Value::Null,
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            Value::Object(obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect())
        }
    }
}

/// Convert Value to serde_json::Value
///
/// Groupings become `{"key": ..., "elements": [...]}`.
pub fn value_to_json(v: Value) -> serde_json::Value {
    let number = |f: f64| {
        serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    };
    match v {
        Value::Null => serde_json::Value::Null,
        Value::Boolean(b) => serde_json::Value::Bool(b),
        Value::Integer(i) => serde_json::Value::Number(i.into()),
        Value::Float(f) => number(f),
        Value::Decimal(d) => d.to_f64().map(number).unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s),
        Value::Array(arr) => serde_json::Value::Array(arr.into_iter().map(value_to_json).collect()),
        Value::Object(obj) => serde_json::Value::Object(
            obj.into_iter().map(|(k, v)| (k, value_to_json(v))).collect(),
        ),
        Value::Grouping { key, elements } => serde_json::json!({
            "key": value_to_json(*key),
            "elements": elements.into_iter().map(value_to_json).collect::<Vec<_>>(),
        }),
    }
}

/// Infers the most specific type describing `value`.
///
/// Array items are unified: ints widen to float, objects merge their
/// members, and anything irreconcilable becomes `any`. Null carries no type
/// information.
pub fn infer_type(value: &Value) -> Type {
    match value {
        Value::Null => Type::Any,
        Value::Boolean(_) => Type::Bool,
        Value::Integer(_) => Type::Int,
        Value::Float(_) => Type::Float,
        Value::Decimal(_) => Type::Decimal,
        Value::String(_) => Type::String,
        Value::Array(items) => {
            let item = items
                .iter()
                .filter(|v| !matches!(v, Value::Null))
                .map(infer_type)
                .reduce(|a, b| unify(&a, &b))
                .unwrap_or(Type::Any);
            Type::sequence(item)
        }
        Value::Object(map) => Type::Object(ObjectType::anonymous(
            map.iter().map(|(k, v)| (k.clone(), infer_type(v))).collect(),
        )),
        Value::Grouping { key, elements } => {
            let element = match infer_type(&Value::Array(elements.clone())) {
                Type::Sequence(item) => *item,
                _ => Type::Any,
            };
            Type::grouping(infer_type(key), element)
        }
    }
}

fn unify(a: &Type, b: &Type) -> Type {
    match (a, b) {
        _ if a == b => a.clone(),
        (Type::Int, Type::Float) | (Type::Float, Type::Int) => Type::Float,
        (Type::Sequence(x), Type::Sequence(y)) => Type::sequence(unify(x, y)),
        (Type::Object(x), Type::Object(y)) => Type::Object(merge_objects(x, y)),
        _ => Type::Any,
    }
}

fn merge_objects(a: &Arc<ObjectType>, b: &Arc<ObjectType>) -> Arc<ObjectType> {
    let mut members: IndexMap<String, Type> =
        a.members.iter().map(|m| (m.name.clone(), m.ty.clone())).collect();
    for member in &b.members {
        members
            .entry(member.name.clone())
            .and_modify(|ty| *ty = unify(ty, &member.ty))
            .or_insert_with(|| member.ty.clone());
    }
    ObjectType::anonymous(members.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_items_are_unified() {
        let json = serde_json::json!([{"v": 1, "c": "x"}, {"v": 2.5, "d": true}]);
        let ty = infer_type(&json_to_value(json));
        assert_eq!(ty.to_string(), "seq<{v: float, c: string, d: bool}>");
    }

    #[test]
    fn groupings_serialize_as_key_and_elements() {
        let group = Value::Grouping {
            key: Box::new(Value::String("x".into())),
            elements: vec![Value::Integer(1)],
        };
        assert_eq!(value_to_json(group), serde_json::json!({"key": "x", "elements": [1]}));
    }
}
