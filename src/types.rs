//! Static type descriptors and members.
//!
//! Every expression node carries a [`Type`]. Types are compared structurally;
//! anonymous object types are named after their shape, so two constructions
//! with the same member names and types share one type.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// Static type of an expression or a sequence item.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Accepts any value; member access on it is unchecked.
    Any,
    Bool,
    Int,
    Float,
    Decimal,
    String,
    Object(Arc<ObjectType>),
    /// Sequence of items of the inner type
    Sequence(Box<Type>),
    /// Key/elements pair produced by grouping
    Grouping(Box<Type>, Box<Type>),
    Function { params: Vec<Type>, ret: Box<Type> },
}

/// A named object type with an ordered member list.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectType {
    pub name: String,
    pub members: Vec<Member>,
    pub anonymous: bool,
}

/// How a member is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    Field,
    Property,
    /// Parameterless method whose result is the member value
    Method,
}

/// A member of an object type.
///
/// Equality includes the declaring type: two members named `id` declared on
/// different types are different members.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub declaring_type: String,
    pub ty: Type,
    pub kind: MemberKind,
}

impl Member {
    pub fn new(
        name: impl Into<String>,
        declaring_type: impl Into<String>,
        ty: Type,
        kind: MemberKind,
    ) -> Self {
        Member {
            name: name.into(),
            declaring_type: declaring_type.into(),
            ty,
            kind,
        }
    }

    pub fn field(name: impl Into<String>, declaring_type: impl Into<String>, ty: Type) -> Self {
        Member::new(name, declaring_type, ty, MemberKind::Field)
    }

    pub fn property(name: impl Into<String>, declaring_type: impl Into<String>, ty: Type) -> Self {
        Member::new(name, declaring_type, ty, MemberKind::Property)
    }

    pub fn method(name: impl Into<String>, declaring_type: impl Into<String>, ty: Type) -> Self {
        Member::new(name, declaring_type, ty, MemberKind::Method)
    }

    pub fn is_method(&self) -> bool {
        self.kind == MemberKind::Method
    }
}

impl ObjectType {
    /// Creates a named object type. Members are re-declared on `name`.
    pub fn named(name: impl Into<String>, members: Vec<(String, Type)>) -> Arc<ObjectType> {
        let name = name.into();
        let members = members
            .into_iter()
            .map(|(member, ty)| Member::property(member, name.clone(), ty))
            .collect();
        Arc::new(ObjectType {
            name,
            members,
            anonymous: false,
        })
    }

    /// Creates an anonymous type named after its shape, e.g. `{a: int, b: string}`.
    pub fn anonymous(members: Vec<(String, Type)>) -> Arc<ObjectType> {
        let name = format!(
            "{{{}}}",
            members
                .iter()
                .map(|(n, t)| format!("{}: {}", n, t))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let members = members
            .into_iter()
            .map(|(member, ty)| Member::property(member, name.clone(), ty))
            .collect();
        Arc::new(ObjectType {
            name,
            members,
            anonymous: true,
        })
    }

    /// Finds the first member with the given name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
}

impl Type {
    pub fn sequence(item: Type) -> Type {
        Type::Sequence(Box::new(item))
    }

    pub fn grouping(key: Type, element: Type) -> Type {
        Type::Grouping(Box::new(key), Box::new(element))
    }

    pub fn function(params: Vec<Type>, ret: Type) -> Type {
        Type::Function {
            params,
            ret: Box::new(ret),
        }
    }

    /// Item type of a sequence, if this is one.
    pub fn item_type(&self) -> Option<&Type> {
        match self {
            Type::Sequence(item) => Some(item),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float | Type::Decimal)
    }

    /// True if a value of `other` can be used where `self` is expected
    /// without a conversion node.
    pub fn is_assignable_from(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Any, _) | (_, Type::Any) => true,
            (Type::Sequence(a), Type::Sequence(b)) => a.is_assignable_from(b),
            (Type::Grouping(ka, ea), Type::Grouping(kb, eb)) => {
                ka.is_assignable_from(kb) && ea.is_assignable_from(eb)
            }
            (a, b) => a == b,
        }
    }

    /// Looks up a readable member on this type.
    ///
    /// Groupings expose `key`; `any` yields an unchecked member of type `any`.
    pub fn find_member(&self, name: &str) -> Option<Member> {
        match self {
            Type::Object(object) => object.member(name).cloned(),
            Type::Grouping(key, _) if name == "key" => {
                Some(Member::property("key", self.to_string(), (**key).clone()))
            }
            Type::Any => Some(Member::property(name, "any", Type::Any)),
            _ => None,
        }
    }

    /// Checks a runtime value against this type.
    ///
    /// Null is accepted everywhere; ints are accepted by float and decimal.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Type::Any, _) | (_, Value::Null) => true,
            (Type::Bool, Value::Boolean(_)) => true,
            (Type::Int, Value::Integer(_)) => true,
            (Type::Float, Value::Float(_) | Value::Integer(_)) => true,
            (Type::Decimal, Value::Decimal(_) | Value::Integer(_)) => true,
            (Type::String, Value::String(_)) => true,
            (Type::Object(object), Value::Object(map)) => object.members.iter().all(|m| {
                map.get(&m.name).is_none_or(|v| m.ty.accepts(v))
            }),
            (Type::Sequence(item), Value::Array(items)) => items.iter().all(|v| item.accepts(v)),
            (Type::Grouping(key, element), Value::Grouping { key: k, elements }) => {
                key.accepts(k) && elements.iter().all(|v| element.accepts(v))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "any"),
            Type::Bool => write!(f, "bool"),
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Decimal => write!(f, "decimal"),
            Type::String => write!(f, "string"),
            Type::Object(object) => write!(f, "{}", object.name),
            Type::Sequence(item) => write!(f, "seq<{}>", item),
            Type::Grouping(key, element) => write!(f, "grouping<{}, {}>", key, element),
            Type::Function { params, ret } => {
                let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "fn({}) -> {}", params.join(", "), ret)
            }
        }
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.declaring_type, self.name)
    }
}
