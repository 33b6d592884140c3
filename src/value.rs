use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};

/// A runtime value flowing through in-memory query execution.
///
/// Integers, floats and decimals are kept apart so that conversions between
/// them stay explicit in the expression tree.
///
/// # Examples
///
/// ```
/// use qmodel_ir::Value;
/// use indexmap::IndexMap;
///
/// let mut obj = IndexMap::new();
/// obj.insert("v".to_string(), Value::Integer(1));
/// obj.insert("c".to_string(), Value::String("x".to_string()));
/// let item = Value::Object(obj);
///
/// assert_eq!(item.get("c"), Some(&Value::String("x".to_string())));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,

    Boolean(bool),

    Integer(i64),

    Float(f64),

    /// Exact decimal number
    Decimal(Decimal),

    String(String),

    Array(Vec<Value>),

    /// Object with members in construction order
    Object(IndexMap<String, Value>),

    /// One group produced by a grouping operator
    Grouping { key: Box<Value>, elements: Vec<Value> },
}

/// Returns a human-readable type name for a Value
pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Boolean(_) => "boolean",
        Value::Integer(_) => "integer",
        Value::Float(_) => "float",
        Value::Decimal(_) => "decimal",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
        Value::Grouping { .. } => "grouping",
    }
}

impl Value {
    /// Check if the value is truthy (for conditions)
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Decimal(d) => !d.is_zero(),
            Value::String(s) => !s.is_empty(),
            Value::Array(arr) => !arr.is_empty(),
            Value::Object(obj) => !obj.is_empty(),
            Value::Grouping { elements, .. } => !elements.is_empty(),
        }
    }

    /// Convert to boolean for conditions
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            _ => self.is_truthy(),
        }
    }

    /// Get as float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Reads a member of an object or the `key` of a grouping.
    pub fn get(&self, member: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(member),
            Value::Grouping { key, .. } if member == "key" => Some(key),
            _ => None,
        }
    }

    /// Ordering used by comparisons and `order_by`.
    ///
    /// Null sorts first; numbers compare across int/float/decimal; values of
    /// unrelated kinds are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Decimal(a), Value::Integer(b)) => Some(a.cmp(&Decimal::from(*b))),
            (Value::Integer(a), Value::Decimal(b)) => Some(Decimal::from(*a).cmp(b)),
            (a, b) if a.as_float().is_some() && b.as_float().is_some() => {
                a.as_float()?.partial_cmp(&b.as_float()?)
            }
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::Decimal(d) => write!(f, "{}m", d),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => {
                let items: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Value::Object(map) => {
                let items: Vec<String> = map.iter().map(|(k, v)| format!("{} = {}", k, v)).collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Value::Grouping { key, elements } => {
                let items: Vec<String> = elements.iter().map(|v| v.to_string()).collect();
                write!(f, "{} => [{}]", key, items.join(", "))
            }
        }
    }
}

/// Hashable wrapper giving values the equality used for grouping and
/// distinct.
///
/// Numbers agree with `==`: `1`, `1.0` and `1m` are the same key. Floats
/// that are not whole compare by bit pattern, so `NaN` keys group together.
/// Objects compare as maps, independent of member order.
#[derive(Debug, Clone)]
pub struct GroupKey(pub Value);

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        key_eq(&self.0, &other.0)
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

/// Canonical form of a numeric key, shared by all three numeric kinds.
#[derive(PartialEq, Eq, Hash)]
enum NumericKey {
    Int(i64),
    Float(u64),
    Decimal(Decimal),
}

fn numeric_key(value: &Value) -> Option<NumericKey> {
    match value {
        Value::Integer(n) => Some(NumericKey::Int(*n)),
        Value::Float(n) => Some(float_key(*n)),
        Value::Decimal(d) => {
            if d.fract().is_zero() {
                if let Some(n) = d.to_i64() {
                    return Some(NumericKey::Int(n));
                }
            }
            // Only decimals a float can hold exactly share keys with floats.
            match d.to_f64() {
                Some(f) if Decimal::from_f64(f).is_some_and(|back| back == *d) => Some(float_key(f)),
                _ => Some(NumericKey::Decimal(d.normalize())),
            }
        }
        _ => None,
    }
}

fn float_key(n: f64) -> NumericKey {
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        NumericKey::Int(n as i64)
    } else {
        NumericKey::Float(n.to_bits())
    }
}

fn key_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (numeric_key(a), numeric_key(b)) {
        return x == y;
    }
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| key_eq(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| key_eq(v, w)))
        }
        (
            Value::Grouping { key: k1, elements: e1 },
            Value::Grouping { key: k2, elements: e2 },
        ) => {
            key_eq(k1, k2) && e1.len() == e2.len() && e1.iter().zip(e2).all(|(l, r)| key_eq(l, r))
        }
        (x, y) => x == y,
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    if let Some(key) = numeric_key(value) {
        key.hash(state);
        return;
    }
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null | Value::Integer(_) | Value::Float(_) | Value::Decimal(_) => {}
        Value::Boolean(b) => b.hash(state),
        Value::String(s) => s.hash(state),
        Value::Array(items) => {
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                key.hash(state);
                hash_value(&map[key.as_str()], state);
            }
        }
        Value::Grouping { key, elements } => {
            hash_value(key, state);
            for item in elements {
                hash_value(item, state);
            }
        }
    }
}
