use std::fmt;

use crate::types::{Member, Type};

/// Binary operators, carried by static method-call nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    // Comparison
    /// Equal (`==`)
    Equal,
    /// Not equal (`!=`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Arithmetic
    /// Addition or string concatenation (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`)
    Divide,
    /// Modulo (`%`)
    Modulo,

    // Logical
    /// Logical AND (`and`)
    And,
    /// Logical OR (`or`)
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Logical negation (`!`)
    Not,
    /// Arithmetic negation (`-`)
    Negate,
}

/// Conversion flavour of a conversion node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvertKind {
    /// Narrowing truncates
    Unchecked,
    /// Narrowing fails on overflow
    Checked,
}

/// Instance methods available on strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringMethod {
    Upper,
    Lower,
    Trim,
    Length,
    Contains,
    StartsWith,
    EndsWith,
    /// Regex match
    Matches,
}

/// Sequence operators recognized in a method-call chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryMethod {
    Where,
    Select,
    OrderBy,
    OrderByDescending,
    GroupBy,
    Distinct,
    Take,
    Skip,
    Count,
    First,
    FirstOrDefault,
}

/// The method invoked by a method-call node.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    Binary(BinOp),
    Unary(UnaryOp),
    String(StringMethod),
    Query(QueryMethod),
    /// Read of a method-valued member
    Getter(Member),
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Equal => "==",
            BinOp::NotEqual => "!=",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessEqual => "<=",
            BinOp::GreaterEqual => ">=",
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Modulo => "%",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    /// Static result type for the given operand types, if the operator applies.
    pub fn result_type(self, left: &Type, right: &Type) -> Option<Type> {
        match self {
            BinOp::Equal | BinOp::NotEqual => Some(Type::Bool),
            BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
                let comparable = |t: &Type| {
                    t.is_numeric() || matches!(t, Type::String | Type::Bool | Type::Any)
                };
                (comparable(left) && comparable(right)).then_some(Type::Bool)
            }
            BinOp::And | BinOp::Or => Some(Type::Bool),
            BinOp::Add if *left == Type::String && *right == Type::String => Some(Type::String),
            BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo => {
                numeric_promotion(left, right)
            }
        }
    }
}

fn numeric_promotion(left: &Type, right: &Type) -> Option<Type> {
    match (left, right) {
        (Type::Any, _) | (_, Type::Any) => Some(Type::Any),
        (Type::Int, Type::Int) => Some(Type::Int),
        (Type::Decimal, r) if r.is_numeric() => Some(Type::Decimal),
        (l, Type::Decimal) if l.is_numeric() => Some(Type::Decimal),
        (l, r) if l.is_numeric() && r.is_numeric() => Some(Type::Float),
        _ => None,
    }
}

impl UnaryOp {
    pub fn result_type(self, operand: &Type) -> Option<Type> {
        match self {
            UnaryOp::Not => Some(Type::Bool),
            UnaryOp::Negate if operand.is_numeric() || *operand == Type::Any => {
                Some(operand.clone())
            }
            UnaryOp::Negate => None,
        }
    }
}

impl StringMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "upper" => StringMethod::Upper,
            "lower" => StringMethod::Lower,
            "trim" => StringMethod::Trim,
            "length" => StringMethod::Length,
            "contains" => StringMethod::Contains,
            "starts_with" => StringMethod::StartsWith,
            "ends_with" => StringMethod::EndsWith,
            "matches" => StringMethod::Matches,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            StringMethod::Upper => "upper",
            StringMethod::Lower => "lower",
            StringMethod::Trim => "trim",
            StringMethod::Length => "length",
            StringMethod::Contains => "contains",
            StringMethod::StartsWith => "starts_with",
            StringMethod::EndsWith => "ends_with",
            StringMethod::Matches => "matches",
        }
    }

    /// Number of arguments besides the receiver.
    pub fn arity(self) -> usize {
        match self {
            StringMethod::Upper | StringMethod::Lower | StringMethod::Trim | StringMethod::Length => 0,
            _ => 1,
        }
    }

    pub fn result_type(self) -> Type {
        match self {
            StringMethod::Upper | StringMethod::Lower | StringMethod::Trim => Type::String,
            StringMethod::Length => Type::Int,
            _ => Type::Bool,
        }
    }
}

impl QueryMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "where" => QueryMethod::Where,
            "select" => QueryMethod::Select,
            "order_by" => QueryMethod::OrderBy,
            "order_by_desc" => QueryMethod::OrderByDescending,
            "group_by" => QueryMethod::GroupBy,
            "distinct" => QueryMethod::Distinct,
            "take" => QueryMethod::Take,
            "skip" => QueryMethod::Skip,
            "count" => QueryMethod::Count,
            "first" => QueryMethod::First,
            "first_or_default" => QueryMethod::FirstOrDefault,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            QueryMethod::Where => "where",
            QueryMethod::Select => "select",
            QueryMethod::OrderBy => "order_by",
            QueryMethod::OrderByDescending => "order_by_desc",
            QueryMethod::GroupBy => "group_by",
            QueryMethod::Distinct => "distinct",
            QueryMethod::Take => "take",
            QueryMethod::Skip => "skip",
            QueryMethod::Count => "count",
            QueryMethod::First => "first",
            QueryMethod::FirstOrDefault => "first_or_default",
        }
    }
}

impl fmt::Display for QueryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
