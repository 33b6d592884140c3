use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    ast::{BinOp, ConvertKind, Method, QueryMethod, QuerySource, StringMethod, UnaryOp},
    error::{QueryError, Result},
    types::{Member, ObjectType, Type},
    value::Value,
};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of an expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

/// Identity of a lambda parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u64);

/// A lambda parameter. Every reference to it is a separate
/// [`ExprKind::Parameter`] node carrying the same `Param`.
#[derive(Clone)]
pub struct Param(Arc<ParamData>);

#[derive(Debug)]
struct ParamData {
    id: ParamId,
    name: String,
    ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Param(Arc::new(ParamData {
            id: ParamId(NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            ty,
        }))
    }

    pub fn id(&self) -> ParamId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    /// A new reference node to this parameter.
    pub fn to_expr(&self) -> Expr {
        Expr::from_parts(self.ty().clone(), ExprKind::Parameter(self.clone()))
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Param {}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}: {}", self.0.name, self.0.id.0, self.0.ty)
    }
}

/// An immutable, shareable expression node.
///
/// Cloning an `Expr` shares the node. Equality and hashing are by node
/// identity: two structurally identical nodes built separately are never
/// equal. There is deliberately no deep equality.
#[derive(Clone)]
pub struct Expr(Arc<Node>);

struct Node {
    id: NodeId,
    ty: Type,
    kind: ExprKind,
}

/// The closed set of node kinds.
#[derive(Debug, Clone)]
pub enum ExprKind {
    Constant(Value),

    Parameter(Param),

    /// Reference to a query source, by identity
    QuerySourceRef(QuerySource),

    MemberAccess { object: Expr, member: Member },

    /// Instance call when `object` is set, static call otherwise
    MethodCall {
        object: Option<Expr>,
        method: Method,
        args: Vec<Expr>,
    },

    Convert { kind: ConvertKind, operand: Expr },

    /// Object construction. `members` is either empty (positional
    /// constructor) or parallel to `args`.
    New { members: Vec<Member>, args: Vec<Expr> },

    /// A construction followed by member bindings
    MemberInit {
        new: Expr,
        bindings: Vec<MemberBinding>,
    },

    Lambda(Lambda),
}

/// A binding inside a member-initialization node.
#[derive(Debug, Clone)]
pub enum MemberBinding {
    /// `member = expr`
    Assignment { member: Member, expr: Expr },
    /// `member = [initializers...]`, a collection initializer
    ListInit {
        member: Member,
        initializers: Vec<Expr>,
    },
}

impl MemberBinding {
    pub fn member(&self) -> &Member {
        match self {
            MemberBinding::Assignment { member, .. } | MemberBinding::ListInit { member, .. } => {
                member
            }
        }
    }
}

/// A function literal: parameters plus a body.
#[derive(Clone)]
pub struct Lambda {
    params: Vec<Param>,
    body: Expr,
}

impl Lambda {
    pub fn new(params: Vec<Param>, body: Expr) -> Self {
        Lambda { params, body }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    pub fn ty(&self) -> Type {
        Type::function(
            self.params.iter().map(|p| p.ty().clone()).collect(),
            self.body.ty().clone(),
        )
    }

    pub fn into_expr(self) -> Expr {
        let ty = self.ty();
        Expr::from_parts(ty, ExprKind::Lambda(self))
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", crate::format::format_lambda(self))
    }
}

impl Expr {
    pub(crate) fn from_parts(ty: Type, kind: ExprKind) -> Expr {
        Expr(Arc::new(Node {
            id: NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)),
            ty,
            kind,
        }))
    }

    /// A new node of the same type with different children.
    pub(crate) fn rebuild(&self, kind: ExprKind) -> Expr {
        let ty = match &kind {
            ExprKind::Lambda(lambda) => lambda.ty(),
            ExprKind::MemberAccess { member, .. } => member.ty.clone(),
            _ => self.ty().clone(),
        };
        Expr::from_parts(ty, kind)
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn ty(&self) -> &Type {
        &self.0.ty
    }

    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// Reference identity.
    pub fn is_same(&self, other: &Expr) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self.kind() {
            ExprKind::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }

    pub fn as_source_ref(&self) -> Option<&QuerySource> {
        match self.kind() {
            ExprKind::QuerySourceRef(source) => Some(source),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    /// A typed constant. The value must conform to `ty`.
    pub fn constant(value: Value, ty: Type) -> Result<Expr> {
        if !ty.accepts(&value) {
            return Err(QueryError::type_mismatch(
                "constant",
                &ty,
                crate::value::type_name(&value),
            ));
        }
        Ok(Expr::from_parts(ty, ExprKind::Constant(value)))
    }

    pub fn int(n: i64) -> Expr {
        Expr::from_parts(Type::Int, ExprKind::Constant(Value::Integer(n)))
    }

    pub fn float(n: f64) -> Expr {
        Expr::from_parts(Type::Float, ExprKind::Constant(Value::Float(n)))
    }

    pub fn string(s: impl Into<String>) -> Expr {
        Expr::from_parts(Type::String, ExprKind::Constant(Value::String(s.into())))
    }

    pub fn boolean(b: bool) -> Expr {
        Expr::from_parts(Type::Bool, ExprKind::Constant(Value::Boolean(b)))
    }

    pub fn null() -> Expr {
        Expr::from_parts(Type::Any, ExprKind::Constant(Value::Null))
    }

    pub fn parameter(param: &Param) -> Expr {
        param.to_expr()
    }

    /// A reference node to `source`, typed by the source's item type.
    pub fn source_ref(source: &QuerySource) -> Expr {
        Expr::from_parts(
            source.item_type().clone(),
            ExprKind::QuerySourceRef(source.clone()),
        )
    }

    /// `object.member` for a field or property member.
    pub fn member_access(object: Expr, member: Member) -> Result<Expr> {
        if member.is_method() {
            return Err(QueryError::InvalidArgument(format!(
                "member '{}' is a method; use a getter call",
                member
            )));
        }
        check_member_of(object.ty(), &member)?;
        let ty = member.ty.clone();
        Ok(Expr::from_parts(ty, ExprKind::MemberAccess { object, member }))
    }

    /// `object.member()` for a method-valued member.
    pub fn getter_call(object: Expr, member: Member) -> Result<Expr> {
        if !member.is_method() {
            return Err(QueryError::InvalidArgument(format!(
                "member '{}' is not a method",
                member
            )));
        }
        check_member_of(object.ty(), &member)?;
        let ty = member.ty.clone();
        Ok(Expr::from_parts(
            ty,
            ExprKind::MethodCall {
                object: Some(object),
                method: Method::Getter(member),
                args: Vec::new(),
            },
        ))
    }

    /// Reads `member` from `object`, as a member access or a getter call.
    pub fn read_member(object: Expr, member: Member) -> Result<Expr> {
        if member.is_method() {
            Expr::getter_call(object, member)
        } else {
            Expr::member_access(object, member)
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Result<Expr> {
        let ty = op.result_type(left.ty(), right.ty()).ok_or_else(|| {
            QueryError::type_mismatch(
                format!("operator '{}'", op.symbol()),
                left.ty(),
                right.ty(),
            )
        })?;
        Ok(Expr::from_parts(
            ty,
            ExprKind::MethodCall {
                object: None,
                method: Method::Binary(op),
                args: vec![left, right],
            },
        ))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Result<Expr> {
        let ty = op.result_type(operand.ty()).ok_or_else(|| {
            QueryError::type_mismatch("unary negation", "numeric", operand.ty())
        })?;
        Ok(Expr::from_parts(
            ty,
            ExprKind::MethodCall {
                object: None,
                method: Method::Unary(op),
                args: vec![operand],
            },
        ))
    }

    pub fn string_call(object: Expr, method: StringMethod, args: Vec<Expr>) -> Result<Expr> {
        if !matches!(object.ty(), Type::String | Type::Any) {
            return Err(QueryError::type_mismatch(
                format!(".{}()", method.name()),
                Type::String,
                object.ty(),
            ));
        }
        if args.len() != method.arity() {
            return Err(QueryError::InvalidArgument(format!(
                ".{}() takes {} argument(s), got {}",
                method.name(),
                method.arity(),
                args.len()
            )));
        }
        for arg in &args {
            if !Type::String.is_assignable_from(arg.ty()) {
                return Err(QueryError::type_mismatch(
                    format!(".{}() argument", method.name()),
                    Type::String,
                    arg.ty(),
                ));
            }
        }
        Ok(Expr::from_parts(
            method.result_type(),
            ExprKind::MethodCall {
                object: Some(object),
                method: Method::String(method),
                args,
            },
        ))
    }

    /// A sequence operator call in a query chain. The result type is decided
    /// by the front end.
    pub fn query_call(source: Expr, method: QueryMethod, args: Vec<Expr>, ty: Type) -> Result<Expr> {
        if source.ty().item_type().is_none() && *source.ty() != Type::Any {
            return Err(QueryError::type_mismatch(
                format!(".{}()", method),
                "sequence",
                source.ty(),
            ));
        }
        Ok(Expr::from_parts(
            ty,
            ExprKind::MethodCall {
                object: Some(source),
                method: Method::Query(method),
                args,
            },
        ))
    }

    pub fn convert(operand: Expr, ty: Type) -> Result<Expr> {
        Expr::make_convert(ConvertKind::Unchecked, operand, ty)
    }

    pub fn convert_checked(operand: Expr, ty: Type) -> Result<Expr> {
        Expr::make_convert(ConvertKind::Checked, operand, ty)
    }

    pub fn make_convert(kind: ConvertKind, operand: Expr, ty: Type) -> Result<Expr> {
        if !is_convertible(operand.ty(), &ty) {
            return Err(QueryError::type_mismatch("conversion", &ty, operand.ty()));
        }
        Ok(Expr::from_parts(ty, ExprKind::Convert { kind, operand }))
    }

    /// Construction of `ty`.
    ///
    /// With an empty `members` list the arguments are positional and must
    /// match the type's members in order. Otherwise `members` names the
    /// member each argument initializes.
    pub fn new_object(ty: Arc<ObjectType>, members: Vec<Member>, args: Vec<Expr>) -> Result<Expr> {
        if members.is_empty() {
            if !args.is_empty() && args.len() != ty.members.len() {
                return Err(QueryError::InvalidArgument(format!(
                    "constructor of {} takes {} argument(s), got {}",
                    ty.name,
                    ty.members.len(),
                    args.len()
                )));
            }
            for (member, arg) in ty.members.iter().zip(&args) {
                check_assignable(member, arg)?;
            }
        } else {
            if members.len() != args.len() {
                return Err(QueryError::InvalidArgument(format!(
                    "construction of {} lists {} member(s) for {} argument(s)",
                    ty.name,
                    members.len(),
                    args.len()
                )));
            }
            for (member, arg) in members.iter().zip(&args) {
                if !ty.members.contains(member) {
                    return Err(QueryError::InvalidArgument(format!(
                        "'{}' is not a member of {}",
                        member, ty.name
                    )));
                }
                check_assignable(member, arg)?;
            }
        }
        Ok(Expr::from_parts(Type::Object(ty), ExprKind::New { members, args }))
    }

    /// Anonymous construction `new { name = expr, ... }`.
    pub fn new_anonymous(fields: Vec<(String, Expr)>) -> Expr {
        let ty = ObjectType::anonymous(
            fields
                .iter()
                .map(|(name, expr)| (name.clone(), expr.ty().clone()))
                .collect(),
        );
        let members = ty.members.clone();
        let args = fields.into_iter().map(|(_, expr)| expr).collect();
        Expr::from_parts(Type::Object(ty), ExprKind::New { members, args })
    }

    /// `new T(...) { member = expr, ... }`. `new` must be a construction node.
    pub fn member_init(new: Expr, bindings: Vec<MemberBinding>) -> Result<Expr> {
        let object = match (new.kind(), new.ty()) {
            (ExprKind::New { .. }, Type::Object(object)) => object.clone(),
            _ => {
                return Err(QueryError::InvalidArgument(
                    "member initialization requires a construction node".to_string(),
                ));
            }
        };
        for binding in &bindings {
            let member = binding.member();
            if !object.members.contains(member) {
                return Err(QueryError::InvalidArgument(format!(
                    "'{}' is not a member of {}",
                    member, object.name
                )));
            }
            match binding {
                MemberBinding::Assignment { member, expr } => check_assignable(member, expr)?,
                MemberBinding::ListInit {
                    member,
                    initializers,
                } => {
                    let item = member.ty.item_type().ok_or_else(|| {
                        QueryError::type_mismatch(
                            format!("collection initializer of '{}'", member),
                            "sequence",
                            &member.ty,
                        )
                    })?;
                    for init in initializers {
                        if !item.is_assignable_from(init.ty()) {
                            return Err(QueryError::type_mismatch(
                                format!("collection initializer of '{}'", member),
                                item,
                                init.ty(),
                            ));
                        }
                    }
                }
            }
        }
        let ty = new.ty().clone();
        Ok(Expr::from_parts(ty, ExprKind::MemberInit { new, bindings }))
    }

    pub fn lambda(params: Vec<Param>, body: Expr) -> Expr {
        Lambda::new(params, body).into_expr()
    }
}

fn check_member_of(ty: &Type, member: &Member) -> Result<()> {
    let declared = match ty {
        Type::Any => true,
        Type::Object(object) => object.members.contains(member),
        Type::Grouping(key, _) => member.name == "key" && member.ty == **key,
        _ => false,
    };
    if declared {
        Ok(())
    } else {
        Err(QueryError::type_mismatch(
            format!("access to '{}'", member),
            &member.declaring_type,
            ty,
        ))
    }
}

fn check_assignable(member: &Member, arg: &Expr) -> Result<()> {
    if member.ty.is_assignable_from(arg.ty()) {
        Ok(())
    } else {
        Err(QueryError::type_mismatch(
            format!("assignment to '{}'", member),
            &member.ty,
            arg.ty(),
        ))
    }
}

/// Conversions allowed by conversion nodes: identity, numeric to numeric,
/// anything to or from `any`, and object to object.
pub fn is_convertible(from: &Type, to: &Type) -> bool {
    match (from, to) {
        (Type::Any, _) | (_, Type::Any) => true,
        (a, b) if a == b => true,
        (a, b) if a.is_numeric() && b.is_numeric() => true,
        (Type::Object(_), Type::Object(_)) => true,
        _ => false,
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self, self.0.id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_shapes_are_not_equal() {
        let a = Expr::int(1);
        let b = Expr::int(1);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn positional_construction_checks_arity() {
        let point = ObjectType::named("Point", vec![("x".into(), Type::Int), ("y".into(), Type::Int)]);
        let err = Expr::new_object(point, vec![], vec![Expr::int(1)]).unwrap_err();
        assert!(matches!(err, QueryError::InvalidArgument(_)));
    }

    #[test]
    fn member_access_rejects_foreign_members() {
        let point = ObjectType::named("Point", vec![("x".into(), Type::Int)]);
        let other = Member::property("x", "Other", Type::Int);
        let p = Param::new("p", Type::Object(point));
        let err = Expr::member_access(p.to_expr(), other).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }

    #[test]
    fn string_to_int_conversion_is_rejected() {
        let err = Expr::convert(Expr::string("1"), Type::Int).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }
}
