use std::collections::HashMap;

use indexmap::IndexMap;
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use tracing::trace;

use crate::{
    ast::{BinOp, ConvertKind, Expr, ExprKind, Lambda, MemberBinding, Method, ParamId, StringMethod, UnaryOp},
    error::{QueryError, Result},
    types::Type,
    value::{GroupKey, Value, type_name},
    visitor::SourceReferenceCollector,
};

/// A lambda checked to be free of query source references, ready to be
/// invoked on runtime values.
#[derive(Debug, Clone)]
pub struct CompiledLambda {
    lambda: Lambda,
}

impl Lambda {
    /// Prepares this lambda for in-memory invocation.
    ///
    /// Fails with `UnresolvedSource` if the body still references a query
    /// source; such references only have a meaning to a translator.
    pub fn compile(&self) -> Result<CompiledLambda> {
        if let Some(reference) = SourceReferenceCollector::collect(self.body()).first() {
            let source = reference.as_source_ref().map(|s| s.item_name().to_string());
            return Err(QueryError::UnresolvedSource {
                item_name: source.unwrap_or_default(),
                reason: format!("'{}' still references a query source", self),
            });
        }
        Ok(CompiledLambda {
            lambda: self.clone(),
        })
    }
}

impl CompiledLambda {
    pub fn lambda(&self) -> &Lambda {
        &self.lambda
    }

    /// Evaluates the body with `args` bound to the parameters, in order.
    pub fn invoke(&self, args: &[Value]) -> Result<Value> {
        let params = self.lambda.params();
        if params.len() != args.len() {
            return Err(QueryError::InvalidArgument(format!(
                "'{}' takes {} argument(s), got {}",
                self.lambda,
                params.len(),
                args.len()
            )));
        }
        let mut evaluator = Evaluator::new();
        for (param, arg) in params.iter().zip(args) {
            if !param.ty().accepts(arg) {
                return Err(QueryError::type_mismatch(
                    format!("argument '{}'", param.name()),
                    param.ty(),
                    type_name(arg),
                ));
            }
            evaluator.bind(param.id(), arg.clone());
        }
        let result = evaluator.eval(self.lambda.body())?;
        trace!(lambda = %self.lambda, result = %result, "invoked");
        Ok(result)
    }
}

/// Evaluates expression trees against bound parameter values.
#[derive(Default)]
pub struct Evaluator {
    bindings: HashMap<ParamId, Value>,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, param: ParamId, value: Value) {
        self.bindings.insert(param, value);
    }

    /// Evaluates an expression that references no parameters.
    pub fn eval_closed(expr: &Expr) -> Result<Value> {
        Evaluator::new().eval(expr)
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr.kind() {
            ExprKind::Constant(value) => Ok(value.clone()),
            ExprKind::Parameter(param) => self.bindings.get(&param.id()).cloned().ok_or_else(|| {
                QueryError::evaluation(format!("parameter '{}' is not bound", param.name()))
            }),
            ExprKind::QuerySourceRef(source) => Err(QueryError::UnresolvedSource {
                item_name: source.item_name().to_string(),
                reason: "query source references must be resolved before evaluation".to_string(),
            }),
            ExprKind::MemberAccess { object, member } => {
                let object = self.eval(object)?;
                read_member(&object, &member.name)
            }
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => self.eval_method_call(object.as_ref(), method, args),
            ExprKind::Convert { kind, operand } => {
                let value = self.eval(operand)?;
                convert_value(value, expr.ty(), *kind)
            }
            ExprKind::New { members, args } => {
                let mut map = IndexMap::new();
                match (members.is_empty(), expr.ty()) {
                    (false, _) => {
                        for (member, arg) in members.iter().zip(args) {
                            map.insert(member.name.clone(), self.eval(arg)?);
                        }
                    }
                    (true, Type::Object(object)) if args.is_empty() => {
                        for member in &object.members {
                            map.insert(member.name.clone(), Value::Null);
                        }
                    }
                    (true, Type::Object(object)) => {
                        for (member, arg) in object.members.iter().zip(args) {
                            map.insert(member.name.clone(), self.eval(arg)?);
                        }
                    }
                    (true, ty) => {
                        return Err(QueryError::evaluation(format!(
                            "cannot construct a value of type {}",
                            ty
                        )));
                    }
                }
                Ok(Value::Object(map))
            }
            ExprKind::MemberInit { new, bindings } => {
                let mut map = match self.eval(new)? {
                    Value::Object(map) => map,
                    other => {
                        return Err(QueryError::evaluation(format!(
                            "member initialization of a {}",
                            type_name(&other)
                        )));
                    }
                };
                for binding in bindings {
                    match binding {
                        MemberBinding::Assignment { member, expr } => {
                            map.insert(member.name.clone(), self.eval(expr)?);
                        }
                        MemberBinding::ListInit {
                            member,
                            initializers,
                        } => {
                            let mut items = Vec::with_capacity(initializers.len());
                            for init in initializers {
                                items.push(self.eval(init)?);
                            }
                            map.insert(member.name.clone(), Value::Array(items));
                        }
                    }
                }
                Ok(Value::Object(map))
            }
            ExprKind::Lambda(lambda) => Err(QueryError::Unsupported(format!(
                "lambda '{}' cannot be evaluated as a value",
                lambda
            ))),
        }
    }

    fn eval_method_call(&self, object: Option<&Expr>, method: &Method, args: &[Expr]) -> Result<Value> {
        match method {
            Method::Binary(op) => {
                let [left, right] = args else {
                    return Err(QueryError::InvalidArgument(format!(
                        "operator '{}' takes two operands",
                        op.symbol()
                    )));
                };
                match op {
                    BinOp::And => {
                        let l = self.eval(left)?;
                        if !l.as_bool() {
                            return Ok(Value::Boolean(false));
                        }
                        Ok(Value::Boolean(self.eval(right)?.as_bool()))
                    }
                    BinOp::Or => {
                        let l = self.eval(left)?;
                        if l.as_bool() {
                            return Ok(Value::Boolean(true));
                        }
                        Ok(Value::Boolean(self.eval(right)?.as_bool()))
                    }
                    _ => {
                        let l = self.eval(left)?;
                        let r = self.eval(right)?;
                        apply_binop(*op, &l, &r)
                    }
                }
            }
            Method::Unary(op) => {
                let [operand] = args else {
                    return Err(QueryError::InvalidArgument(
                        "unary operator takes one operand".to_string(),
                    ));
                };
                let value = self.eval(operand)?;
                match op {
                    UnaryOp::Not => Ok(Value::Boolean(!value.as_bool())),
                    UnaryOp::Negate => match value {
                        Value::Null => Ok(Value::Null),
                        Value::Integer(n) => n
                            .checked_neg()
                            .map(Value::Integer)
                            .ok_or_else(|| QueryError::Overflow(format!("-({})", n))),
                        Value::Float(n) => Ok(Value::Float(-n)),
                        Value::Decimal(d) => Ok(Value::Decimal(-d)),
                        other => Err(QueryError::evaluation(format!(
                            "cannot negate {}",
                            type_name(&other)
                        ))),
                    },
                }
            }
            Method::String(m) => {
                let receiver = match object {
                    Some(object) => self.eval(object)?,
                    None => {
                        return Err(QueryError::InvalidArgument(format!(
                            ".{}() requires a receiver",
                            m.name()
                        )));
                    }
                };
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                apply_string_method(*m, &receiver, &values)
            }
            Method::Getter(member) => {
                let receiver = match object {
                    Some(object) => self.eval(object)?,
                    None => return Err(QueryError::InvalidArgument(format!("{}() requires a receiver", member))),
                };
                read_member(&receiver, &member.name)
            }
            Method::Query(q) => Err(QueryError::Unsupported(format!(
                ".{}() is a query operator; build a query model to execute it",
                q
            ))),
        }
    }
}

fn read_member(object: &Value, name: &str) -> Result<Value> {
    match object {
        Value::Null => Ok(Value::Null),
        Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
        Value::Grouping { key, .. } if name == "key" => Ok((**key).clone()),
        other => Err(QueryError::evaluation(format!(
            "cannot read member '{}' of {}",
            name,
            type_name(other)
        ))),
    }
}

/// Value equality used by `==`: numbers compare across kinds.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_float(), right.as_float()) {
        (Some(_), Some(_)) => left.compare(right) == Some(std::cmp::Ordering::Equal),
        _ => GroupKey(left.clone()) == GroupKey(right.clone()),
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(n) => Some(Decimal::from(*n)),
        Value::Float(n) => Decimal::from_f64(*n),
        Value::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value> {
    match op {
        BinOp::Equal => Ok(Value::Boolean(values_equal(left, right))),
        BinOp::NotEqual => Ok(Value::Boolean(!values_equal(left, right))),
        BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
            let ordering = left.compare(right).ok_or_else(|| {
                QueryError::evaluation(format!(
                    "cannot compare {} and {}",
                    type_name(left),
                    type_name(right)
                ))
            })?;
            Ok(Value::Boolean(match op {
                BinOp::LessThan => ordering.is_lt(),
                BinOp::GreaterThan => ordering.is_gt(),
                BinOp::LessEqual => ordering.is_le(),
                _ => ordering.is_ge(),
            }))
        }
        BinOp::And => Ok(Value::Boolean(left.as_bool() && right.as_bool())),
        BinOp::Or => Ok(Value::Boolean(left.as_bool() || right.as_bool())),
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide | BinOp::Modulo => {
            apply_arithmetic(op, left, right)
        }
    }
}

fn apply_arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value> {
    let overflow = || QueryError::Overflow(format!("{} {} {}", left, op.symbol(), right));
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::String(a), Value::String(b)) if op == BinOp::Add => {
            Ok(Value::String(format!("{}{}", a, b)))
        }
        (Value::Integer(a), Value::Integer(b)) => {
            let (a, b) = (*a, *b);
            let result = match op {
                BinOp::Add => a.checked_add(b),
                BinOp::Subtract => a.checked_sub(b),
                BinOp::Multiply => a.checked_mul(b),
                BinOp::Divide | BinOp::Modulo if b == 0 => return Err(QueryError::DivisionByZero),
                BinOp::Divide => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            result.map(Value::Integer).ok_or_else(overflow)
        }
        (Value::Decimal(_), _) | (_, Value::Decimal(_)) => {
            let (Some(a), Some(b)) = (to_decimal(left), to_decimal(right)) else {
                return Err(arith_type_error(op, left, right));
            };
            let result = match op {
                BinOp::Add => a.checked_add(b),
                BinOp::Subtract => a.checked_sub(b),
                BinOp::Multiply => a.checked_mul(b),
                BinOp::Divide | BinOp::Modulo if b.is_zero() => return Err(QueryError::DivisionByZero),
                BinOp::Divide => a.checked_div(b),
                _ => a.checked_rem(b),
            };
            result.map(Value::Decimal).ok_or_else(overflow)
        }
        (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
            let (Some(a), Some(b)) = (left.as_float(), right.as_float()) else {
                return Err(arith_type_error(op, left, right));
            };
            if matches!(op, BinOp::Divide | BinOp::Modulo) && b == 0.0 {
                return Err(QueryError::DivisionByZero);
            }
            // Mixed int/float goes through decimals to avoid binary rounding
            // artifacts such as 0.1 + 0.2.
            if let (Some(ad), Some(bd)) = (to_decimal(left), to_decimal(right)) {
                let exact = match op {
                    BinOp::Add => ad.checked_add(bd),
                    BinOp::Subtract => ad.checked_sub(bd),
                    BinOp::Multiply => ad.checked_mul(bd),
                    BinOp::Divide => ad.checked_div(bd),
                    _ => ad.checked_rem(bd),
                };
                if let Some(r) = exact.and_then(|d| d.to_f64()) {
                    return Ok(Value::Float(r));
                }
            }
            Ok(Value::Float(match op {
                BinOp::Add => a + b,
                BinOp::Subtract => a - b,
                BinOp::Multiply => a * b,
                BinOp::Divide => a / b,
                _ => a % b,
            }))
        }
        _ => Err(arith_type_error(op, left, right)),
    }
}

fn arith_type_error(op: BinOp, left: &Value, right: &Value) -> QueryError {
    QueryError::evaluation(format!(
        "cannot apply '{}' to {} and {}",
        op.symbol(),
        type_name(left),
        type_name(right)
    ))
}

fn apply_string_method(method: StringMethod, receiver: &Value, args: &[Value]) -> Result<Value> {
    let s = match receiver {
        Value::Null => return Ok(Value::Null),
        Value::String(s) => s,
        other => {
            return Err(QueryError::evaluation(format!(
                ".{}() requires string, got {}",
                method.name(),
                type_name(other)
            )));
        }
    };
    let arg = || -> Result<&str> {
        match args.first() {
            Some(Value::String(a)) => Ok(a.as_str()),
            Some(other) => Err(QueryError::evaluation(format!(
                ".{}() argument must be string, got {}",
                method.name(),
                type_name(other)
            ))),
            None => Err(QueryError::InvalidArgument(format!(
                ".{}() requires exactly one argument",
                method.name()
            ))),
        }
    };
    match method {
        StringMethod::Upper => Ok(Value::String(s.to_uppercase())),
        StringMethod::Lower => Ok(Value::String(s.to_lowercase())),
        StringMethod::Trim => Ok(Value::String(s.trim().to_string())),
        StringMethod::Length => Ok(Value::Integer(s.chars().count() as i64)),
        StringMethod::Contains => Ok(Value::Boolean(s.contains(arg()?))),
        StringMethod::StartsWith => Ok(Value::Boolean(s.starts_with(arg()?))),
        StringMethod::EndsWith => Ok(Value::Boolean(s.ends_with(arg()?))),
        StringMethod::Matches => {
            let re = regex::Regex::new(arg()?)
                .map_err(|e| QueryError::InvalidArgument(format!("invalid regex: {e}")))?;
            Ok(Value::Boolean(re.is_match(s)))
        }
    }
}

/// Applies a conversion node to a runtime value.
pub fn convert_value(value: Value, target: &Type, kind: ConvertKind) -> Result<Value> {
    let overflow = |v: &Value| QueryError::Overflow(format!("{} does not fit in {}", v, target));
    match (target, &value) {
        (_, Value::Null) | (Type::Any, _) => Ok(value),
        (Type::Int, Value::Integer(_)) => Ok(value),
        (Type::Int, Value::Float(f)) => {
            let truncated = f.trunc();
            let fits = truncated.is_finite()
                && truncated >= i64::MIN as f64
                && truncated < i64::MAX as f64;
            match (fits, kind) {
                (true, _) => Ok(Value::Integer(truncated as i64)),
                (false, ConvertKind::Unchecked) => Ok(Value::Integer(*f as i64)),
                (false, ConvertKind::Checked) => Err(overflow(&value)),
            }
        }
        (Type::Int, Value::Decimal(d)) => d
            .trunc()
            .to_i64()
            .map(Value::Integer)
            .ok_or_else(|| overflow(&value)),
        (Type::Float, Value::Integer(n)) => Ok(Value::Float(*n as f64)),
        (Type::Float, Value::Float(_)) => Ok(value),
        (Type::Float, Value::Decimal(d)) => {
            d.to_f64().map(Value::Float).ok_or_else(|| overflow(&value))
        }
        (Type::Decimal, Value::Integer(n)) => Ok(Value::Decimal(Decimal::from(*n))),
        (Type::Decimal, Value::Float(f)) => Decimal::from_f64(*f)
            .map(Value::Decimal)
            .ok_or_else(|| overflow(&value)),
        (Type::Decimal, Value::Decimal(_)) => Ok(value),
        (target, value) if target.accepts(value) => Ok(value.clone()),
        (target, value) => Err(QueryError::type_mismatch("conversion", target, type_name(value))),
    }
}
