//! Human-readable rendering of expression trees.
//!
//! Used by `Display` impls, error messages and the `explain` command.
//!
//! # Examples
//!
//! ```
//! use qmodel_ir::ast::{Expr, QuerySource};
//! use qmodel_ir::types::Type;
//!
//! let s = QuerySource::new("s", Type::Int);
//! let tree = Expr::new_anonymous(vec![
//!     ("a".to_string(), Expr::source_ref(&s)),
//!     ("b".to_string(), Expr::string("lit")),
//! ]);
//!
//! assert_eq!(tree.to_string(), r#"new {a = [s], b = "lit"}"#);
//! ```

use std::fmt::{self, Write};

use crate::ast::{ConvertKind, Expr, ExprKind, Lambda, MemberBinding, Method, UnaryOp};
use crate::types::Type;

pub struct ExprPrinter {
    out: String,
}

impl ExprPrinter {
    pub fn new() -> Self {
        ExprPrinter { out: String::new() }
    }

    pub fn print(mut self, expr: &Expr) -> String {
        self.print_expr(expr);
        self.out
    }

    fn print_expr(&mut self, expr: &Expr) {
        match expr.kind() {
            ExprKind::Constant(value) => {
                let _ = write!(self.out, "{}", value);
            }
            ExprKind::Parameter(param) => self.out.push_str(param.name()),
            ExprKind::QuerySourceRef(source) => {
                let _ = write!(self.out, "{}", source);
            }
            ExprKind::MemberAccess { object, member } => {
                self.print_expr(object);
                self.out.push('.');
                self.out.push_str(&member.name);
            }
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => self.print_call(object.as_ref(), method, args),
            ExprKind::Convert { kind, operand } => {
                self.out.push_str(match kind {
                    ConvertKind::Unchecked => "Convert(",
                    ConvertKind::Checked => "ConvertChecked(",
                });
                self.print_expr(operand);
                let _ = write!(self.out, ", {})", expr.ty());
            }
            ExprKind::New { members, args } => {
                let type_name = match expr.ty() {
                    Type::Object(object) if !object.anonymous => Some(object.name.clone()),
                    _ => None,
                };
                if members.is_empty() {
                    let _ = write!(self.out, "new {}(", type_name.as_deref().unwrap_or("object"));
                    self.print_list(args);
                    self.out.push(')');
                } else {
                    self.out.push_str("new ");
                    if let Some(name) = type_name {
                        self.out.push_str(&name);
                        self.out.push(' ');
                    }
                    self.out.push('{');
                    for (i, (member, arg)) in members.iter().zip(args).enumerate() {
                        if i > 0 {
                            self.out.push_str(", ");
                        }
                        let _ = write!(self.out, "{} = ", member.name);
                        self.print_expr(arg);
                    }
                    self.out.push('}');
                }
            }
            ExprKind::MemberInit { new, bindings } => {
                self.print_expr(new);
                self.out.push_str(" {");
                for (i, binding) in bindings.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    match binding {
                        MemberBinding::Assignment { member, expr } => {
                            let _ = write!(self.out, "{} = ", member.name);
                            self.print_expr(expr);
                        }
                        MemberBinding::ListInit {
                            member,
                            initializers,
                        } => {
                            let _ = write!(self.out, "{} = [", member.name);
                            self.print_list(initializers);
                            self.out.push(']');
                        }
                    }
                }
                self.out.push('}');
            }
            ExprKind::Lambda(lambda) => self.print_lambda(lambda),
        }
    }

    fn print_call(&mut self, object: Option<&Expr>, method: &Method, args: &[Expr]) {
        match method {
            Method::Binary(op) if args.len() == 2 => {
                self.out.push('(');
                self.print_expr(&args[0]);
                let _ = write!(self.out, " {} ", op.symbol());
                self.print_expr(&args[1]);
                self.out.push(')');
            }
            Method::Unary(op) if args.len() == 1 => {
                self.out.push_str(match op {
                    UnaryOp::Not => "!",
                    UnaryOp::Negate => "-",
                });
                self.print_expr(&args[0]);
            }
            _ => {
                let name = match method {
                    Method::String(m) => m.name().to_string(),
                    Method::Query(q) => q.name().to_string(),
                    Method::Getter(member) => member.name.clone(),
                    Method::Binary(op) => op.symbol().to_string(),
                    Method::Unary(op) => format!("{:?}", op),
                };
                if let Some(object) = object {
                    self.print_expr(object);
                    self.out.push('.');
                }
                self.out.push_str(&name);
                self.out.push('(');
                self.print_list(args);
                self.out.push(')');
            }
        }
    }

    fn print_lambda(&mut self, lambda: &Lambda) {
        match lambda.params() {
            [single] => self.out.push_str(single.name()),
            params => {
                let names: Vec<&str> = params.iter().map(|p| p.name()).collect();
                let _ = write!(self.out, "({})", names.join(", "));
            }
        }
        self.out.push_str(" => ");
        self.print_expr(lambda.body());
    }

    fn print_list(&mut self, exprs: &[Expr]) {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.print_expr(expr);
        }
    }
}

impl Default for ExprPrinter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn format_expr(expr: &Expr) -> String {
    ExprPrinter::new().print(expr)
}

pub fn format_lambda(lambda: &Lambda) -> String {
    let mut printer = ExprPrinter::new();
    printer.print_lambda(lambda);
    printer.out
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_expr(self))
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_lambda(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinOp, Param, QuerySource};

    #[test]
    fn binary_operators_print_infix() {
        let x = Param::new("x", Type::Int);
        let body = Expr::binary(BinOp::GreaterThan, x.to_expr(), Expr::int(10)).unwrap();
        let lambda = Expr::lambda(vec![x], body);
        assert_eq!(lambda.to_string(), "x => (x > 10)");
    }

    #[test]
    fn conversions_name_their_target() {
        let s = QuerySource::new("s", Type::Int);
        let conv = Expr::convert_checked(Expr::source_ref(&s), Type::Float).unwrap();
        assert_eq!(conv.to_string(), "ConvertChecked([s], float)");
    }
}
