//! Generic expression tree visitor.
//!
//! [`ExprVisitor::visit`] dispatches on the node kind to one handler per
//! kind. The default handlers visit the children and rebuild the node only
//! when a child came back as a different node, so a pass that changes nothing
//! returns the very same tree. Implementors override the handlers they care
//! about and keep any state on themselves.

use std::collections::HashMap;

use tracing::trace;

use crate::ast::{
    ConvertKind, Expr, ExprKind, Lambda, MemberBinding, Method, NodeId, Param, ParamId,
    QuerySource, SourceId,
};
use crate::types::Member;

pub trait ExprVisitor {
    fn visit(&mut self, expr: &Expr) -> Expr {
        walk_expr(self, expr)
    }

    fn visit_constant(&mut self, expr: &Expr) -> Expr {
        expr.clone()
    }

    fn visit_parameter(&mut self, expr: &Expr, _param: &Param) -> Expr {
        expr.clone()
    }

    fn visit_query_source_ref(&mut self, expr: &Expr, _source: &QuerySource) -> Expr {
        expr.clone()
    }

    fn visit_member_access(&mut self, expr: &Expr, object: &Expr, member: &Member) -> Expr {
        let new_object = self.visit(object);
        if new_object.is_same(object) {
            expr.clone()
        } else {
            expr.rebuild(ExprKind::MemberAccess {
                object: new_object,
                member: member.clone(),
            })
        }
    }

    fn visit_method_call(
        &mut self,
        expr: &Expr,
        object: Option<&Expr>,
        method: &Method,
        args: &[Expr],
    ) -> Expr {
        let new_object = object.map(|o| self.visit(o));
        let object_changed = match (object, &new_object) {
            (Some(old), Some(new)) => !old.is_same(new),
            _ => false,
        };
        let (new_args, args_changed) = visit_list(self, args);
        if !object_changed && !args_changed {
            return expr.clone();
        }
        expr.rebuild(ExprKind::MethodCall {
            object: new_object,
            method: method.clone(),
            args: new_args,
        })
    }

    fn visit_convert(&mut self, expr: &Expr, kind: ConvertKind, operand: &Expr) -> Expr {
        let new_operand = self.visit(operand);
        if new_operand.is_same(operand) {
            expr.clone()
        } else {
            expr.rebuild(ExprKind::Convert {
                kind,
                operand: new_operand,
            })
        }
    }

    fn visit_new(&mut self, expr: &Expr, members: &[Member], args: &[Expr]) -> Expr {
        let (new_args, changed) = visit_list(self, args);
        if !changed {
            return expr.clone();
        }
        expr.rebuild(ExprKind::New {
            members: members.to_vec(),
            args: new_args,
        })
    }

    fn visit_member_init(&mut self, expr: &Expr, new: &Expr, bindings: &[MemberBinding]) -> Expr {
        let new_new = self.visit(new);
        let mut changed = !new_new.is_same(new);
        let mut new_bindings = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let (visited, binding_changed) = self.visit_member_binding(binding);
            changed |= binding_changed;
            new_bindings.push(visited);
        }
        if !changed {
            return expr.clone();
        }
        expr.rebuild(ExprKind::MemberInit {
            new: new_new,
            bindings: new_bindings,
        })
    }

    /// Returns the visited binding and whether anything in it changed.
    fn visit_member_binding(&mut self, binding: &MemberBinding) -> (MemberBinding, bool) {
        match binding {
            MemberBinding::Assignment { member, expr } => {
                let new_expr = self.visit(expr);
                let changed = !new_expr.is_same(expr);
                (
                    MemberBinding::Assignment {
                        member: member.clone(),
                        expr: new_expr,
                    },
                    changed,
                )
            }
            MemberBinding::ListInit {
                member,
                initializers,
            } => {
                let (new_inits, changed) = visit_list(self, initializers);
                (
                    MemberBinding::ListInit {
                        member: member.clone(),
                        initializers: new_inits,
                    },
                    changed,
                )
            }
        }
    }

    fn visit_lambda(&mut self, expr: &Expr, lambda: &Lambda) -> Expr {
        let body = self.visit(lambda.body());
        if body.is_same(lambda.body()) {
            expr.clone()
        } else {
            Lambda::new(lambda.params().to_vec(), body).into_expr()
        }
    }
}

/// Dispatches `expr` to the visitor's handler for its kind.
pub fn walk_expr<V: ExprVisitor + ?Sized>(visitor: &mut V, expr: &Expr) -> Expr {
    match expr.kind() {
        ExprKind::Constant(_) => visitor.visit_constant(expr),
        ExprKind::Parameter(param) => visitor.visit_parameter(expr, param),
        ExprKind::QuerySourceRef(source) => visitor.visit_query_source_ref(expr, source),
        ExprKind::MemberAccess { object, member } => {
            visitor.visit_member_access(expr, object, member)
        }
        ExprKind::MethodCall {
            object,
            method,
            args,
        } => visitor.visit_method_call(expr, object.as_ref(), method, args),
        ExprKind::Convert { kind, operand } => visitor.visit_convert(expr, *kind, operand),
        ExprKind::New { members, args } => visitor.visit_new(expr, members, args),
        ExprKind::MemberInit { new, bindings } => visitor.visit_member_init(expr, new, bindings),
        ExprKind::Lambda(lambda) => visitor.visit_lambda(expr, lambda),
    }
}

/// Visits every expression of a list; reports whether any came back changed.
pub fn visit_list<V: ExprVisitor + ?Sized>(visitor: &mut V, exprs: &[Expr]) -> (Vec<Expr>, bool) {
    let mut changed = false;
    let visited = exprs
        .iter()
        .map(|e| {
            let v = visitor.visit(e);
            changed |= !v.is_same(e);
            v
        })
        .collect();
    (visited, changed)
}

// ============================================================================
// Common specializations
// ============================================================================

/// Collects every query source reference node, in traversal order.
#[derive(Default)]
pub struct SourceReferenceCollector {
    pub references: Vec<Expr>,
}

impl SourceReferenceCollector {
    pub fn collect(expr: &Expr) -> Vec<Expr> {
        let mut collector = SourceReferenceCollector::default();
        collector.visit(expr);
        collector.references
    }
}

impl ExprVisitor for SourceReferenceCollector {
    fn visit_query_source_ref(&mut self, expr: &Expr, _source: &QuerySource) -> Expr {
        self.references.push(expr.clone());
        expr.clone()
    }
}

/// Replaces query source references according to a mapping.
///
/// References to unmapped sources are left alone. Every rewritten node is
/// recorded in `memo`, so a node shared between several expressions maps to
/// one shared node as long as the same memo is used for all of them.
pub struct ReferenceReplacer<'a> {
    mapping: &'a HashMap<SourceId, QuerySource>,
    memo: &'a mut HashMap<NodeId, Expr>,
}

impl<'a> ReferenceReplacer<'a> {
    pub fn new(mapping: &'a HashMap<SourceId, QuerySource>, memo: &'a mut HashMap<NodeId, Expr>) -> Self {
        ReferenceReplacer { mapping, memo }
    }
}

impl ExprVisitor for ReferenceReplacer<'_> {
    fn visit(&mut self, expr: &Expr) -> Expr {
        if let Some(done) = self.memo.get(&expr.id()) {
            return done.clone();
        }
        let replaced = walk_expr(self, expr);
        if !replaced.is_same(expr) {
            self.memo.insert(expr.id(), replaced.clone());
        }
        replaced
    }

    fn visit_query_source_ref(&mut self, expr: &Expr, source: &QuerySource) -> Expr {
        match self.mapping.get(&source.id()) {
            Some(replacement) => {
                trace!(from = %source, to = %replacement, "remapping source reference");
                Expr::source_ref(replacement)
            }
            None => expr.clone(),
        }
    }
}

/// Replaces references to one lambda parameter with an expression.
///
/// Member reads applied directly to a construction are folded into the
/// matching argument, so `new { a = x }.a` becomes `x`.
pub struct ParameterReplacer {
    param: ParamId,
    replacement: Expr,
}

impl ParameterReplacer {
    pub fn new(param: &Param, replacement: Expr) -> Self {
        ParameterReplacer {
            param: param.id(),
            replacement,
        }
    }
}

impl ExprVisitor for ParameterReplacer {
    fn visit_parameter(&mut self, expr: &Expr, param: &Param) -> Expr {
        if param.id() == self.param {
            self.replacement.clone()
        } else {
            expr.clone()
        }
    }

    fn visit_member_access(&mut self, expr: &Expr, object: &Expr, member: &Member) -> Expr {
        let new_object = self.visit(object);
        if let Some(folded) = fold_member_read(&new_object, member) {
            return folded;
        }
        if new_object.is_same(object) {
            expr.clone()
        } else {
            expr.rebuild(ExprKind::MemberAccess {
                object: new_object,
                member: member.clone(),
            })
        }
    }

    fn visit_method_call(
        &mut self,
        expr: &Expr,
        object: Option<&Expr>,
        method: &Method,
        args: &[Expr],
    ) -> Expr {
        if let (Some(object), Method::Getter(member)) = (object, method) {
            let new_object = self.visit(object);
            if let Some(folded) = fold_member_read(&new_object, member) {
                return folded;
            }
            if new_object.is_same(object) {
                return expr.clone();
            }
            return expr.rebuild(ExprKind::MethodCall {
                object: Some(new_object),
                method: method.clone(),
                args: Vec::new(),
            });
        }
        let new_object = object.map(|o| self.visit(o));
        let object_changed = match (object, &new_object) {
            (Some(old), Some(new)) => !old.is_same(new),
            _ => false,
        };
        let (new_args, args_changed) = visit_list(self, args);
        if !object_changed && !args_changed {
            return expr.clone();
        }
        expr.rebuild(ExprKind::MethodCall {
            object: new_object,
            method: method.clone(),
            args: new_args,
        })
    }
}

/// The argument a construction assigns to `member`, if any.
fn fold_member_read(object: &Expr, member: &Member) -> Option<Expr> {
    match object.kind() {
        ExprKind::New { members, args } => members
            .iter()
            .position(|m| m == member)
            .map(|i| args[i].clone()),
        ExprKind::MemberInit { bindings, .. } => bindings.iter().find_map(|b| match b {
            MemberBinding::Assignment { member: m, expr } if m == member => Some(expr.clone()),
            _ => None,
        }),
        _ => None,
    }
}
