//! Accessor-path synthesis.
//!
//! Given a node nested in a construction tree, builds a lambda that extracts
//! that node's value from an instance of the tree's type:
//!
//! - `[s]` searched in `[s]` gives `input => input`
//! - `[s]` searched in `new { a = [s], b = "..." }` gives `input => input.a`
//! - `[s]` searched in `new { a = new { b = [s], c = "..." }, d = "..." }`
//!   gives `input => input.a.b`
//!
//! The searched node is matched by identity. Only constructions with member
//! information, member assignments and conversions are traversed; anything
//! else is opaque. A match ends the descent on its branch only, so sibling
//! members are still searched and the last occurrence wins.

use tracing::debug;

use crate::{
    ast::{ConvertKind, Expr, ExprKind, Lambda, MemberBinding, Param},
    error::{QueryError, Result},
    types::Member,
    visitor::{ExprVisitor, walk_expr},
};

/// Builds the accessor lambda for `searched` inside `full`.
///
/// `input` must have the same static type as `full`. When `searched` occurs
/// several times, the last occurrence in member order wins.
///
/// If `searched` is not found and some branch could not be walked because
/// its accessor step does not type-check, that step's error is returned
/// instead of `AccessorNotFound`.
pub fn find_accessor(searched: &Expr, full: &Expr, input: &Param) -> Result<Lambda> {
    if input.ty() != full.ty() {
        return Err(QueryError::type_mismatch(
            format!("accessor input parameter '{}'", input.name()),
            full.ty(),
            input.ty(),
        ));
    }

    let mut finder = AccessorFinder::new(searched, input);
    finder.visit(full);
    match (finder.found, finder.step_error) {
        (Some(path), _) => {
            let lambda = Lambda::new(vec![input.clone()], path);
            debug!(searched = %searched, accessor = %lambda, "synthesized accessor");
            Ok(lambda)
        }
        (None, Some(err)) => Err(err),
        (None, None) => Err(QueryError::AccessorNotFound {
            full: full.to_string(),
            searched: searched.to_string(),
        }),
    }
}

/// The accessor body for `searched`, if it lies on the construction spine of
/// `full`. `input` is assumed to have `full`'s type.
pub(crate) fn locate(searched: &Expr, full: &Expr, input: &Param) -> Option<Expr> {
    let mut finder = AccessorFinder::new(searched, input);
    finder.visit(full);
    finder.found
}

struct AccessorFinder<'a> {
    searched: &'a Expr,
    /// Partial paths; the top is the accessor for the node being visited.
    path: Vec<Expr>,
    found: Option<Expr>,
    /// First accessor step that failed to build; its branch was skipped.
    step_error: Option<QueryError>,
}

impl<'a> AccessorFinder<'a> {
    fn new(searched: &'a Expr, input: &Param) -> Self {
        AccessorFinder {
            searched,
            path: vec![input.to_expr()],
            found: None,
            step_error: None,
        }
    }

    fn top(&self) -> &Expr {
        // Seeded with the input parameter and every push is paired with a pop.
        &self.path[self.path.len() - 1]
    }

    /// Visits `expr` with `step` pushed onto the path.
    fn descend(&mut self, step: Expr, expr: &Expr) {
        self.path.push(step);
        self.visit(expr);
        self.path.pop();
    }

    /// Descends through `step`, or records why the branch cannot be walked.
    fn try_descend(&mut self, step: Result<Expr>, expr: &Expr) {
        match step {
            Ok(step) => self.descend(step, expr),
            Err(err) => {
                debug!(path = %self.top(), branch = %expr, error = %err, "skipping branch");
                self.step_error.get_or_insert(err);
            }
        }
    }

    fn visit_member_assignment(&mut self, member: &Member, expr: &Expr) {
        let step = Expr::read_member(self.top().clone(), member.clone());
        self.try_descend(step, expr);
    }
}

impl ExprVisitor for AccessorFinder<'_> {
    fn visit(&mut self, expr: &Expr) -> Expr {
        if expr.is_same(self.searched) {
            self.found = Some(self.top().clone());
            return expr.clone();
        }
        match expr.kind() {
            ExprKind::New { .. } | ExprKind::MemberInit { .. } | ExprKind::Convert { .. } => {
                walk_expr(self, expr)
            }
            _ => expr.clone(),
        }
    }

    fn visit_new(&mut self, expr: &Expr, members: &[Member], args: &[Expr]) -> Expr {
        for (member, arg) in members.iter().zip(args) {
            self.visit_member_assignment(member, arg);
        }
        expr.clone()
    }

    fn visit_member_init(&mut self, expr: &Expr, new: &Expr, bindings: &[MemberBinding]) -> Expr {
        self.visit(new);
        for binding in bindings {
            self.visit_member_binding(binding);
        }
        expr.clone()
    }

    fn visit_member_binding(&mut self, binding: &MemberBinding) -> (MemberBinding, bool) {
        // Collection initializers cannot be addressed by an accessor.
        if let MemberBinding::Assignment { member, expr } = binding {
            self.visit_member_assignment(member, expr);
        }
        (binding.clone(), false)
    }

    fn visit_convert(&mut self, expr: &Expr, _kind: ConvertKind, operand: &Expr) -> Expr {
        let reverse = Expr::convert(self.top().clone(), operand.ty().clone());
        self.try_descend(reverse, operand);
        expr.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::QuerySource;
    use crate::types::Type;

    #[test]
    fn searched_root_yields_identity() {
        let s = QuerySource::new("s", Type::Int);
        let reference = Expr::source_ref(&s);
        let input = Param::new("input", Type::Int);

        let lambda = find_accessor(&reference, &reference, &input).unwrap();
        assert_eq!(lambda.to_string(), "input => input");
    }

    #[test]
    fn input_type_must_match() {
        let reference = Expr::int(1);
        let input = Param::new("input", Type::String);
        let err = find_accessor(&reference, &reference, &input).unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }
}
