//! Moving expressions between the symbolic and the lambda form.
//!
//! A resolved expression describes a value in terms of query source
//! references, e.g. `[s].a + 1` after a `select s => new { a = s.v, ... }`.
//! Reverse resolution turns it back into a lambda over the current item:
//! with item expression `new { a = [s], b = "x" }`, the expression
//! `[s].v + 1` becomes `input => input.a.v + 1`.
//!
//! Any node that the item expression stores as-is, not only a bare
//! reference, is read back through its accessor: with item expression
//! `new { n = [s].v }`, the node `[s].v` itself becomes `input.n`.

use tracing::{debug, trace};

use crate::{
    accessor::{find_accessor, locate},
    ast::{Expr, Lambda, Param, QuerySource},
    error::{QueryError, Result},
    visitor::{ExprVisitor, ParameterReplacer, SourceReferenceCollector, walk_expr},
};

/// Rewrites `resolved` into a lambda taking one instance of
/// `item_expression`'s type.
///
/// Every query source reference in `resolved` is replaced by the accessor
/// path to the reference to the same source inside `item_expression`. With
/// several such references, the last one that can be addressed is used.
pub fn reverse_resolve(item_expression: &Expr, resolved: &Expr) -> Result<Lambda> {
    let input = Param::new("input", item_expression.ty().clone());
    let mut resolver = ReverseResolver {
        item_expression,
        input: &input,
        candidates: SourceReferenceCollector::collect(item_expression),
        error: None,
    };
    let body = resolver.visit(resolved);
    if let Some(err) = resolver.error {
        return Err(err);
    }

    let lambda = Lambda::new(vec![input], body);
    debug!(item = %item_expression, resolved = %resolved, lambda = %lambda, "reverse resolved");
    Ok(lambda)
}

struct ReverseResolver<'a> {
    item_expression: &'a Expr,
    input: &'a Param,
    /// References occurring in the item expression, in traversal order
    candidates: Vec<Expr>,
    error: Option<QueryError>,
}

impl ReverseResolver<'_> {
    /// The accessor body of the last addressable reference to `source` in
    /// the item expression.
    fn resolve_reference(&self, source: &QuerySource) -> Result<Expr> {
        let mut first_error = None;
        for searched in self
            .candidates
            .iter()
            .rev()
            .filter(|c| c.as_source_ref().is_some_and(|s| s == source))
        {
            match find_accessor(searched, self.item_expression, self.input) {
                Ok(accessor) => return Ok(accessor.body().clone()),
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        Err(first_error.unwrap_or_else(|| QueryError::UnresolvedSource {
            item_name: source.item_name().to_string(),
            reason: format!("it does not occur in the item expression '{}'", self.item_expression),
        }))
    }
}

impl ExprVisitor for ReverseResolver<'_> {
    fn visit(&mut self, expr: &Expr) -> Expr {
        if self.error.is_some() {
            return expr.clone();
        }
        // A node the item expression stores as-is is read back whole.
        if let Some(path) = locate(expr, self.item_expression, self.input) {
            trace!(node = %expr, path = %path, "node found on the item expression");
            return path;
        }
        walk_expr(self, expr)
    }

    fn visit_query_source_ref(&mut self, expr: &Expr, source: &QuerySource) -> Expr {
        if self.error.is_some() {
            return expr.clone();
        }
        match self.resolve_reference(source) {
            Ok(path) => path,
            Err(err) => {
                self.error = Some(err);
                expr.clone()
            }
        }
    }
}

/// Substitutes the single parameter of `lambda` with `item`, yielding the
/// body expressed in terms of whatever `item` references.
pub fn resolve_lambda(lambda: &Lambda, item: &Expr) -> Result<Expr> {
    let [param] = lambda.params() else {
        return Err(QueryError::InvalidArgument(format!(
            "'{}' must take exactly one parameter",
            lambda
        )));
    };
    if !param.ty().is_assignable_from(item.ty()) {
        return Err(QueryError::type_mismatch(
            format!("parameter '{}'", param.name()),
            param.ty(),
            item.ty(),
        ));
    }
    Ok(ParameterReplacer::new(param, item.clone()).visit(lambda.body()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;
    use crate::types::Type;

    #[test]
    fn reference_item_is_plain_substitution() {
        let s = QuerySource::new("s", Type::Int);
        let item = Expr::source_ref(&s);
        let resolved = Expr::binary(BinOp::Multiply, Expr::source_ref(&s), Expr::int(2)).unwrap();

        let lambda = reverse_resolve(&item, &resolved).unwrap();
        assert_eq!(lambda.to_string(), "input => (input * 2)");
    }

    #[test]
    fn foreign_source_is_unresolved() {
        let s = QuerySource::new("s", Type::Int);
        let t = QuerySource::new("t", Type::Int);
        let item = Expr::source_ref(&s);

        let err = reverse_resolve(&item, &Expr::source_ref(&t)).unwrap_err();
        assert!(matches!(err, QueryError::UnresolvedSource { ref item_name, .. } if item_name == "t"));
    }

    #[test]
    fn resolve_then_reverse_round_trips() {
        let s = QuerySource::new("s", Type::Int);
        let item = Expr::new_anonymous(vec![
            ("a".into(), Expr::source_ref(&s)),
            ("b".into(), Expr::string("x")),
        ]);
        let p = Param::new("p", item.ty().clone());
        let a = item.ty().find_member("a").unwrap();
        let selector = Lambda::new(vec![p.clone()], Expr::member_access(p.to_expr(), a).unwrap());

        let forward = resolve_lambda(&selector, &item).unwrap();
        assert!(forward.as_source_ref().is_some());

        let back = reverse_resolve(&item, &forward).unwrap();
        assert_eq!(back.to_string(), "input => input.a");
    }
}
