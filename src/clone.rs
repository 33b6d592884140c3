use std::collections::HashMap;

use crate::{
    ast::{Expr, NodeId, QuerySource, SourceId},
    visitor::{ExprVisitor, ReferenceReplacer},
};

/// Tracks which query sources were replaced while cloning a query model, so
/// that expressions copied later point at the clones.
///
/// Rewritten nodes are remembered for the lifetime of the context: a node
/// shared by several clauses before the clone is shared by their copies too.
#[derive(Debug, Default)]
pub struct CloneContext {
    mapping: HashMap<SourceId, QuerySource>,
    rewritten: HashMap<NodeId, Expr>,
}

impl CloneContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that references to `original` must now point at `clone`.
    pub fn add_mapping(&mut self, original: &QuerySource, clone: QuerySource) {
        self.mapping.insert(original.id(), clone);
    }

    pub fn lookup(&self, original: SourceId) -> Option<&QuerySource> {
        self.mapping.get(&original)
    }

    /// Rewrites the references in `expr`. References to sources without a
    /// mapping are kept as they are.
    pub fn replace(&mut self, expr: &Expr) -> Expr {
        ReferenceReplacer::new(&self.mapping, &mut self.rewritten).visit(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;
    use crate::types::Type;

    #[test]
    fn unmapped_references_are_untouched() {
        let s = QuerySource::new("s", Type::Int);
        let t = QuerySource::new("t", Type::Int);
        let s2 = QuerySource::new("s", Type::Int);
        let t_ref = Expr::source_ref(&t);
        let sum = Expr::binary(BinOp::Add, Expr::source_ref(&s), t_ref.clone()).unwrap();

        let mut ctx = CloneContext::new();
        ctx.add_mapping(&s, s2.clone());
        let cloned = ctx.replace(&sum);

        let refs = crate::visitor::SourceReferenceCollector::collect(&cloned);
        assert_eq!(refs[0].as_source_ref(), Some(&s2));
        assert!(refs[1].is_same(&t_ref));
    }

    #[test]
    fn shared_nodes_stay_shared() {
        let s = QuerySource::new("s", Type::Int);
        let s2 = QuerySource::new("s", Type::Int);
        let shared = Expr::binary(BinOp::Add, Expr::source_ref(&s), Expr::int(1)).unwrap();
        let tree = Expr::new_anonymous(vec![("a".into(), shared.clone())]);

        let mut ctx = CloneContext::new();
        ctx.add_mapping(&s, s2);
        let tree_copy = ctx.replace(&tree);
        let shared_copy = ctx.replace(&shared);

        assert!(!shared_copy.is_same(&shared));
        match tree_copy.kind() {
            crate::ast::ExprKind::New { args, .. } => assert!(args[0].is_same(&shared_copy)),
            other => panic!("Expected construction, got {:?}", other),
        }
    }
}
