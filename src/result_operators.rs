//! Result operators: the steps applied to a query's projected output, after
//! the select clause.
//!
//! Each operator describes its output shape statically
//! ([`ResultOperator::output_data_info`]) and can run in memory over a
//! materialized input ([`ResultOperator::execute_in_memory`]). Expressions
//! held by operators are in resolved form: they refer to query sources, not
//! to lambda parameters.

pub mod count;
pub mod distinct;
pub mod first;
pub mod group;
pub mod take;

use std::fmt;

pub use count::CountResultOperator;
pub use distinct::DistinctResultOperator;
pub use first::FirstResultOperator;
pub use group::GroupResultOperator;
pub use take::{SkipResultOperator, TakeResultOperator};

use crate::{
    ast::{Expr, QuerySource},
    clone::CloneContext,
    error::{QueryError, Result},
    streamed::{StreamedData, StreamedDataInfo, StreamedSequenceInfo},
};

pub trait ResultOperator: fmt::Display + fmt::Debug + Send + Sync {
    /// Operator name as written in a query chain.
    fn name(&self) -> &'static str;

    /// Shape of the output given the shape of the input.
    fn output_data_info(&self, input: &StreamedDataInfo) -> Result<StreamedDataInfo>;

    fn execute_in_memory(&self, input: StreamedData) -> Result<StreamedData>;

    /// Replaces every expression held by the operator with `f(expression)`.
    fn transform_expressions(&mut self, f: &mut dyn FnMut(Expr) -> Expr);

    /// Copies the operator for a cloned query model. Sources the operator
    /// introduces are registered in `ctx`.
    fn clone_with(&self, ctx: &mut CloneContext) -> Box<dyn ResultOperator>;

    /// The query source this operator introduces, if it changes the item
    /// identity (as grouping does).
    fn as_query_source(&self) -> Option<QuerySource> {
        None
    }
}

pub(crate) fn require_sequence<'a>(
    operator: &dyn ResultOperator,
    input: &'a StreamedDataInfo,
) -> Result<&'a StreamedSequenceInfo> {
    input.as_sequence().ok_or_else(|| {
        QueryError::type_mismatch(
            format!("input of {}", operator.name()),
            "sequence",
            input.data_type(),
        )
    })
}
