use std::fmt;

use indexmap::IndexSet;

use crate::{
    ast::Expr,
    clone::CloneContext,
    error::Result,
    result_operators::{ResultOperator, require_sequence},
    streamed::{StreamedData, StreamedDataInfo, StreamedSequence},
    value::GroupKey,
};

/// Drops items equal (by value) to an earlier item.
#[derive(Debug, Clone, Default)]
pub struct DistinctResultOperator;

impl ResultOperator for DistinctResultOperator {
    fn name(&self) -> &'static str {
        "distinct"
    }

    fn output_data_info(&self, input: &StreamedDataInfo) -> Result<StreamedDataInfo> {
        require_sequence(self, input)?;
        Ok(input.clone())
    }

    fn execute_in_memory(&self, input: StreamedData) -> Result<StreamedData> {
        let input = input.into_sequence()?;
        let info = input.info().clone();
        let seen: IndexSet<GroupKey> = input.into_items().into_iter().map(GroupKey).collect();
        let items = seen.into_iter().map(|k| k.0).collect();
        Ok(StreamedData::Sequence(StreamedSequence::new(items, info)?))
    }

    fn transform_expressions(&mut self, _f: &mut dyn FnMut(Expr) -> Expr) {}

    fn clone_with(&self, _ctx: &mut CloneContext) -> Box<dyn ResultOperator> {
        Box::new(self.clone())
    }
}

impl fmt::Display for DistinctResultOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Distinct()")
    }
}
