use std::fmt;

use crate::{
    ast::Expr,
    clone::CloneContext,
    error::{QueryError, Result},
    result_operators::{ResultOperator, require_sequence},
    streamed::{StreamedData, StreamedDataInfo, StreamedValue, StreamedValueInfo},
    value::Value,
};

/// Reduces the input to its first item. On an empty input, fails unless
/// `or_default` is set, in which case the result is null.
#[derive(Debug, Clone)]
pub struct FirstResultOperator {
    or_default: bool,
}

impl FirstResultOperator {
    pub fn new(or_default: bool) -> Self {
        FirstResultOperator { or_default }
    }

    pub fn or_default(&self) -> bool {
        self.or_default
    }
}

impl ResultOperator for FirstResultOperator {
    fn name(&self) -> &'static str {
        if self.or_default { "first_or_default" } else { "first" }
    }

    fn output_data_info(&self, input: &StreamedDataInfo) -> Result<StreamedDataInfo> {
        let sequence = require_sequence(self, input)?;
        Ok(StreamedDataInfo::Value(StreamedValueInfo::new(
            sequence.item_type().clone(),
        )))
    }

    fn execute_in_memory(&self, input: StreamedData) -> Result<StreamedData> {
        let input = input.into_sequence()?;
        let info = StreamedValueInfo::new(input.info().item_type().clone());
        let value = match input.into_items().into_iter().next() {
            Some(first) => first,
            None if self.or_default => Value::Null,
            None => return Err(QueryError::EmptySequence),
        };
        Ok(StreamedData::Value(StreamedValue::new(value, info)?))
    }

    fn transform_expressions(&mut self, _f: &mut dyn FnMut(Expr) -> Expr) {}

    fn clone_with(&self, _ctx: &mut CloneContext) -> Box<dyn ResultOperator> {
        Box::new(self.clone())
    }
}

impl fmt::Display for FirstResultOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.or_default {
            write!(f, "FirstOrDefault()")
        } else {
            write!(f, "First()")
        }
    }
}
