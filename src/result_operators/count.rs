use std::fmt;

use crate::{
    ast::Expr,
    clone::CloneContext,
    error::Result,
    result_operators::{ResultOperator, require_sequence},
    streamed::{StreamedData, StreamedDataInfo, StreamedValue, StreamedValueInfo},
    types::Type,
    value::Value,
};

/// Reduces the input to its number of items.
#[derive(Debug, Clone, Default)]
pub struct CountResultOperator;

impl ResultOperator for CountResultOperator {
    fn name(&self) -> &'static str {
        "count"
    }

    fn output_data_info(&self, input: &StreamedDataInfo) -> Result<StreamedDataInfo> {
        require_sequence(self, input)?;
        Ok(StreamedDataInfo::Value(StreamedValueInfo::new(Type::Int)))
    }

    fn execute_in_memory(&self, input: StreamedData) -> Result<StreamedData> {
        let input = input.into_sequence()?;
        let count = Value::Integer(input.items().len() as i64);
        Ok(StreamedData::Value(StreamedValue::new(
            count,
            StreamedValueInfo::new(Type::Int),
        )?))
    }

    fn transform_expressions(&mut self, _f: &mut dyn FnMut(Expr) -> Expr) {}

    fn clone_with(&self, _ctx: &mut CloneContext) -> Box<dyn ResultOperator> {
        Box::new(self.clone())
    }
}

impl fmt::Display for CountResultOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Count()")
    }
}
