use std::fmt;

use crate::{
    ast::Expr,
    clone::CloneContext,
    error::{QueryError, Result},
    evaluator::Evaluator,
    result_operators::{ResultOperator, require_sequence},
    streamed::{StreamedData, StreamedDataInfo, StreamedSequence},
    types::Type,
    value::type_name,
};

/// Evaluates a closed count expression; negative counts clamp to zero.
fn eval_count(operator: &str, count: &Expr) -> Result<usize> {
    let value = Evaluator::eval_closed(count)?;
    let n = value.as_int().ok_or_else(|| {
        QueryError::type_mismatch(format!("{} count", operator), Type::Int, type_name(&value))
    })?;
    Ok(usize::try_from(n).unwrap_or(0))
}

fn check_count(operator: &str, count: &Expr) -> Result<()> {
    if Type::Int.is_assignable_from(count.ty()) {
        Ok(())
    } else {
        Err(QueryError::type_mismatch(format!("{} count", operator), Type::Int, count.ty()))
    }
}

/// Keeps the first `count` items.
#[derive(Debug, Clone)]
pub struct TakeResultOperator {
    count: Expr,
}

impl TakeResultOperator {
    pub fn new(count: Expr) -> Result<Self> {
        check_count("take", &count)?;
        Ok(TakeResultOperator { count })
    }

    pub fn count(&self) -> &Expr {
        &self.count
    }
}

impl ResultOperator for TakeResultOperator {
    fn name(&self) -> &'static str {
        "take"
    }

    fn output_data_info(&self, input: &StreamedDataInfo) -> Result<StreamedDataInfo> {
        require_sequence(self, input)?;
        Ok(input.clone())
    }

    fn execute_in_memory(&self, input: StreamedData) -> Result<StreamedData> {
        let n = eval_count(self.name(), &self.count)?;
        let input = input.into_sequence()?;
        let info = input.info().clone();
        let items = input.into_items().into_iter().take(n).collect();
        Ok(StreamedData::Sequence(StreamedSequence::new(items, info)?))
    }

    fn transform_expressions(&mut self, f: &mut dyn FnMut(Expr) -> Expr) {
        self.count = f(self.count.clone());
    }

    fn clone_with(&self, ctx: &mut CloneContext) -> Box<dyn ResultOperator> {
        Box::new(TakeResultOperator {
            count: ctx.replace(&self.count),
        })
    }
}

impl fmt::Display for TakeResultOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Take({})", self.count)
    }
}

/// Drops the first `count` items.
#[derive(Debug, Clone)]
pub struct SkipResultOperator {
    count: Expr,
}

impl SkipResultOperator {
    pub fn new(count: Expr) -> Result<Self> {
        check_count("skip", &count)?;
        Ok(SkipResultOperator { count })
    }

    pub fn count(&self) -> &Expr {
        &self.count
    }
}

impl ResultOperator for SkipResultOperator {
    fn name(&self) -> &'static str {
        "skip"
    }

    fn output_data_info(&self, input: &StreamedDataInfo) -> Result<StreamedDataInfo> {
        require_sequence(self, input)?;
        Ok(input.clone())
    }

    fn execute_in_memory(&self, input: StreamedData) -> Result<StreamedData> {
        let n = eval_count(self.name(), &self.count)?;
        let input = input.into_sequence()?;
        let info = input.info().clone();
        let items = input.into_items().into_iter().skip(n).collect();
        Ok(StreamedData::Sequence(StreamedSequence::new(items, info)?))
    }

    fn transform_expressions(&mut self, f: &mut dyn FnMut(Expr) -> Expr) {
        self.count = f(self.count.clone());
    }

    fn clone_with(&self, ctx: &mut CloneContext) -> Box<dyn ResultOperator> {
        Box::new(SkipResultOperator {
            count: ctx.replace(&self.count),
        })
    }
}

impl fmt::Display for SkipResultOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Skip({})", self.count)
    }
}
