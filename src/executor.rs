use std::cmp;

use tracing::{debug, trace};

use crate::{
    clauses::{BodyClause, QueryModel},
    ast::Expr,
    error::{QueryError, Result},
    evaluator::Evaluator,
    resolve::reverse_resolve,
    streamed::{StreamedData, StreamedSequence, StreamedSequenceInfo},
    types::Type,
    value::{Value, type_name},
};

/// Back end consuming a query model.
pub trait QueryExecutor {
    fn execute(&self, model: &QueryModel) -> Result<StreamedData>;
}

/// Runs a query model directly over in-memory values.
///
/// Clause expressions are turned back into lambdas over the current item
/// with [`reverse_resolve`] and evaluated by the [`Evaluator`].
#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryExecutor;

impl InMemoryExecutor {
    pub fn new() -> Self {
        InMemoryExecutor
    }
}

impl QueryExecutor for InMemoryExecutor {
    fn execute(&self, model: &QueryModel) -> Result<StreamedData> {
        let source = model.main_from().source();
        let items = match Evaluator::eval_closed(model.main_from().from_expression())? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(QueryError::type_mismatch(
                    "from clause",
                    "sequence",
                    type_name(&other),
                ));
            }
        };
        let item_expression = Expr::source_ref(source);
        let mut items = items;
        debug!(source = %source, items = items.len(), "executing query model");

        for clause in model.body_clauses() {
            items = match clause {
                BodyClause::Where(predicate) => filter(&item_expression, predicate, items)?,
                BodyClause::OrderBy(orderings) => {
                    let keys: Vec<(&Expr, bool)> =
                        orderings.iter().map(|o| (&o.expr, o.descending)).collect();
                    sort(&item_expression, &keys, items)?
                }
            };
            trace!(items = items.len(), "applied body clause");
        }

        let selector = model.select().selector();
        let projection = reverse_resolve(&item_expression, selector)?.compile()?;
        let projected = items
            .iter()
            .map(|item| projection.invoke(std::slice::from_ref(item)))
            .collect::<Result<Vec<_>>>()?;

        let info = StreamedSequenceInfo::new(Type::sequence(selector.ty().clone()), selector.clone())?;
        let mut data = StreamedData::Sequence(StreamedSequence::new(projected, info)?);
        for operator in model.result_operators() {
            debug!(operator = %operator, "executing result operator");
            data = operator.execute_in_memory(data)?;
        }
        Ok(data)
    }
}

fn filter(item_expression: &Expr, predicate: &Expr, items: Vec<Value>) -> Result<Vec<Value>> {
    let predicate = reverse_resolve(item_expression, predicate)?.compile()?;
    let mut kept = Vec::with_capacity(items.len());
    for item in items {
        if predicate.invoke(std::slice::from_ref(&item))?.as_bool() {
            kept.push(item);
        }
    }
    Ok(kept)
}

fn sort(item_expression: &Expr, keys: &[(&Expr, bool)], items: Vec<Value>) -> Result<Vec<Value>> {
    let selectors = keys
        .iter()
        .map(|(expr, descending)| Ok((reverse_resolve(item_expression, expr)?.compile()?, *descending)))
        .collect::<Result<Vec<_>>>()?;

    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        let mut values = Vec::with_capacity(selectors.len());
        for (selector, _) in &selectors {
            values.push(selector.invoke(std::slice::from_ref(&item))?);
        }
        keyed.push((values, item));
    }

    let mut incomparable = None;
    keyed.sort_by(|(a, _), (b, _)| {
        for (i, (selector, descending)) in selectors.iter().enumerate() {
            match a[i].compare(&b[i]) {
                Some(cmp::Ordering::Equal) => continue,
                Some(ordering) if *descending => return ordering.reverse(),
                Some(ordering) => return ordering,
                None => {
                    incomparable.get_or_insert_with(|| {
                        format!(
                            "order key '{}' yields incomparable values {} and {}",
                            selector.lambda(),
                            a[i],
                            b[i]
                        )
                    });
                    return cmp::Ordering::Equal;
                }
            }
        }
        cmp::Ordering::Equal
    });
    if let Some(message) = incomparable {
        return Err(QueryError::evaluation(message));
    }
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}
