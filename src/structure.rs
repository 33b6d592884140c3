//! Builds a [`QueryModel`] from a chain of query operator calls.
//!
//! `$.where(x => x.v > 1).group_by(x => x.c, x => x.v).count()` is unwound
//! into its root (`$`) and its calls, innermost first. Each call gets a
//! [`MethodCallParseInfo`] and is applied to the model being built; lambda
//! arguments are resolved against the current item expression so the model
//! only holds resolved expressions.

use tracing::debug;

use crate::{
    ast::{Expr, ExprKind, Lambda, Method, MethodCallParseInfo, QueryMethod},
    clauses::{BodyClause, MainFromClause, Ordering, QueryModel, SelectClause},
    error::{QueryError, Result},
    resolve::resolve_lambda,
    result_operators::{
        CountResultOperator, DistinctResultOperator, FirstResultOperator, GroupResultOperator,
        SkipResultOperator, TakeResultOperator,
    },
};

#[derive(Debug, Default)]
pub struct QueryParser {
    generated: usize,
}

/// One unwound call: operator, arguments and the node itself.
struct Call<'a> {
    method: QueryMethod,
    source: &'a Expr,
    args: &'a [Expr],
    node: &'a Expr,
}

impl QueryParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, chain: &Expr) -> Result<QueryModel> {
        let (root, calls) = unwind(chain);

        let main_name = match calls.first() {
            Some(call) => self.identifier_for(call.args),
            None => self.generate_identifier(),
        };
        let mut model = QueryModel::new(MainFromClause::new(main_name, root.clone())?);
        let mut item = Expr::source_ref(model.main_from().source());

        for call in &calls {
            let info = MethodCallParseInfo::new(self.identifier_for(call.args), call.source.clone(), call.node.clone());
            debug!(
                method = %call.method,
                identifier = info.associated_identifier(),
                "applying query operator"
            );
            item = apply(&mut model, call.method, call.args, &info, item)?;
        }
        Ok(model)
    }

    /// The name of the first lambda argument's parameter, or a generated one.
    fn identifier_for(&mut self, args: &[Expr]) -> String {
        let named = args
            .iter()
            .find_map(|a| a.as_lambda())
            .and_then(|l| l.params().first())
            .map(|p| p.name().to_string());
        named.unwrap_or_else(|| self.generate_identifier())
    }

    fn generate_identifier(&mut self) -> String {
        let name = format!("<generated>_{}", self.generated);
        self.generated += 1;
        name
    }
}

/// Splits a call chain into its root and its calls, innermost first.
fn unwind(chain: &Expr) -> (&Expr, Vec<Call<'_>>) {
    let mut calls = Vec::new();
    let mut current = chain;
    while let ExprKind::MethodCall {
        object: Some(source),
        method: Method::Query(method),
        args,
    } = current.kind()
    {
        calls.push(Call {
            method: *method,
            source,
            args,
            node: current,
        });
        current = source;
    }
    calls.reverse();
    (current, calls)
}

fn lambda_arg<'a>(method: QueryMethod, args: &'a [Expr], index: usize) -> Result<&'a Lambda> {
    args.get(index)
        .and_then(|a| a.as_lambda())
        .ok_or_else(|| QueryError::InvalidArgument(format!(".{}() argument {} must be a lambda", method, index + 1)))
}

fn expect_arity(method: QueryMethod, args: &[Expr], allowed: &[usize]) -> Result<()> {
    if allowed.contains(&args.len()) {
        Ok(())
    } else {
        Err(QueryError::InvalidArgument(format!(
            ".{}() does not take {} argument(s)",
            method,
            args.len()
        )))
    }
}

/// Applies one call to `model`; returns the new current item expression.
fn apply(
    model: &mut QueryModel,
    method: QueryMethod,
    args: &[Expr],
    info: &MethodCallParseInfo,
    item: Expr,
) -> Result<Expr> {
    let clause_allowed = model.result_operators().is_empty();
    match method {
        QueryMethod::Where | QueryMethod::Select | QueryMethod::OrderBy | QueryMethod::OrderByDescending
            if !clause_allowed =>
        {
            Err(QueryError::Unsupported(format!(
                ".{}() after a result operator requires a subquery",
                method
            )))
        }
        QueryMethod::Where => {
            expect_arity(method, args, &[1])?;
            let predicate = resolve_lambda(lambda_arg(method, args, 0)?, &item)?;
            model.add_body_clause(BodyClause::where_clause(predicate)?);
            Ok(item)
        }
        QueryMethod::OrderBy | QueryMethod::OrderByDescending => {
            expect_arity(method, args, &[1])?;
            let key = resolve_lambda(lambda_arg(method, args, 0)?, &item)?;
            model.add_body_clause(BodyClause::OrderBy(vec![Ordering {
                expr: key,
                descending: method == QueryMethod::OrderByDescending,
            }]));
            Ok(item)
        }
        QueryMethod::Select => {
            expect_arity(method, args, &[1])?;
            let selector = resolve_lambda(lambda_arg(method, args, 0)?, &item)?;
            model.set_select(SelectClause::new(selector.clone()));
            Ok(selector)
        }
        QueryMethod::GroupBy => {
            expect_arity(method, args, &[1, 2])?;
            let key = resolve_lambda(lambda_arg(method, args, 0)?, &item)?;
            let element = match args.len() {
                2 => resolve_lambda(lambda_arg(method, args, 1)?, &item)?,
                _ => item,
            };
            let group = GroupResultOperator::new(info.associated_identifier(), key, element);
            let next = Expr::source_ref(&group.source());
            model.add_result_operator(Box::new(group));
            Ok(next)
        }
        QueryMethod::Distinct => {
            expect_arity(method, args, &[0])?;
            model.add_result_operator(Box::new(DistinctResultOperator));
            Ok(item)
        }
        QueryMethod::Take | QueryMethod::Skip => {
            expect_arity(method, args, &[1])?;
            let count = args[0].clone();
            if method == QueryMethod::Take {
                model.add_result_operator(Box::new(TakeResultOperator::new(count)?));
            } else {
                model.add_result_operator(Box::new(SkipResultOperator::new(count)?));
            }
            Ok(item)
        }
        QueryMethod::Count => {
            expect_arity(method, args, &[0])?;
            model.add_result_operator(Box::new(CountResultOperator));
            Ok(item)
        }
        QueryMethod::First | QueryMethod::FirstOrDefault => {
            expect_arity(method, args, &[0])?;
            model.add_result_operator(Box::new(FirstResultOperator::new(
                method == QueryMethod::FirstOrDefault,
            )));
            Ok(item)
        }
    }
}
