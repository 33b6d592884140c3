//! The query model: a main from clause, body clauses, a select clause and
//! result operators.
//!
//! Clause expressions are kept in resolved form. `from s in $ where s.v > 1
//! select s.c` holds the predicate `([s].v > 1)` and the selector `[s].c`,
//! both referring to the main from clause's source `s`.

use std::fmt;

use tracing::debug;

use crate::{
    ast::{Expr, QuerySource},
    clone::CloneContext,
    error::{QueryError, Result},
    result_operators::ResultOperator,
    streamed::{StreamedDataInfo, StreamedSequenceInfo},
    types::Type,
};

/// Introduces the items of a sequence under a name.
#[derive(Debug, Clone)]
pub struct MainFromClause {
    source: QuerySource,
    from_expression: Expr,
}

impl MainFromClause {
    /// `from_expression` must be sequence-typed (or `any`, in which case the
    /// items are `any` too).
    pub fn new(item_name: impl Into<String>, from_expression: Expr) -> Result<Self> {
        let item_type = match from_expression.ty() {
            Type::Any => Type::Any,
            ty => ty.item_type().cloned().ok_or_else(|| {
                QueryError::type_mismatch("from clause", "sequence", ty)
            })?,
        };
        Ok(MainFromClause {
            source: QuerySource::new(item_name, item_type),
            from_expression,
        })
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }

    pub fn item_name(&self) -> &str {
        self.source.item_name()
    }

    pub fn from_expression(&self) -> &Expr {
        &self.from_expression
    }
}

/// One key of an `order by` clause.
#[derive(Debug, Clone)]
pub struct Ordering {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub enum BodyClause {
    /// Keeps the items for which the predicate holds
    Where(Expr),
    /// Sorts by the keys, first key most significant
    OrderBy(Vec<Ordering>),
}

impl BodyClause {
    pub fn where_clause(predicate: Expr) -> Result<Self> {
        if !Type::Bool.is_assignable_from(predicate.ty()) {
            return Err(QueryError::type_mismatch("where predicate", Type::Bool, predicate.ty()));
        }
        Ok(BodyClause::Where(predicate))
    }

    fn transform(&mut self, f: &mut dyn FnMut(Expr) -> Expr) {
        match self {
            BodyClause::Where(predicate) => *predicate = f(predicate.clone()),
            BodyClause::OrderBy(orderings) => {
                for ordering in orderings {
                    ordering.expr = f(ordering.expr.clone());
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectClause {
    selector: Expr,
}

impl SelectClause {
    pub fn new(selector: Expr) -> Self {
        SelectClause { selector }
    }

    pub fn selector(&self) -> &Expr {
        &self.selector
    }

    /// Shape of the projected sequence, before any result operator.
    pub fn output_data_info(&self) -> Result<StreamedSequenceInfo> {
        StreamedSequenceInfo::new(Type::sequence(self.selector.ty().clone()), self.selector.clone())
    }
}

#[derive(Debug)]
pub struct QueryModel {
    main_from: MainFromClause,
    body_clauses: Vec<BodyClause>,
    select: SelectClause,
    result_operators: Vec<Box<dyn ResultOperator>>,
}

impl QueryModel {
    /// A model selecting the items of `main_from` unchanged.
    pub fn new(main_from: MainFromClause) -> Self {
        let select = SelectClause::new(Expr::source_ref(main_from.source()));
        QueryModel {
            main_from,
            body_clauses: Vec::new(),
            select,
            result_operators: Vec::new(),
        }
    }

    pub fn main_from(&self) -> &MainFromClause {
        &self.main_from
    }

    pub fn body_clauses(&self) -> &[BodyClause] {
        &self.body_clauses
    }

    pub fn select(&self) -> &SelectClause {
        &self.select
    }

    pub fn result_operators(&self) -> &[Box<dyn ResultOperator>] {
        &self.result_operators
    }

    pub fn add_body_clause(&mut self, clause: BodyClause) {
        self.body_clauses.push(clause);
    }

    pub fn set_select(&mut self, select: SelectClause) {
        self.select = select;
    }

    pub fn add_result_operator(&mut self, operator: Box<dyn ResultOperator>) {
        self.result_operators.push(operator);
    }

    /// Applies `f` to every expression of every clause and operator.
    pub fn transform_expressions(&mut self, f: &mut dyn FnMut(Expr) -> Expr) {
        self.main_from.from_expression = f(self.main_from.from_expression.clone());
        for clause in &mut self.body_clauses {
            clause.transform(f);
        }
        self.select.selector = f(self.select.selector.clone());
        for operator in &mut self.result_operators {
            operator.transform_expressions(f);
        }
    }

    /// Deep copy with fresh query sources.
    ///
    /// References to a source of this model are remapped to its clone in the
    /// copy; the mappings are left in `ctx` for the caller.
    pub fn clone_with(&self, ctx: &mut CloneContext) -> QueryModel {
        let source = self.main_from.source();
        let from_expression = ctx.replace(&self.main_from.from_expression);
        let main_from = MainFromClause {
            source: QuerySource::new(source.item_name(), source.item_type().clone()),
            from_expression,
        };
        ctx.add_mapping(source, main_from.source.clone());

        let body_clauses = self
            .body_clauses
            .iter()
            .map(|clause| {
                let mut clause = clause.clone();
                clause.transform(&mut |e| ctx.replace(&e));
                clause
            })
            .collect();
        let select = SelectClause::new(ctx.replace(&self.select.selector));
        let result_operators = self
            .result_operators
            .iter()
            .map(|op| op.clone_with(ctx))
            .collect();

        debug!(from = %source, to = %main_from.source, "cloned query model");
        QueryModel {
            main_from,
            body_clauses,
            select,
            result_operators,
        }
    }

    pub fn clone_model(&self) -> QueryModel {
        self.clone_with(&mut CloneContext::new())
    }

    /// Shape of the final result: the select clause's output folded through
    /// every result operator.
    pub fn output_data_info(&self) -> Result<StreamedDataInfo> {
        let mut info = StreamedDataInfo::Sequence(self.select.output_data_info()?);
        for operator in &self.result_operators {
            info = operator.output_data_info(&info)?;
        }
        Ok(info)
    }
}

impl fmt::Display for QueryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "from {} {} in {}",
            self.main_from.source.item_type(),
            self.main_from.item_name(),
            self.main_from.from_expression
        )?;
        for clause in &self.body_clauses {
            match clause {
                BodyClause::Where(predicate) => write!(f, " where {}", predicate)?,
                BodyClause::OrderBy(orderings) => {
                    let keys: Vec<String> = orderings
                        .iter()
                        .map(|o| {
                            if o.descending {
                                format!("{} desc", o.expr)
                            } else {
                                format!("{} asc", o.expr)
                            }
                        })
                        .collect();
                    write!(f, " orderby {}", keys.join(", "))?;
                }
            }
        }
        write!(f, " select {}", self.select.selector)?;
        for operator in &self.result_operators {
            write!(f, " => {}", operator)?;
        }
        Ok(())
    }
}
