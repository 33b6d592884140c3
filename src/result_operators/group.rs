use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    ast::{Expr, QuerySource, SourceId},
    clone::CloneContext,
    error::{QueryError, Result},
    resolve::reverse_resolve,
    result_operators::{ResultOperator, require_sequence},
    streamed::{StreamedData, StreamedDataInfo, StreamedSequence, StreamedSequenceInfo},
    types::Type,
    value::{GroupKey, Value},
};

/// Groups the input by a key, collecting one projected element per item.
///
/// The output is a sequence of `grouping<K, E>`, where `K` and `E` are the
/// types of the key and element selectors. The operator is itself the query
/// source of its output items; later clauses refer to a group through it.
///
/// # Examples
///
/// ```
/// use qmodel_ir::ast::{Expr, QuerySource};
/// use qmodel_ir::result_operators::{GroupResultOperator, ResultOperator};
/// use qmodel_ir::types::{ObjectType, Type};
///
/// let item = ObjectType::named("Row", vec![("v".into(), Type::Int), ("c".into(), Type::String)]);
/// let s = QuerySource::new("s", Type::Object(item.clone()));
/// let c = item.member("c").unwrap().clone();
/// let v = item.member("v").unwrap().clone();
///
/// let group = GroupResultOperator::new(
///     "g",
///     Expr::member_access(Expr::source_ref(&s), c).unwrap(),
///     Expr::member_access(Expr::source_ref(&s), v).unwrap(),
/// );
/// assert_eq!(group.item_type().to_string(), "grouping<string, int>");
/// assert_eq!(group.to_string(), "GroupBy([s].c, [s].v)");
/// ```
#[derive(Debug, Clone)]
pub struct GroupResultOperator {
    item_name: String,
    source_id: SourceId,
    key_selector: Expr,
    element_selector: Expr,
}

impl GroupResultOperator {
    pub fn new(item_name: impl Into<String>, key_selector: Expr, element_selector: Expr) -> Self {
        GroupResultOperator {
            item_name: item_name.into(),
            source_id: SourceId::fresh(),
            key_selector,
            element_selector,
        }
    }

    pub fn item_name(&self) -> &str {
        &self.item_name
    }

    pub fn key_selector(&self) -> &Expr {
        &self.key_selector
    }

    pub fn element_selector(&self) -> &Expr {
        &self.element_selector
    }

    pub fn item_type(&self) -> Type {
        Type::grouping(
            self.key_selector.ty().clone(),
            self.element_selector.ty().clone(),
        )
    }

    /// The query source standing for one output group.
    pub fn source(&self) -> QuerySource {
        QuerySource::with_id(self.source_id, self.item_name.clone(), self.item_type())
    }

    fn output_info(&self) -> Result<StreamedSequenceInfo> {
        StreamedSequenceInfo::new(
            Type::sequence(self.item_type()),
            Expr::source_ref(&self.source()),
        )
    }
}

impl ResultOperator for GroupResultOperator {
    fn name(&self) -> &'static str {
        "group_by"
    }

    fn output_data_info(&self, input: &StreamedDataInfo) -> Result<StreamedDataInfo> {
        require_sequence(self, input)?;
        Ok(StreamedDataInfo::Sequence(self.output_info()?))
    }

    fn execute_in_memory(&self, input: StreamedData) -> Result<StreamedData> {
        let input = input.into_sequence()?;
        let info = input.info();
        if info.item_type() != info.item_expression().ty() {
            return Err(QueryError::type_mismatch(
                format!("{} item expression '{}'", self.name(), info.item_expression()),
                info.item_type(),
                info.item_expression().ty(),
            ));
        }

        let key = reverse_resolve(info.item_expression(), &self.key_selector)?.compile()?;
        let element = reverse_resolve(info.item_expression(), &self.element_selector)?.compile()?;

        let mut groups: IndexMap<GroupKey, Vec<Value>> = IndexMap::new();
        for item in input.items() {
            let k = key.invoke(std::slice::from_ref(item))?;
            let e = element.invoke(std::slice::from_ref(item))?;
            groups.entry(GroupKey(k)).or_default().push(e);
        }
        debug!(operator = %self, items = input.items().len(), groups = groups.len(), "grouped in memory");

        let items = groups
            .into_iter()
            .map(|(key, elements)| Value::Grouping {
                key: Box::new(key.0),
                elements,
            })
            .collect();
        Ok(StreamedData::Sequence(StreamedSequence::new(
            items,
            self.output_info()?,
        )?))
    }

    fn transform_expressions(&mut self, f: &mut dyn FnMut(Expr) -> Expr) {
        self.key_selector = f(self.key_selector.clone());
        self.element_selector = f(self.element_selector.clone());
    }

    fn clone_with(&self, ctx: &mut CloneContext) -> Box<dyn ResultOperator> {
        let clone = GroupResultOperator {
            item_name: self.item_name.clone(),
            source_id: SourceId::fresh(),
            key_selector: ctx.replace(&self.key_selector),
            element_selector: ctx.replace(&self.element_selector),
        };
        ctx.add_mapping(&self.source(), clone.source());
        Box::new(clone)
    }

    fn as_query_source(&self) -> Option<QuerySource> {
        Some(self.source())
    }
}

impl fmt::Display for GroupResultOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupBy({}, {})", self.key_selector, self.element_selector)
    }
}
