//! Data flowing between the stages of an in-memory execution, and the static
//! description of that data.

use std::fmt;

use crate::{
    ast::Expr,
    error::{QueryError, Result},
    types::Type,
    value::{Value, type_name},
};

/// Static shape of a stage's output.
#[derive(Debug, Clone)]
pub enum StreamedDataInfo {
    Sequence(StreamedSequenceInfo),
    Value(StreamedValueInfo),
}

impl StreamedDataInfo {
    pub fn data_type(&self) -> &Type {
        match self {
            StreamedDataInfo::Sequence(info) => info.data_type(),
            StreamedDataInfo::Value(info) => info.data_type(),
        }
    }

    pub fn as_sequence(&self) -> Option<&StreamedSequenceInfo> {
        match self {
            StreamedDataInfo::Sequence(info) => Some(info),
            StreamedDataInfo::Value(_) => None,
        }
    }
}

/// A sequence of items, each described symbolically by `item_expression`.
#[derive(Debug, Clone)]
pub struct StreamedSequenceInfo {
    data_type: Type,
    item_expression: Expr,
}

impl StreamedSequenceInfo {
    /// `data_type` must be a sequence type whose item type can hold values of
    /// the item expression's type.
    pub fn new(data_type: Type, item_expression: Expr) -> Result<Self> {
        let Some(item) = data_type.item_type() else {
            return Err(QueryError::type_mismatch(
                "streamed sequence",
                "sequence",
                &data_type,
            ));
        };
        if !item.is_assignable_from(item_expression.ty()) {
            return Err(QueryError::type_mismatch(
                format!("item expression '{}'", item_expression),
                item,
                item_expression.ty(),
            ));
        }
        Ok(StreamedSequenceInfo {
            data_type,
            item_expression,
        })
    }

    pub fn data_type(&self) -> &Type {
        &self.data_type
    }

    pub fn item_type(&self) -> &Type {
        // Checked to be a sequence on construction.
        self.data_type.item_type().unwrap_or(&Type::Any)
    }

    pub fn item_expression(&self) -> &Expr {
        &self.item_expression
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreamedValueInfo {
    data_type: Type,
}

impl StreamedValueInfo {
    pub fn new(data_type: Type) -> Self {
        StreamedValueInfo { data_type }
    }

    pub fn data_type(&self) -> &Type {
        &self.data_type
    }
}

/// Runtime output of a stage.
#[derive(Debug, Clone)]
pub enum StreamedData {
    Sequence(StreamedSequence),
    Value(StreamedValue),
}

impl StreamedData {
    pub fn info(&self) -> StreamedDataInfo {
        match self {
            StreamedData::Sequence(seq) => StreamedDataInfo::Sequence(seq.info.clone()),
            StreamedData::Value(value) => StreamedDataInfo::Value(value.info.clone()),
        }
    }

    pub fn into_sequence(self) -> Result<StreamedSequence> {
        match self {
            StreamedData::Sequence(seq) => Ok(seq),
            StreamedData::Value(value) => Err(QueryError::type_mismatch(
                "streamed data",
                "sequence",
                value.info.data_type(),
            )),
        }
    }

    /// Flattens the output into a single value; sequences become arrays.
    pub fn into_value(self) -> Value {
        match self {
            StreamedData::Sequence(seq) => Value::Array(seq.items),
            StreamedData::Value(value) => value.value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StreamedSequence {
    items: Vec<Value>,
    info: StreamedSequenceInfo,
}

impl StreamedSequence {
    /// Fails with `TypeMismatch` if an item does not conform to the declared
    /// item type.
    pub fn new(items: Vec<Value>, info: StreamedSequenceInfo) -> Result<Self> {
        if let Some(bad) = items.iter().find(|v| !info.item_type().accepts(v)) {
            return Err(QueryError::type_mismatch(
                "sequence item",
                info.item_type(),
                type_name(bad),
            ));
        }
        Ok(StreamedSequence { items, info })
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    pub fn info(&self) -> &StreamedSequenceInfo {
        &self.info
    }
}

#[derive(Debug, Clone)]
pub struct StreamedValue {
    value: Value,
    info: StreamedValueInfo,
}

impl StreamedValue {
    pub fn new(value: Value, info: StreamedValueInfo) -> Result<Self> {
        if !info.data_type().accepts(&value) {
            return Err(QueryError::type_mismatch(
                "streamed value",
                info.data_type(),
                type_name(&value),
            ));
        }
        Ok(StreamedValue { value, info })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn info(&self) -> &StreamedValueInfo {
        &self.info
    }
}

impl fmt::Display for StreamedDataInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamedDataInfo::Sequence(info) => {
                write!(f, "{} of {}", info.data_type, info.item_expression)
            }
            StreamedDataInfo::Value(info) => write!(f, "{}", info.data_type),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::QuerySource;

    #[test]
    fn items_must_conform() {
        let s = QuerySource::new("s", Type::Int);
        let info = StreamedSequenceInfo::new(Type::sequence(Type::Int), Expr::source_ref(&s)).unwrap();
        let err = StreamedSequence::new(vec![Value::Integer(1), Value::String("x".into())], info)
            .unwrap_err();
        assert!(matches!(err, QueryError::TypeMismatch { .. }));
    }

    #[test]
    fn info_requires_sequence_type() {
        let s = QuerySource::new("s", Type::Int);
        assert!(StreamedSequenceInfo::new(Type::Int, Expr::source_ref(&s)).is_err());
    }
}
