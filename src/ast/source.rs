use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::Type;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a query source. Unique per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub fn fresh() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A named, typed origin of the items flowing through a query.
///
/// Sources are identified by [`SourceId`], never by name: two sources may
/// share an item name and still be different sources. Cloning a
/// `QuerySource` keeps its identity.
#[derive(Clone)]
pub struct QuerySource(Arc<SourceData>);

#[derive(Debug)]
struct SourceData {
    id: SourceId,
    item_name: String,
    item_type: Type,
}

impl QuerySource {
    /// Creates a source with a fresh identity.
    pub fn new(item_name: impl Into<String>, item_type: Type) -> Self {
        Self::with_id(SourceId::fresh(), item_name, item_type)
    }

    /// Describes an existing source identity, e.g. a result operator whose
    /// item type follows its selectors.
    pub fn with_id(id: SourceId, item_name: impl Into<String>, item_type: Type) -> Self {
        QuerySource(Arc::new(SourceData {
            id,
            item_name: item_name.into(),
            item_type,
        }))
    }

    pub fn id(&self) -> SourceId {
        self.0.id
    }

    /// Name used for diagnostics only.
    pub fn item_name(&self) -> &str {
        &self.0.item_name
    }

    pub fn item_type(&self) -> &Type {
        &self.0.item_type
    }
}

impl PartialEq for QuerySource {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for QuerySource {}

impl Hash for QuerySource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySource")
            .field("id", &self.0.id)
            .field("item_name", &self.0.item_name)
            .field("item_type", &self.0.item_type.to_string())
            .finish()
    }
}

impl fmt::Display for QuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.item_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_with_same_name_are_distinct() {
        let a = QuerySource::new("s", Type::Int);
        let b = QuerySource::new("s", Type::Int);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
