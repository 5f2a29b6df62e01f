//! Classification of attribute values into reference kinds.

use serde::{Deserialize, Serialize};

use crate::value::FieldValue;

/// The reference kind a raw attribute value classifies as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// Not a reference: null, empty string, numbers, booleans, structured
    /// data.
    #[default]
    None,
    /// A single reference: a live entity or a non-empty id string.
    Single,
    /// A collection reference: a list, a live entity set, or a subset view.
    Collection,
}

impl LinkKind {
    /// Classifies an attribute value. Pure and infallible.
    #[must_use]
    pub fn classify(value: &FieldValue) -> Self {
        match value {
            FieldValue::List(_) | FieldValue::Set(_) | FieldValue::View(_) => Self::Collection,
            FieldValue::Entity(_) => Self::Single,
            FieldValue::Str(s) if !s.is_empty() => Self::Single,
            _ => Self::None,
        }
    }

    /// Returns true for the none kind.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns true for the single kind.
    #[must_use]
    pub const fn is_single(&self) -> bool {
        matches!(self, Self::Single)
    }

    /// Returns true for the collection kind.
    #[must_use]
    pub const fn is_collection(&self) -> bool {
        matches!(self, Self::Collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Entity;
    use crate::link::subset::SubsetView;
    use crate::set::EntitySet;

    #[test]
    fn test_none_kinds() {
        assert_eq!(LinkKind::classify(&FieldValue::Null), LinkKind::None);
        assert_eq!(LinkKind::classify(&FieldValue::from("")), LinkKind::None);
        assert_eq!(LinkKind::classify(&FieldValue::Int(3)), LinkKind::None);
        assert_eq!(LinkKind::classify(&FieldValue::Float(0.5)), LinkKind::None);
        assert_eq!(LinkKind::classify(&FieldValue::Bool(true)), LinkKind::None);
        assert_eq!(
            LinkKind::classify(&FieldValue::Structured(serde_json::json!({"a": 1}))),
            LinkKind::None
        );
    }

    #[test]
    fn test_single_kinds() {
        assert_eq!(LinkKind::classify(&FieldValue::from("7")), LinkKind::Single);
        let entity = Entity::new("7");
        assert_eq!(
            LinkKind::classify(&FieldValue::from(&entity)),
            LinkKind::Single
        );
    }

    #[test]
    fn test_collection_kinds() {
        let list: FieldValue = vec!["a", "b"].into();
        assert_eq!(LinkKind::classify(&list), LinkKind::Collection);
        assert_eq!(
            LinkKind::classify(&FieldValue::List(Vec::new())),
            LinkKind::Collection
        );
        assert_eq!(
            LinkKind::classify(&FieldValue::Set(EntitySet::new())),
            LinkKind::Collection
        );
        let view = SubsetView::new(EntitySet::new());
        assert_eq!(
            LinkKind::classify(&FieldValue::View(view)),
            LinkKind::Collection
        );
    }

    #[test]
    fn test_predicates() {
        assert!(LinkKind::None.is_none());
        assert!(LinkKind::Single.is_single());
        assert!(LinkKind::Collection.is_collection());
        assert!(!LinkKind::Single.is_none());
    }
}
