//! The canonical identifier form of a linked attribute.
//!
//! `RawValue` is what a linked attribute stores at rest and what detach
//! writes back: null, a single id, or an ordered list of distinct ids. Its
//! shape is consistent with [`LinkKind`] by construction.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId};
use crate::link::kind::LinkKind;
use crate::value::FieldValue;

/// The identifier-only form of a linked attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// No reference.
    #[default]
    Null,
    /// A single identifier.
    Single(EntityId),
    /// An ordered list of distinct identifiers.
    Many(Vec<EntityId>),
}

impl RawValue {
    /// The kind this raw value's shape corresponds to.
    #[must_use]
    pub const fn kind(&self) -> LinkKind {
        match self {
            Self::Null => LinkKind::None,
            Self::Single(_) => LinkKind::Single,
            Self::Many(_) => LinkKind::Collection,
        }
    }

    /// True for the null raw value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Membership test against the identifier(s).
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        match self {
            Self::Null => false,
            Self::Single(own) => own == id,
            Self::Many(ids) => ids.contains(id),
        }
    }

    /// The identifiers in order (empty for null).
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        match self {
            Self::Null => Vec::new(),
            Self::Single(id) => vec![id.clone()],
            Self::Many(ids) => ids.clone(),
        }
    }

    /// Renders the raw value as an attribute value, for write-back and
    /// serialization.
    #[must_use]
    pub fn as_field_value(&self) -> FieldValue {
        match self {
            Self::Null => FieldValue::Null,
            Self::Single(id) => FieldValue::Str(id.as_str().to_string()),
            Self::Many(ids) => FieldValue::List(
                ids.iter()
                    .map(|id| FieldValue::Str(id.as_str().to_string()))
                    .collect(),
            ),
        }
    }
}

/// Normalizes list items into distinct non-empty ids, first occurrence
/// winning. Entities reduce to their id; anything that is neither an entity
/// nor a non-empty string is dropped.
pub(crate) fn ids_from_items(items: &[FieldValue]) -> Vec<EntityId> {
    let mut ids = Vec::new();
    for item in items {
        let id = match item {
            FieldValue::Entity(e) => Some(e.id().clone()),
            FieldValue::Str(s) if !s.is_empty() => Some(EntityId::new(s.clone())),
            _ => None,
        };
        if let Some(id) = id {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

/// Reduces entities to distinct ids, order preserved.
pub(crate) fn ids_from_entities(entities: &[Entity]) -> Vec<EntityId> {
    let mut ids = Vec::new();
    for entity in entities {
        let id = entity.id().clone();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Order-preserving union: everything from `first`, then whatever `second`
/// adds, each side deduplicated.
pub(crate) fn union_ids(first: &[EntityId], second: &[EntityId]) -> Vec<EntityId> {
    let mut ids = Vec::with_capacity(first.len() + second.len());
    for id in first.iter().chain(second) {
        if !ids.contains(id) {
            ids.push(id.clone());
        }
    }
    ids
}
