//! Attribute value types.
//!
//! `FieldValue` is the dynamically-typed value an entity attribute can hold.
//! Besides scalars and lists it carries the three *live* forms the link
//! engine works with: a resolved [`Entity`], a raw [`EntitySet`], and a
//! resolved [`SubsetView`]. Live forms compare by shared allocation, not by
//! content; edge-triggered change detection depends on that.
//!
//! Serialization always reduces live forms to identifier form: an entity
//! becomes its id, a set or view becomes its ordered id list.

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::entity::Entity;
use crate::link::SubsetView;
use crate::set::EntitySet;

/// Possible values an entity attribute can hold.
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Absent / null.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// String scalar. Non-empty strings classify as single references.
    Str(String),
    /// Ordered list. Classifies as a collection reference.
    List(Vec<FieldValue>),
    /// A live entity. Classifies as a single reference.
    Entity(Entity),
    /// A live entity set. Classifies as a collection reference.
    Set(EntitySet),
    /// A live subset view owned by a link. Classifies as a collection
    /// reference.
    View(SubsetView),
    /// Arbitrary structured JSON. Never classifies as a reference.
    Structured(serde_json::Value),
}

impl FieldValue {
    /// Returns true for the null value.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for a boolean.
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    /// Returns true for an integer.
    #[must_use]
    pub const fn is_int(&self) -> bool {
        matches!(self, Self::Int(_))
    }

    /// Returns true for a float.
    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    /// Returns true for a string.
    #[must_use]
    pub const fn is_str(&self) -> bool {
        matches!(self, Self::Str(_))
    }

    /// Returns true for a list.
    #[must_use]
    pub const fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    /// Returns true for a live entity.
    #[must_use]
    pub const fn is_entity(&self) -> bool {
        matches!(self, Self::Entity(_))
    }

    /// Returns true for a live entity set.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// Returns true for a live subset view.
    #[must_use]
    pub const fn is_view(&self) -> bool {
        matches!(self, Self::View(_))
    }

    /// Reads a boolean.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Reads an integer.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Reads a float. Integers widen.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Reads a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Reads the list items.
    #[must_use]
    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            Self::List(v) => Some(v),
            _ => None,
        }
    }

    /// Reads the live entity.
    #[must_use]
    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Entity(v) => Some(v),
            _ => None,
        }
    }

    /// Reads the live entity set.
    #[must_use]
    pub fn as_set(&self) -> Option<&EntitySet> {
        match self {
            Self::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Reads the live subset view.
    #[must_use]
    pub fn as_view(&self) -> Option<&SubsetView> {
        match self {
            Self::View(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Entity(_) => "entity",
            Self::Set(_) => "set",
            Self::View(_) => "view",
            Self::Structured(_) => "structured",
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Null
    }
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            // Live forms compare by identity, never by content.
            (Self::Entity(a), Self::Entity(b)) => Entity::ptr_eq(a, b),
            (Self::Set(a), Self::Set(b)) => EntitySet::ptr_eq(a, b),
            (Self::View(a), Self::View(b)) => SubsetView::ptr_eq(a, b),
            (Self::Structured(a), Self::Structured(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::List(v) => write!(f, "list[{}]", v.len()),
            Self::Entity(v) => write!(f, "entity:{}", v.id()),
            Self::Set(v) => write!(f, "set[{}]", v.len()),
            Self::View(v) => write!(f, "view[{}]", v.len()),
            Self::Structured(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(v) => serializer.serialize_bool(*v),
            Self::Int(v) => serializer.serialize_i64(*v),
            Self::Float(v) => serializer.serialize_f64(*v),
            Self::Str(v) => serializer.serialize_str(v),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Entity(e) => serializer.serialize_str(e.id().as_str()),
            Self::Set(s) => {
                let ids = s.ids();
                let mut seq = serializer.serialize_seq(Some(ids.len()))?;
                for id in &ids {
                    seq.serialize_element(id)?;
                }
                seq.end()
            }
            Self::View(v) => {
                let ids = v.ids();
                let mut seq = serializer.serialize_seq(Some(ids.len()))?;
                for id in &ids {
                    seq.serialize_element(id)?;
                }
                seq.end()
            }
            Self::Structured(v) => v.serialize(serializer),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(v: Vec<FieldValue>) -> Self {
        Self::List(v)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(v: Vec<&str>) -> Self {
        Self::List(v.into_iter().map(FieldValue::from).collect())
    }
}

impl From<Entity> for FieldValue {
    fn from(v: Entity) -> Self {
        Self::Entity(v)
    }
}

impl From<&Entity> for FieldValue {
    fn from(v: &Entity) -> Self {
        Self::Entity(v.clone())
    }
}

impl From<EntitySet> for FieldValue {
    fn from(v: EntitySet) -> Self {
        Self::Set(v)
    }
}

impl From<SubsetView> for FieldValue {
    fn from(v: SubsetView) -> Self {
        Self::View(v)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else {
                    Self::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Self::Str(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(FieldValue::from).collect())
            }
            serde_json::Value::Object(_) => Self::Structured(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;

    #[test]
    fn test_scalar_accessors() {
        assert!(FieldValue::Null.is_null());
        assert_eq!(FieldValue::Bool(true).as_bool(), Some(true));
        assert_eq!(FieldValue::Int(42).as_int(), Some(42));
        assert_eq!(FieldValue::Int(42).as_float(), Some(42.0));
        assert_eq!(FieldValue::from("hi").as_str(), Some("hi"));
        assert_eq!(FieldValue::Null.type_name(), "null");
        assert_eq!(FieldValue::from("x").type_name(), "str");
    }

    #[test]
    fn test_entity_equality_is_identity() {
        let a = Entity::new("1");
        let b = Entity::new("1");
        assert_eq!(FieldValue::from(&a), FieldValue::from(&a));
        assert_ne!(FieldValue::from(&a), FieldValue::from(&b));
    }

    #[test]
    fn test_set_equality_is_identity() {
        let a = EntitySet::new();
        let b = EntitySet::new();
        assert_eq!(FieldValue::Set(a.clone()), FieldValue::Set(a.clone()));
        assert_ne!(FieldValue::Set(a), FieldValue::Set(b));
    }

    #[test]
    fn test_list_equality_is_structural() {
        let a: FieldValue = vec!["x", "y"].into();
        let b: FieldValue = vec!["x", "y"].into();
        assert_eq!(a, b);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", FieldValue::Null), "null");
        assert_eq!(format!("{}", FieldValue::Int(3)), "3");
        assert_eq!(format!("{}", FieldValue::from("hi")), "\"hi\"");
        let e = Entity::new("7");
        assert_eq!(format!("{}", FieldValue::from(&e)), "entity:7");
    }

    #[test]
    fn test_serialize_reduces_live_forms_to_ids() {
        let e = Entity::new("2");
        let json = serde_json::to_value(FieldValue::from(&e)).unwrap();
        assert_eq!(json, serde_json::json!("2"));

        let set = EntitySet::new();
        set.add(&Entity::new("a"));
        set.add(&Entity::new("b"));
        let json = serde_json::to_value(FieldValue::Set(set)).unwrap();
        assert_eq!(json, serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_serialize_scalars() {
        assert_eq!(
            serde_json::to_value(FieldValue::Null).unwrap(),
            serde_json::Value::Null
        );
        assert_eq!(
            serde_json::to_value(FieldValue::Int(9)).unwrap(),
            serde_json::json!(9)
        );
        let list: FieldValue = vec!["a", "b"].into();
        assert_eq!(serde_json::to_value(list).unwrap(), serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_from_json_value() {
        let v = FieldValue::from(serde_json::json!(["a", 1, null]));
        let items = v.as_list().unwrap();
        assert_eq!(items[0].as_str(), Some("a"));
        assert_eq!(items[1].as_int(), Some(1));
        assert!(items[2].is_null());

        let obj = FieldValue::from(serde_json::json!({"k": "v"}));
        assert_eq!(obj.type_name(), "structured");
    }

    #[test]
    fn test_entity_id_serializes_inside_lists() {
        let id = EntityId::new("z");
        assert_eq!(serde_json::to_value(&id).unwrap(), serde_json::json!("z"));
    }
}
