//! Entity types and identity.
//!
//! An [`Entity`] is a cheaply cloneable handle over shared state: a stable
//! [`EntityId`], a map of named fields, and an event subject. Field writes
//! are change-detected; a write that stores an equal value emits nothing.
//! The field-change notification for an attribute fires before the generic
//! change notification, so attribute-scoped handlers may themselves write
//! fields and still appear to observers as a single mutation.
//!
//! Entities also carry two pieces of link machinery: the per-attribute link
//! registry (see [`crate::registry`]) and the back-reference side channel —
//! the set of single-kind links currently resolving *to* this entity.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::link::core::{LinkCore, LinkId, ReferenceLink};
use crate::notify::{HandlerId, Subject};
use crate::registry::LinkRegistry;
use crate::value::FieldValue;

/// Stable entity identifier in string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mints a fresh random identifier (a v4 UUID string).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty identifier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Notifications emitted by an [`Entity`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityEvent {
    /// A named field changed value.
    FieldChanged {
        /// The field that changed.
        attribute: String,
    },
    /// Some field changed; fires after the matching [`EntityEvent::FieldChanged`].
    Changed,
    /// The entity was destroyed.
    Destroyed,
    /// A link was created at an attribute.
    Linked {
        /// The linked attribute.
        attribute: String,
    },
    /// A link was removed from an attribute.
    Unlinked {
        /// The unlinked attribute.
        attribute: String,
    },
}

pub(crate) struct EntityInner {
    id: EntityId,
    fields: RefCell<BTreeMap<String, FieldValue>>,
    subject: Subject<EntityEvent>,
    links: RefCell<LinkRegistry>,
    inbound: RefCell<Vec<(LinkId, Weak<LinkCore>)>>,
}

/// A cheaply cloneable handle to one observable entity.
#[derive(Clone)]
pub struct Entity {
    inner: Rc<EntityInner>,
}

impl Entity {
    /// Creates an entity with the given id and no fields.
    #[must_use]
    pub fn new(id: impl Into<EntityId>) -> Self {
        Self {
            inner: Rc::new(EntityInner {
                id: id.into(),
                fields: RefCell::new(BTreeMap::new()),
                subject: Subject::new(),
                links: RefCell::new(LinkRegistry::new()),
                inbound: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Creates an entity with the given id and initial fields.
    #[must_use]
    pub fn with_fields<K, V, I>(id: impl Into<EntityId>, fields: I) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let entity = Self::new(id);
        {
            let mut map = entity.inner.fields.borrow_mut();
            for (k, v) in fields {
                map.insert(k.into(), v.into());
            }
        }
        entity
    }

    /// The stable identifier.
    #[must_use]
    pub fn id(&self) -> &EntityId {
        &self.inner.id
    }

    /// Reads a field. Absent fields read as [`FieldValue::Null`].
    #[must_use]
    pub fn get(&self, attribute: &str) -> FieldValue {
        self.inner
            .fields
            .borrow()
            .get(attribute)
            .cloned()
            .unwrap_or(FieldValue::Null)
    }

    /// Writes a field, notifying only when the stored value actually changes.
    pub fn set(&self, attribute: impl Into<String>, value: impl Into<FieldValue>) {
        let attribute = attribute.into();
        let value = value.into();
        let changed = {
            let mut fields = self.inner.fields.borrow_mut();
            match fields.get(&attribute) {
                Some(existing) if *existing == value => false,
                _ => {
                    fields.insert(attribute.clone(), value);
                    true
                }
            }
        };
        if changed {
            self.inner
                .subject
                .emit(&EntityEvent::FieldChanged { attribute });
            self.inner.subject.emit(&EntityEvent::Changed);
        }
    }

    /// Names of all stored fields.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.inner.fields.borrow().keys().cloned().collect()
    }

    /// Registers an event handler.
    pub fn subscribe<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&EntityEvent) + 'static,
    {
        self.inner.subject.subscribe(handler)
    }

    /// Removes an event handler.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.inner.subject.unsubscribe(id)
    }

    /// Destroys the entity: emits [`EntityEvent::Destroyed`] (detaching any
    /// attached links, which restore their raw values first) and discards
    /// the link registry.
    pub fn destroy(&self) {
        self.inner.subject.emit(&EntityEvent::Destroyed);
        self.unlink_all();
    }

    /// The single-kind links currently resolving to this entity.
    ///
    /// Dead registrations are pruned on read.
    #[must_use]
    pub fn inbound_links(&self) -> Vec<ReferenceLink> {
        let mut inbound = self.inner.inbound.borrow_mut();
        inbound.retain(|(_, weak)| weak.strong_count() > 0);
        inbound
            .iter()
            .filter_map(|(_, weak)| weak.upgrade())
            .map(ReferenceLink::from_core)
            .collect()
    }

    /// True if both handles refer to the same entity allocation.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    pub(crate) fn emit_event(&self, event: &EntityEvent) {
        self.inner.subject.emit(event);
    }

    pub(crate) fn downgrade(&self) -> WeakEntity {
        WeakEntity(Rc::downgrade(&self.inner))
    }

    pub(crate) fn with_registry<T>(&self, f: impl FnOnce(&mut LinkRegistry) -> T) -> T {
        f(&mut self.inner.links.borrow_mut())
    }

    pub(crate) fn add_inbound(&self, id: LinkId, link: Weak<LinkCore>) {
        let mut inbound = self.inner.inbound.borrow_mut();
        if !inbound.iter().any(|(existing, _)| *existing == id) {
            inbound.push((id, link));
        }
    }

    pub(crate) fn remove_inbound(&self, id: LinkId) {
        self.inner
            .inbound
            .borrow_mut()
            .retain(|(existing, _)| *existing != id);
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.inner.id)
            .field("fields", &self.inner.fields.borrow().len())
            .finish()
    }
}

/// A non-owning entity handle; links hold their owner this way.
#[derive(Debug, Clone)]
pub(crate) struct WeakEntity(Weak<EntityInner>);

impl WeakEntity {
    pub(crate) fn upgrade(&self) -> Option<Entity> {
        self.0.upgrade().map(|inner| Entity { inner })
    }
}
