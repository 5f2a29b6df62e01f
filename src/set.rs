//! Observable ordered entity sets.
//!
//! An [`EntitySet`] keeps entities in insertion order, deduplicated by id,
//! and notifies subscribers about membership changes. Every mutation takes
//! [`SetOptions`]; the `bypass_links` flag is how the link engine opts its
//! own bulk writes out of link reaction while ordinary consumer mutations
//! still reconcile.
//!
//! Reads return snapshots, so handlers running during a notification may
//! freely mutate the set they are observing.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::entity::{Entity, EntityId};
use crate::notify::{HandlerId, Subject};

/// Options attached to every set mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// When true, link machinery ignores the resulting notifications.
    pub bypass_links: bool,
}

impl SetOptions {
    /// Options with `bypass_links` set.
    #[must_use]
    pub const fn bypass() -> Self {
        Self { bypass_links: true }
    }
}

/// Membership notifications emitted by an [`EntitySet`].
#[derive(Debug, Clone)]
pub enum SetEvent {
    /// An entity joined the set.
    Added {
        /// The entity that joined.
        entity: Entity,
        /// Options of the mutation that caused this.
        options: SetOptions,
    },
    /// An entity left the set.
    Removed {
        /// The entity that left.
        entity: Entity,
        /// Options of the mutation that caused this.
        options: SetOptions,
    },
    /// The whole membership was replaced at once.
    Reset {
        /// Options of the mutation that caused this.
        options: SetOptions,
    },
}

/// Factory producing the backing set for a subset view.
pub type SetFactory = Rc<dyn Fn() -> EntitySet>;

#[derive(Debug)]
struct SetInner {
    entries: RefCell<Vec<Entity>>,
    subject: Subject<SetEvent>,
}

/// A cheaply cloneable handle to one observable ordered set of entities.
#[derive(Clone)]
pub struct EntitySet {
    inner: Rc<SetInner>,
}

impl EntitySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(SetInner {
                entries: RefCell::new(Vec::new()),
                subject: Subject::new(),
            }),
        }
    }

    /// Creates a set from entities, deduplicated by id, order preserved.
    #[must_use]
    pub fn from_entities<I>(entities: I) -> Self
    where
        I: IntoIterator<Item = Entity>,
    {
        let set = Self::new();
        {
            let mut entries = set.inner.entries.borrow_mut();
            for entity in entities {
                if !entries.iter().any(|e| e.id() == entity.id()) {
                    entries.push(entity);
                }
            }
        }
        set
    }

    /// Number of member entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    /// True when the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    /// Looks up a member by id.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<Entity> {
        self.inner
            .entries
            .borrow()
            .iter()
            .find(|e| e.id() == id)
            .cloned()
    }

    /// True if an entity with this id is a member.
    #[must_use]
    pub fn contains_id(&self, id: &EntityId) -> bool {
        self.inner.entries.borrow().iter().any(|e| e.id() == id)
    }

    /// Index of the member with this id.
    #[must_use]
    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.inner.entries.borrow().iter().position(|e| e.id() == id)
    }

    /// Snapshot of the members in order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.inner.entries.borrow().clone()
    }

    /// Snapshot of the member ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.inner
            .entries
            .borrow()
            .iter()
            .map(|e| e.id().clone())
            .collect()
    }

    /// Appends an entity. Returns false if the id is already a member.
    pub fn add(&self, entity: &Entity) -> bool {
        self.add_with(entity, SetOptions::default())
    }

    /// Appends an entity with explicit options.
    pub fn add_with(&self, entity: &Entity, options: SetOptions) -> bool {
        let len = self.len();
        self.insert_at(len, entity, options)
    }

    /// Inserts an entity at an index (clamped to the current length).
    /// Returns false if the id is already a member.
    pub fn insert_at(&self, index: usize, entity: &Entity, options: SetOptions) -> bool {
        {
            let mut entries = self.inner.entries.borrow_mut();
            if entries.iter().any(|e| e.id() == entity.id()) {
                return false;
            }
            let index = index.min(entries.len());
            entries.insert(index, entity.clone());
        }
        self.inner.subject.emit(&SetEvent::Added {
            entity: entity.clone(),
            options,
        });
        true
    }

    /// Removes the member with this id, returning it.
    pub fn remove(&self, id: &EntityId) -> Option<Entity> {
        self.remove_with(id, SetOptions::default())
    }

    /// Removes the member with this id, with explicit options.
    pub fn remove_with(&self, id: &EntityId, options: SetOptions) -> Option<Entity> {
        let removed = {
            let mut entries = self.inner.entries.borrow_mut();
            entries
                .iter()
                .position(|e| e.id() == id)
                .map(|index| entries.remove(index))
        };
        if let Some(entity) = &removed {
            self.inner.subject.emit(&SetEvent::Removed {
                entity: entity.clone(),
                options,
            });
        }
        removed
    }

    /// Replaces the whole membership, emitting a single reset notification.
    pub fn reset<I>(&self, entities: I)
    where
        I: IntoIterator<Item = Entity>,
    {
        self.reset_with(entities, SetOptions::default());
    }

    /// Replaces the whole membership with explicit options.
    pub fn reset_with<I>(&self, entities: I, options: SetOptions)
    where
        I: IntoIterator<Item = Entity>,
    {
        {
            let mut entries = self.inner.entries.borrow_mut();
            entries.clear();
            for entity in entities {
                if !entries.iter().any(|e| e.id() == entity.id()) {
                    entries.push(entity);
                }
            }
        }
        self.inner.subject.emit(&SetEvent::Reset { options });
    }

    /// Replaces membership diff-wise: members absent from `target` are
    /// removed, missing ones added, and the final order is exactly
    /// `target`'s order. Emits one notification per added/removed entity.
    pub(crate) fn sync_with(&self, target: &[Entity], options: SetOptions) {
        let removed: Vec<Entity> = {
            let entries = self.inner.entries.borrow();
            entries
                .iter()
                .filter(|e| !target.iter().any(|t| t.id() == e.id()))
                .cloned()
                .collect()
        };
        let added: Vec<Entity> = {
            let entries = self.inner.entries.borrow();
            target
                .iter()
                .filter(|t| !entries.iter().any(|e| e.id() == t.id()))
                .cloned()
                .collect()
        };
        {
            let mut entries = self.inner.entries.borrow_mut();
            entries.clear();
            for entity in target {
                if !entries.iter().any(|e| e.id() == entity.id()) {
                    entries.push(entity.clone());
                }
            }
        }
        for entity in removed {
            self.inner.subject.emit(&SetEvent::Removed { entity, options });
        }
        for entity in added {
            self.inner.subject.emit(&SetEvent::Added { entity, options });
        }
    }

    /// Stably re-sorts the members by a key, without notifications.
    pub(crate) fn reorder_by<F>(&self, mut key: F)
    where
        F: FnMut(&Entity) -> i64,
    {
        self.inner.entries.borrow_mut().sort_by_key(|e| key(e));
    }

    /// Registers a membership handler.
    pub fn subscribe<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&SetEvent) + 'static,
    {
        self.inner.subject.subscribe(handler)
    }

    /// Removes a membership handler.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.inner.subject.unsubscribe(id)
    }

    /// True if both handles refer to the same set allocation.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }
}

impl Default for EntitySet {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for EntitySet {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl fmt::Debug for EntitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntitySet")
            .field("len", &self.len())
            .finish()
    }
}
