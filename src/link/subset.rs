//! Ordered filtered projection of a source set.
//!
//! A `SubsetView` is owned by one collection-kind link. It contains the
//! subset of the source's entities whose ids are in the link's raw value,
//! in raw-value order. Consumers may mutate the view directly; the owning
//! link observes those mutations and folds them back into the raw value.
//!
//! Ordering contract: a member sorts at the index of its id within the
//! order list the link pushes here. An id not in the list sorts to the
//! front until the view is anchored (the link's first valid state) and to
//! the back afterwards; this gives stable append behavior only once initial
//! population races are over.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::entity::{Entity, EntityId};
use crate::notify::HandlerId;
use crate::set::{EntitySet, SetEvent, SetOptions};

#[derive(Debug)]
struct SubsetInner {
    backing: EntitySet,
    order: RefCell<Vec<EntityId>>,
    anchored: Cell<bool>,
}

/// A cheaply cloneable handle to one link-owned subset view.
#[derive(Clone)]
pub struct SubsetView {
    inner: Rc<SubsetInner>,
}

impl SubsetView {
    pub(crate) fn new(backing: EntitySet) -> Self {
        Self {
            inner: Rc::new(SubsetInner {
                backing,
                order: RefCell::new(Vec::new()),
                anchored: Cell::new(false),
            }),
        }
    }

    /// Number of member entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.backing.len()
    }

    /// True when the view has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.backing.is_empty()
    }

    /// Looks up a member by id.
    #[must_use]
    pub fn get(&self, id: &EntityId) -> Option<Entity> {
        self.inner.backing.get(id)
    }

    /// True if an entity with this id is a member.
    #[must_use]
    pub fn contains_id(&self, id: &EntityId) -> bool {
        self.inner.backing.contains_id(id)
    }

    /// Index of the member with this id.
    #[must_use]
    pub fn position(&self, id: &EntityId) -> Option<usize> {
        self.inner.backing.position(id)
    }

    /// Snapshot of the members in order.
    #[must_use]
    pub fn entities(&self) -> Vec<Entity> {
        self.inner.backing.entities()
    }

    /// Snapshot of the member ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.inner.backing.ids()
    }

    /// Adds an entity at its ordering position. Returns false if the id is
    /// already a member.
    pub fn add(&self, entity: &Entity) -> bool {
        self.add_with(entity, SetOptions::default())
    }

    /// Adds an entity at its ordering position, with explicit options.
    pub fn add_with(&self, entity: &Entity, options: SetOptions) -> bool {
        let index = self.insertion_index(entity.id());
        self.inner.backing.insert_at(index, entity, options)
    }

    /// Removes the member with this id, returning it.
    pub fn remove(&self, id: &EntityId) -> Option<Entity> {
        self.remove_with(id, SetOptions::default())
    }

    /// Removes the member with this id, with explicit options.
    pub fn remove_with(&self, id: &EntityId, options: SetOptions) -> Option<Entity> {
        self.inner.backing.remove_with(id, options)
    }

    /// Replaces the whole membership, re-sorted per the ordering contract,
    /// emitting a single reset notification.
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
        let mut target: Vec<Entity> = Vec::new();
        for entity in entities {
            if !target.iter().any(|e| e.id() == entity.id()) {
                target.push(entity);
            }
        }
        self.sort_in_place(&mut target);
        self.inner.backing.reset_with(target, options);
    }

    /// Registers a membership handler.
    pub fn subscribe<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&SetEvent) + 'static,
    {
        self.inner.backing.subscribe(handler)
    }

    /// Removes a membership handler.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.inner.backing.unsubscribe(id)
    }

    /// True if both handles refer to the same view allocation.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Replaces membership diff-wise to exactly `target`, ordered per the
    /// ordering contract, one notification per changed entity.
    pub(crate) fn sync(&self, target: &[Entity], options: SetOptions) {
        let mut ordered = target.to_vec();
        self.sort_in_place(&mut ordered);
        self.inner.backing.sync_with(&ordered, options);
    }

    /// Empties the view; called on link reset/detach so consumers holding
    /// the handle observe a deterministic empty set.
    pub(crate) fn clear_all(&self, options: SetOptions) {
        self.inner.backing.reset_with(Vec::new(), options);
    }

    /// Replaces the order list and stably re-sorts current members to it.
    /// Re-sorting emits nothing; membership is unchanged.
    pub(crate) fn set_order(&self, ids: Vec<EntityId>) {
        *self.inner.order.borrow_mut() = ids;
        let order = self.inner.order.borrow();
        let anchored = self.inner.anchored.get();
        self.inner
            .backing
            .reorder_by(|e| Self::sort_key(&order, anchored, e.id()));
    }

    pub(crate) fn mark_anchored(&self) {
        self.inner.anchored.set(true);
    }

    #[cfg(test)]
    pub(crate) fn is_anchored(&self) -> bool {
        self.inner.anchored.get()
    }

    fn sort_key(order: &[EntityId], anchored: bool, id: &EntityId) -> i64 {
        match order.iter().position(|o| o == id) {
            Some(index) => index as i64,
            None if anchored => i64::MAX,
            None => -1,
        }
    }

    fn insertion_index(&self, id: &EntityId) -> usize {
        let order = self.inner.order.borrow();
        let anchored = self.inner.anchored.get();
        let key = Self::sort_key(&order, anchored, id);
        let members = self.inner.backing.entities();
        members
            .iter()
            .position(|m| Self::sort_key(&order, anchored, m.id()) > key)
            .unwrap_or(members.len())
    }

    fn sort_in_place(&self, entities: &mut [Entity]) {
        let order = self.inner.order.borrow();
        let anchored = self.inner.anchored.get();
        entities.sort_by_key(|e| Self::sort_key(&order, anchored, e.id()));
    }
}

impl PartialEq for SubsetView {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl fmt::Debug for SubsetView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubsetView")
            .field("len", &self.len())
            .field("anchored", &self.inner.anchored.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EntityId {
        EntityId::new(s)
    }

    fn ids_of(view: &SubsetView) -> Vec<String> {
        view.ids().into_iter().map(String::from).collect()
    }

    fn view_with_order(ids: &[&str]) -> SubsetView {
        let view = SubsetView::new(EntitySet::new());
        view.set_order(ids.iter().map(|s| EntityId::from(*s)).collect());
        view
    }

    #[test]
    fn test_known_ids_sort_by_order_index() {
        let view = view_with_order(&["a", "b", "c"]);
        view.add(&Entity::new("c"));
        view.add(&Entity::new("a"));
        view.add(&Entity::new("b"));
        assert_eq!(ids_of(&view), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unknown_ids_sort_front_until_anchored() {
        let view = view_with_order(&["a", "b"]);
        view.add(&Entity::new("a"));
        view.add(&Entity::new("mystery"));
        assert_eq!(ids_of(&view), vec!["mystery", "a"]);
    }

    #[test]
    fn test_unknown_ids_append_after_anchor() {
        let view = view_with_order(&["a", "b"]);
        view.add(&Entity::new("a"));
        view.add(&Entity::new("b"));
        view.mark_anchored();
        view.add(&Entity::new("late"));
        assert_eq!(ids_of(&view), vec!["a", "b", "late"]);
    }

    #[test]
    fn test_set_order_resorts_members() {
        let view = view_with_order(&["a", "b"]);
        view.add(&Entity::new("a"));
        view.add(&Entity::new("x"));
        assert_eq!(ids_of(&view), vec!["x", "a"]);

        view.set_order(vec![id("a"), id("b"), id("x")]);
        assert_eq!(ids_of(&view), vec!["a", "x"]);
    }

    #[test]
    fn test_add_dedups_by_id() {
        let view = view_with_order(&["a"]);
        assert!(view.add(&Entity::new("a")));
        assert!(!view.add(&Entity::new("a")));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_sync_orders_and_diffs() {
        let a = Entity::new("a");
        let b = Entity::new("b");
        let c = Entity::new("c");
        let view = view_with_order(&["a", "b", "c"]);
        view.add(&a);
        view.add(&c);

        view.sync(&[c.clone(), b.clone()], SetOptions::bypass());
        assert_eq!(ids_of(&view), vec!["b", "c"]);
        assert!(view.get(&id("a")).is_none());
    }

    #[test]
    fn test_reset_resorts() {
        let view = view_with_order(&["x", "y"]);
        view.reset([Entity::new("y"), Entity::new("x")]);
        assert_eq!(ids_of(&view), vec!["x", "y"]);
    }

    #[test]
    fn test_clear_all_empties() {
        let view = view_with_order(&["a"]);
        view.add(&Entity::new("a"));
        view.clear_all(SetOptions::bypass());
        assert!(view.is_empty());
    }

    #[test]
    fn test_identity() {
        let view = SubsetView::new(EntitySet::new());
        assert_eq!(view, view.clone());
        assert_ne!(view, SubsetView::new(EntitySet::new()));
    }
}
