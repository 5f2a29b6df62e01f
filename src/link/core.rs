//! The link orchestrator.
//!
//! A [`ReferenceLink`] ties one (owner, attribute, source) triple together.
//! While attached it rewrites the owner's attribute into resolved form (a
//! live entity or a subset view) and keeps it reconciled against the source
//! set; on detach it writes the raw identifier form back, leaving the owner
//! coherent and link-free.
//!
//! Reconciliation runs in `update()` passes. A pass re-reads the attribute,
//! classifies it, dispatches to the single resolver or the subset
//! reconciler, and finally announces `Validity`/`Changed` notifications —
//! edge-triggered against the previously announced values, so observers
//! never see a no-op change. Two guards keep the pass from feeding itself:
//! a per-link re-entrancy flag for `update()`, and a write flag that stops
//! the engine's own attribute writes from re-triggering classification
//! (a waiting single reference writes null without becoming a null link).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::{Entity, EntityEvent, EntityId, WeakEntity};
use crate::link::kind::LinkKind;
use crate::link::raw::{self, RawValue};
use crate::link::resolver;
use crate::link::subset::SubsetView;
use crate::notify::{HandlerId, Subject, SubscriptionLedger};
use crate::set::{EntitySet, SetEvent, SetFactory, SetOptions};
use crate::value::FieldValue;

/// Unique identifier for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(Uuid);

impl LinkId {
    /// Creates a new random link id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

/// Construction options for a link.
#[derive(Clone, Default)]
pub struct LinkOptions {
    /// Factory building the subset view's backing set. Defaults to
    /// [`EntitySet::new`].
    pub collection_factory: Option<SetFactory>,
}

impl fmt::Debug for LinkOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkOptions")
            .field(
                "collection_factory",
                &self.collection_factory.as_ref().map(|_| "<factory>"),
            )
            .finish()
    }
}

/// Notifications emitted by a [`ReferenceLink`].
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// The link attached to its owner.
    Attached,
    /// The link detached; the owner holds the raw value again.
    Detached,
    /// A reconciliation pass started.
    Updated,
    /// Validity changed. True iff every identifier resolves to a present
    /// entity.
    Validity(bool),
    /// The resolved value changed.
    Changed {
        /// The newly resolved value.
        current: FieldValue,
        /// The previously announced value.
        previous: FieldValue,
    },
}

pub(crate) struct LinkCore {
    id: LinkId,
    owner: WeakEntity,
    attribute: String,
    source: EntitySet,
    options: LinkOptions,
    subject: Subject<LinkEvent>,
    active: Cell<bool>,
    updating: Cell<bool>,
    writing: Cell<bool>,
    first_pass: Cell<bool>,
    valid: Cell<bool>,
    raw: RefCell<RawValue>,
    resolved: RefCell<FieldValue>,
    announced_valid: Cell<Option<bool>>,
    announced_resolved: RefCell<FieldValue>,
    subset: RefCell<Option<SubsetView>>,
    target: RefCell<Option<Entity>>,
    pass_subs: SubscriptionLedger,
    state_subs: SubscriptionLedger,
    owner_subs: SubscriptionLedger,
    arrivals: RefCell<Vec<Box<dyn FnOnce(FieldValue)>>>,
}

impl LinkCore {
    fn new(owner: &Entity, attribute: String, source: EntitySet, options: LinkOptions) -> Rc<Self> {
        Rc::new(Self {
            id: LinkId::new(),
            owner: owner.downgrade(),
            attribute,
            source,
            options,
            subject: Subject::new(),
            active: Cell::new(false),
            updating: Cell::new(false),
            writing: Cell::new(false),
            first_pass: Cell::new(true),
            valid: Cell::new(false),
            raw: RefCell::new(RawValue::Null),
            resolved: RefCell::new(FieldValue::Null),
            announced_valid: Cell::new(None),
            announced_resolved: RefCell::new(FieldValue::Null),
            subset: RefCell::new(None),
            target: RefCell::new(None),
            pass_subs: SubscriptionLedger::new(),
            state_subs: SubscriptionLedger::new(),
            owner_subs: SubscriptionLedger::new(),
            arrivals: RefCell::new(Vec::new()),
        })
    }

    fn kind(&self) -> LinkKind {
        self.raw.borrow().kind()
    }

    pub(crate) fn pass_subs(&self) -> &SubscriptionLedger {
        &self.pass_subs
    }

    pub(crate) fn source(&self) -> &EntitySet {
        &self.source
    }

    /// Attaches the link: resets to the baseline, runs the first pass, and
    /// wires the owner's field-change and destroy notifications.
    pub(crate) fn attach(self: &Rc<Self>) {
        self.detach();
        self.full_reset(false);
        self.active.set(true);
        self.update();

        if let Some(owner) = self.owner.upgrade() {
            let weak = Rc::downgrade(self);
            let attribute = self.attribute.clone();
            let handle = owner.subscribe(move |event| {
                let Some(core) = weak.upgrade() else { return };
                match event {
                    EntityEvent::FieldChanged { attribute: changed } if *changed == attribute => {
                        if !core.writing.get() {
                            core.update();
                        }
                    }
                    EntityEvent::Destroyed => core.detach(),
                    _ => {}
                }
            });
            let unsub = owner.clone();
            self.owner_subs.record(move || {
                unsub.unsubscribe(handle);
            });
        }

        self.subject.emit(&LinkEvent::Attached);
    }

    /// Detaches the link, writing the raw value back onto the owner. The
    /// only path that converts the resolved form back to the raw form.
    pub(crate) fn detach(&self) {
        if !self.active.get() {
            return;
        }

        let raw = self.raw.borrow().clone();

        self.full_reset(false);
        self.flush_changes();

        self.active.set(false);
        self.owner_subs.release_all();

        if let Some(owner) = self.owner.upgrade() {
            owner.set(self.attribute.clone(), raw.as_field_value());
        }

        self.subject.emit(&LinkEvent::Detached);
    }

    /// Runs one reconciliation pass. Re-entrant calls are ignored.
    pub(crate) fn update(self: &Rc<Self>) {
        if !self.active.get() || self.updating.get() {
            return;
        }
        self.updating.set(true);

        self.subject.emit(&LinkEvent::Updated);
        self.pass_subs.release_all();

        let Some(owner) = self.owner.upgrade() else {
            self.updating.set(false);
            return;
        };
        let value = owner.get(&self.attribute);
        let kind = LinkKind::classify(&value);

        if kind != self.kind() {
            self.reclassify_reset();

            // Bulk source replacement invalidates any resolution, so every
            // non-null kind re-runs the pass on reset.
            if kind != LinkKind::None {
                let weak = Rc::downgrade(self);
                let handle = self.source.subscribe(move |event| {
                    if matches!(event, SetEvent::Reset { .. }) {
                        if let Some(core) = weak.upgrade() {
                            core.update();
                        }
                    }
                });
                let unsub = self.source.clone();
                self.state_subs.record(move || {
                    unsub.unsubscribe(handle);
                });
            }
        }

        match kind {
            LinkKind::None => {
                self.set_raw(RawValue::Null);
                self.set_valid(true);
                self.set_resolved(FieldValue::Null, true);
            }
            LinkKind::Single => {
                let id = match &value {
                    FieldValue::Entity(e) => Some(e.id().clone()),
                    FieldValue::Str(s) if !s.is_empty() => Some(EntityId::new(s.clone())),
                    _ => None,
                };
                if let Some(id) = id {
                    self.set_raw(RawValue::Single(id.clone()));
                    resolver::resolve_single(self, id);
                }
            }
            LinkKind::Collection => self.update_collection(&value),
        }

        self.flush_changes();
        self.first_pass.set(false);
        self.updating.set(false);
    }

    fn update_collection(self: &Rc<Self>, value: &FieldValue) {
        let existing = self.subset.borrow().clone();

        let ids = match value {
            FieldValue::View(view)
                if existing
                    .as_ref()
                    .is_some_and(|own| SubsetView::ptr_eq(own, view)) =>
            {
                // The owner handed our own view back; the raw value is
                // already authoritative, only membership needs refreshing.
                self.raw.borrow().ids()
            }
            FieldValue::View(view) => raw::ids_from_entities(&view.entities()),
            FieldValue::Set(set) => raw::ids_from_entities(&set.entities()),
            FieldValue::List(items) => raw::ids_from_items(items),
            _ => Vec::new(),
        };

        self.set_raw(RawValue::Many(ids.clone()));

        // Absent entities are omitted, not errored; they arrive through the
        // membership bridge.
        let present: Vec<Entity> = ids.iter().filter_map(|id| self.source.get(id)).collect();

        let view = if let Some(view) = existing {
            view.sync(&present, SetOptions::bypass());
            view
        } else {
            let backing = match &self.options.collection_factory {
                Some(factory) => factory(),
                None => EntitySet::new(),
            };
            let view = SubsetView::new(backing);
            view.set_order(ids);
            for entity in &present {
                view.add_with(entity, SetOptions::bypass());
            }
            *self.subset.borrow_mut() = Some(view.clone());
            self.wire_collection(&view);
            view
        };

        self.merge_from_subset(None);
        self.set_resolved(FieldValue::View(view), true);
    }

    fn wire_collection(self: &Rc<Self>, view: &SubsetView) {
        // Membership bridge: a source arrival is admitted iff its id is in
        // the current raw value; a source removal always evicts.
        let weak = Rc::downgrade(self);
        let bridge = view.clone();
        let handle = self.source.subscribe(move |event| {
            let Some(core) = weak.upgrade() else { return };
            match event {
                SetEvent::Added { entity, .. } => {
                    let admit = core.raw.borrow().contains(entity.id());
                    if admit {
                        bridge.add(entity);
                    }
                }
                SetEvent::Removed { entity, .. } => {
                    bridge.remove(entity.id());
                }
                SetEvent::Reset { .. } => {}
            }
        });
        let unsub = self.source.clone();
        self.state_subs.record(move || {
            unsub.unsubscribe(handle);
        });

        // View watchers: fold direct mutations back into the raw value,
        // unless the mutation carries the bypass flag (our own bulk sync).
        let weak = Rc::downgrade(self);
        let handle = view.subscribe(move |event| {
            let Some(core) = weak.upgrade() else { return };
            match event {
                SetEvent::Added { options, .. } | SetEvent::Reset { options } => {
                    if !options.bypass_links {
                        core.merge_from_subset(None);
                        core.flush_changes();
                    }
                }
                SetEvent::Removed { entity, options } => {
                    if !options.bypass_links {
                        core.merge_from_subset(Some(entity.id().clone()));
                        core.flush_changes();
                    }
                }
            }
        });
        let unsub = view.clone();
        self.state_subs.record(move || {
            unsub.unsubscribe(handle);
        });
    }

    /// Folds the view's membership back into the raw value.
    ///
    /// Until the link has survived its first pass and become valid, the new
    /// raw value is the union of the previous raw value and the view's id
    /// list: identifiers that have not arrived yet must not be lost to
    /// unrelated view mutations. An id explicitly removed in this pass is
    /// subtracted after the union, so removal wins over re-admission.
    fn merge_from_subset(&self, removed: Option<EntityId>) {
        let view = self.subset.borrow().clone();
        let Some(view) = view else { return };

        let mut ids = view.ids();
        if self.first_pass.get() || !self.valid.get() {
            ids = raw::union_ids(&self.raw.borrow().ids(), &ids);
            if let Some(removed) = &removed {
                ids.retain(|id| id != removed);
            }
        }

        let valid = ids.iter().all(|id| view.get(id).is_some());
        self.set_raw(RawValue::Many(ids));
        self.set_valid(valid);
        if valid {
            view.mark_anchored();
        }
    }

    fn set_raw(&self, value: RawValue) {
        let ids = value.ids();
        *self.raw.borrow_mut() = value;
        let view = self.subset.borrow().clone();
        if let Some(view) = view {
            view.set_order(ids);
        }
    }

    pub(crate) fn set_valid(&self, valid: bool) {
        self.valid.set(valid);
    }

    pub(crate) fn set_resolved(&self, value: FieldValue, write: bool) {
        *self.resolved.borrow_mut() = value;
        if write {
            self.write_resolved();
        }
    }

    fn write_resolved(&self) {
        if !self.active.get() {
            return;
        }
        let Some(owner) = self.owner.upgrade() else {
            return;
        };
        let value = self.resolved.borrow().clone();
        self.writing.set(true);
        owner.set(self.attribute.clone(), value);
        self.writing.set(false);
    }

    /// Announces `Validity`/`Changed` for whatever differs from the
    /// previously announced state. Validity first, then the value; arrival
    /// callbacks drain right after a transition to valid.
    pub(crate) fn flush_changes(&self) {
        if !self.active.get() {
            return;
        }

        let valid = self.valid.get();
        if self.announced_valid.get() != Some(valid) {
            self.announced_valid.set(Some(valid));
            self.subject.emit(&LinkEvent::Validity(valid));
            if valid {
                let callbacks: Vec<Box<dyn FnOnce(FieldValue)>> =
                    self.arrivals.borrow_mut().drain(..).collect();
                if !callbacks.is_empty() {
                    let resolved = self.resolved.borrow().clone();
                    for callback in callbacks {
                        callback(resolved.clone());
                    }
                }
            }
        }

        let current = self.resolved.borrow().clone();
        let previous = self.announced_resolved.borrow().clone();
        if current != previous {
            *self.announced_resolved.borrow_mut() = current.clone();
            self.subject.emit(&LinkEvent::Changed { current, previous });
        }
    }

    /// Swaps the resolved single entity, maintaining both entities'
    /// back-reference channels.
    pub(crate) fn set_target(self: &Rc<Self>, entity: Option<Entity>) {
        let previous = self.target.borrow_mut().take();
        match (&previous, &entity) {
            (Some(old), Some(new)) if Entity::ptr_eq(old, new) => {}
            _ => {
                if let Some(old) = &previous {
                    old.remove_inbound(self.id);
                }
                if let Some(new) = &entity {
                    new.add_inbound(self.id, Rc::downgrade(self));
                }
            }
        }
        *self.target.borrow_mut() = entity;
    }

    fn clear_target(&self) {
        let previous = self.target.borrow_mut().take();
        if let Some(old) = previous {
            old.remove_inbound(self.id);
        }
    }

    fn when_valid(&self, callback: Box<dyn FnOnce(FieldValue)>) {
        if self.valid.get() {
            let resolved = self.resolved.borrow().clone();
            callback(resolved);
        } else {
            self.arrivals.borrow_mut().push(callback);
        }
    }

    /// Returns to the none/null/valid baseline, releasing every
    /// subscription and destroying any subset view.
    fn full_reset(&self, write: bool) {
        self.pass_subs.release_all();
        self.state_subs.release_all();
        let view = self.subset.borrow_mut().take();
        if let Some(view) = view {
            view.clear_all(SetOptions::bypass());
        }
        self.clear_target();
        self.first_pass.set(true);
        self.set_raw(RawValue::Null);
        self.valid.set(true);
        self.set_resolved(FieldValue::Null, write);
    }

    /// Resets resolver/subset state on a kind change; the raw value is left
    /// for the new branch to overwrite.
    fn reclassify_reset(&self) {
        self.pass_subs.release_all();
        self.state_subs.release_all();
        let view = self.subset.borrow_mut().take();
        if let Some(view) = view {
            view.clear_all(SetOptions::bypass());
        }
        self.clear_target();
        self.first_pass.set(true);
    }
}

impl Drop for LinkCore {
    fn drop(&mut self) {
        // Handlers hold this core weakly, but their registrations live on
        // the shared source and owner subjects; release them so a dropped
        // link leaves no dead handlers behind.
        self.pass_subs.release_all();
        self.state_subs.release_all();
        self.owner_subs.release_all();
    }
}

impl fmt::Debug for LinkCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkCore")
            .field("id", &self.id)
            .field("attribute", &self.attribute)
            .field("active", &self.active.get())
            .field("kind", &self.kind())
            .field("valid", &self.valid.get())
            .finish()
    }
}

/// A live reference between one owner attribute and one source set.
///
/// Handles are cheap clones over shared state; the owner's link registry
/// holds the owning handle.
#[derive(Clone)]
pub struct ReferenceLink {
    core: Rc<LinkCore>,
}

impl ReferenceLink {
    pub(crate) fn new(
        owner: &Entity,
        attribute: String,
        source: EntitySet,
        options: LinkOptions,
    ) -> Self {
        Self {
            core: LinkCore::new(owner, attribute, source, options),
        }
    }

    pub(crate) fn from_core(core: Rc<LinkCore>) -> Self {
        Self { core }
    }

    /// The link's unique id.
    #[must_use]
    pub fn id(&self) -> LinkId {
        self.core.id
    }

    /// The linked attribute name.
    #[must_use]
    pub fn attribute(&self) -> &str {
        &self.core.attribute
    }

    /// The source set identifiers resolve against.
    #[must_use]
    pub fn source(&self) -> &EntitySet {
        &self.core.source
    }

    /// The owning entity, if it is still alive.
    #[must_use]
    pub fn owner(&self) -> Option<Entity> {
        self.core.owner.upgrade()
    }

    /// True between attach and detach.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.core.active.get()
    }

    /// True iff every identifier in the raw value currently resolves.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.core.valid.get()
    }

    /// The reference kind of the current raw value.
    #[must_use]
    pub fn kind(&self) -> LinkKind {
        self.core.kind()
    }

    /// The canonical identifier form.
    #[must_use]
    pub fn raw_value(&self) -> RawValue {
        self.core.raw.borrow().clone()
    }

    /// The live form currently exposed on the owner's attribute.
    #[must_use]
    pub fn resolved_value(&self) -> FieldValue {
        self.core.resolved.borrow().clone()
    }

    /// The subset view, while the link is collection-kind.
    #[must_use]
    pub fn subset(&self) -> Option<SubsetView> {
        self.core.subset.borrow().clone()
    }

    /// Membership test against the raw value.
    #[must_use]
    pub fn contains(&self, id: &EntityId) -> bool {
        self.core.raw.borrow().contains(id)
    }

    /// Attaches the link. Safe to call on an attached link; it detaches
    /// first.
    pub fn attach(&self) {
        self.core.attach();
    }

    /// Detaches the link, restoring the raw value onto the owner. No-op on
    /// a detached link.
    pub fn detach(&self) {
        self.core.detach();
    }

    /// Forces a reconciliation pass. Ignored while detached or while a pass
    /// is already running.
    pub fn update(&self) {
        self.core.update();
    }

    /// Invokes `callback` with the resolved value: synchronously if the
    /// link is already valid, otherwise exactly once on the next transition
    /// to valid.
    pub fn when_valid<F>(&self, callback: F)
    where
        F: FnOnce(FieldValue) + 'static,
    {
        self.core.when_valid(Box::new(callback));
    }

    /// Registers a link event handler.
    pub fn subscribe<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&LinkEvent) + 'static,
    {
        self.core.subject.subscribe(handler)
    }

    /// Removes a link event handler.
    pub fn unsubscribe(&self, id: HandlerId) -> bool {
        self.core.subject.unsubscribe(id)
    }

    /// True if both handles refer to the same link.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.core, &b.core)
    }
}

impl PartialEq for ReferenceLink {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl fmt::Debug for ReferenceLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceLink")
            .field("id", &self.core.id)
            .field("attribute", &self.core.attribute)
            .field("active", &self.core.active.get())
            .field("kind", &self.core.kind())
            .field("valid", &self.core.valid.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn linked(owner: &Entity, source: &EntitySet) -> ReferenceLink {
        owner
            .create_link("ref", source, LinkOptions::default())
            .unwrap()
    }

    #[test]
    fn test_null_link_baseline() {
        let owner = Entity::new("1");
        let source = EntitySet::new();
        let link = linked(&owner, &source);

        assert!(link.is_active());
        assert!(link.is_valid());
        assert_eq!(link.kind(), LinkKind::None);
        assert_eq!(link.raw_value(), RawValue::Null);
        assert!(owner.get("ref").is_null());
    }

    #[test]
    fn test_single_resolves_present_entity() {
        let target = Entity::new("2");
        let source = EntitySet::from_entities([target.clone()]);
        let owner = Entity::with_fields("1", [("ref", "2")]);
        let link = linked(&owner, &source);

        assert!(link.is_valid());
        assert_eq!(link.kind(), LinkKind::Single);
        assert_eq!(link.raw_value(), RawValue::Single(EntityId::new("2")));
        assert_eq!(owner.get("ref").as_entity(), Some(&target));
    }

    #[test]
    fn test_single_waits_for_absent_entity() {
        let source = EntitySet::new();
        let owner = Entity::with_fields("1", [("ref", "2")]);
        let link = linked(&owner, &source);

        assert!(!link.is_valid());
        assert!(owner.get("ref").is_null());
        assert_eq!(link.raw_value(), RawValue::Single(EntityId::new("2")));
    }

    #[test]
    fn test_non_reference_value_rewrites_to_null() {
        let source = EntitySet::new();
        let owner = Entity::with_fields("1", [("ref", 42)]);
        let link = linked(&owner, &source);

        assert!(link.is_valid());
        assert_eq!(link.kind(), LinkKind::None);
        assert!(owner.get("ref").is_null());
    }

    #[test]
    fn test_collection_resolves_in_raw_order() {
        let a = Entity::new("a");
        let c = Entity::new("c");
        let source = EntitySet::from_entities([Entity::new("b"), c.clone(), a.clone()]);
        let owner = Entity::with_fields("1", [("refs", FieldValue::from(vec!["a", "c"]))]);
        let link = linked(&owner, &source);

        assert!(link.is_valid());
        assert_eq!(link.kind(), LinkKind::Collection);
        let view = owner.get("refs");
        let view = view.as_view().unwrap();
        assert_eq!(view.entities(), vec![a, c]);
    }

    #[test]
    fn test_detach_restores_raw_value() {
        let source = EntitySet::from_entities([Entity::new("2")]);
        let owner = Entity::with_fields("1", [("ref", "2")]);
        let link = linked(&owner, &source);

        assert!(owner.get("ref").is_entity());
        link.detach();
        assert!(!link.is_active());
        assert_eq!(owner.get("ref").as_str(), Some("2"));

        // Idempotent: a second detach leaves the owner untouched.
        link.detach();
        assert_eq!(owner.get("ref").as_str(), Some("2"));
    }

    #[test]
    fn test_contains() {
        let source = EntitySet::new();
        let owner = Entity::with_fields("1", [("refs", FieldValue::from(vec!["a", "b"]))]);
        let link = linked(&owner, &source);

        assert!(link.contains(&EntityId::new("a")));
        assert!(!link.contains(&EntityId::new("z")));
    }

    #[test]
    fn test_events_are_edge_triggered() {
        let source = EntitySet::from_entities([Entity::new("2")]);
        let owner = Entity::with_fields("1", [("ref", "2")]);
        let link = linked(&owner, &source);

        let events = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&events);
        link.subscribe(move |event| match event {
            LinkEvent::Validity(v) => log.borrow_mut().push(format!("valid:{v}")),
            LinkEvent::Changed { .. } => log.borrow_mut().push("changed".to_string()),
            _ => {}
        });

        // Re-setting the id form of the already-resolved reference changes
        // neither the resolved value nor validity.
        owner.set("ref", "2");
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn test_update_announces_pass() {
        let source = EntitySet::new();
        let owner = Entity::new("1");
        let link = linked(&owner, &source);

        let passes = Rc::new(RefCell::new(0u32));
        let count = Rc::clone(&passes);
        link.subscribe(move |event| {
            if matches!(event, LinkEvent::Updated) {
                *count.borrow_mut() += 1;
            }
        });

        link.update();
        assert_eq!(*passes.borrow(), 1);
    }

    #[test]
    fn test_back_reference_channel() {
        let target = Entity::new("2");
        let source = EntitySet::from_entities([target.clone()]);
        let owner = Entity::with_fields("1", [("ref", "2")]);
        let link = linked(&owner, &source);

        let inbound = target.inbound_links();
        assert_eq!(inbound.len(), 1);
        assert!(ReferenceLink::ptr_eq(&inbound[0], &link));

        link.detach();
        assert!(target.inbound_links().is_empty());
    }

    #[test]
    fn test_custom_collection_factory_is_used() {
        let counter = Rc::new(RefCell::new(0u32));
        let built = Rc::clone(&counter);
        let options = LinkOptions {
            collection_factory: Some(Rc::new(move || {
                *built.borrow_mut() += 1;
                EntitySet::new()
            })),
        };

        let source = EntitySet::new();
        let owner = Entity::with_fields("1", [("refs", FieldValue::from(vec!["a"]))]);
        owner.create_link("refs", &source, options).unwrap();

        assert_eq!(*counter.borrow(), 1);
    }
}
