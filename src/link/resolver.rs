//! Single-reference resolution.
//!
//! One resolution pass puts the link in one of two states: *Resolved* (the
//! identified entity is present in the source) or *Waiting* (it is not).
//! Exactly one watcher is alive in either state; the pass ledger releases
//! the previous watcher before the next one is installed. Watchers re-run
//! resolution, so removal of the resolved entity returns the link to
//! Waiting on the same id, and a later arrival promotes it back. Absence is
//! representable state, never an error.

use std::rc::Rc;

use crate::entity::{Entity, EntityId};
use crate::link::core::LinkCore;
use crate::set::SetEvent;
use crate::value::FieldValue;

pub(crate) fn resolve_single(core: &Rc<LinkCore>, id: EntityId) {
    core.pass_subs().release_all();
    let source = core.source().clone();

    match source.get(&id) {
        Some(entity) => {
            // Resolved: watch for this exact entity leaving the source.
            let weak = Rc::downgrade(core);
            let resolved = entity.clone();
            let watched = id;
            let handle = source.subscribe(move |event| {
                if let SetEvent::Removed { entity: removed, .. } = event {
                    if Entity::ptr_eq(removed, &resolved) {
                        if let Some(core) = weak.upgrade() {
                            resolve_single(&core, watched.clone());
                            core.flush_changes();
                        }
                    }
                }
            });
            let unsub = source.clone();
            core.pass_subs().record(move || {
                unsub.unsubscribe(handle);
            });

            core.set_target(Some(entity.clone()));
            core.set_valid(true);
            core.set_resolved(FieldValue::Entity(entity), true);
        }
        None => {
            // Waiting: watch for an entity with this id arriving.
            let weak = Rc::downgrade(core);
            let watched = id;
            let handle = source.subscribe(move |event| {
                if let SetEvent::Added { entity, .. } = event {
                    if *entity.id() == watched {
                        if let Some(core) = weak.upgrade() {
                            resolve_single(&core, watched.clone());
                            core.flush_changes();
                        }
                    }
                }
            });
            let unsub = source.clone();
            core.pass_subs().record(move || {
                unsub.unsubscribe(handle);
            });

            core.set_target(None);
            core.set_valid(false);
            core.set_resolved(FieldValue::Null, true);
        }
    }
}
