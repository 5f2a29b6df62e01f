//! # entlink - Live references between observable entities
//!
//! entlink maintains foreign-key style references between identifiable
//! entities held in an observable [`EntitySet`] and a single attribute on
//! an observable owner [`Entity`]. A linked attribute stores identifiers at
//! rest (the *raw* form: null, an id, or an ordered id list); while the
//! link is attached the engine transparently rewrites it into the *live*
//! form (a resolved entity, or an ordered [`SubsetView`] of the source) and
//! keeps both forms synchronized as the source and the attribute mutate
//! independently.
//!
//! ## Core Concepts
//!
//! - **Entity**: an observable record with a stable string id
//! - **EntitySet**: an observable ordered set entities resolve against
//! - **ReferenceLink**: the reconciliation engine for one (owner,
//!   attribute, source) triple
//! - **Validity**: whether every identifier currently resolves; an absent
//!   entity is a waiting state, never an error
//!
//! ## Usage
//!
//! ```rust,ignore
//! use entlink::{Entity, EntitySet, LinkOptions};
//!
//! let owner = Entity::with_fields("1", [("friend", "2")]);
//! let people = EntitySet::new();
//!
//! let link = owner.create_link("friend", &people, LinkOptions::default())?;
//! assert!(!link.is_valid()); // "2" has not arrived yet
//!
//! people.add(&Entity::new("2"));
//! assert!(link.is_valid());
//! assert!(owner.get("friend").is_entity());
//! ```
//!
//! Everything is single-threaded and synchronous: notification handlers run
//! to completion before control returns to the emitter, and the only
//! concurrency is the interleaving of independent mutation sources.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod entity;
pub mod error;
pub mod link;
pub mod notify;
pub mod set;
pub mod value;

mod registry;

// Re-export primary types at crate root for convenience
pub use entity::{Entity, EntityEvent, EntityId};
pub use error::{ConstructionError, LinkError, LinkResult, UsageError};
pub use link::{LinkEvent, LinkId, LinkKind, LinkOptions, RawValue, ReferenceLink, SubsetView};
pub use notify::{HandlerId, Subject, SubscriptionLedger};
pub use set::{EntitySet, SetEvent, SetFactory, SetOptions};
pub use value::FieldValue;
