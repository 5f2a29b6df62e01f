//! The reference-link engine.
//!
//! A [`ReferenceLink`] keeps one owner attribute synchronized against one
//! source [`crate::set::EntitySet`]: at rest the attribute holds
//! identifiers (the raw form), while the link is attached it holds live
//! entities (the resolved form), and the engine reconciles the two as the
//! attribute and the source mutate independently.

/// Raw-value classification.
pub mod kind;
/// Canonical identifier form and normalization.
pub mod raw;
/// Single-reference resolution state machine.
pub(crate) mod resolver;
/// Ordered filtered projection for multi-valued links.
pub mod subset;
/// The link orchestrator.
pub mod core;

pub use self::core::{LinkEvent, LinkId, LinkOptions, ReferenceLink};
pub use self::kind::LinkKind;
pub use self::raw::RawValue;
pub use self::subset::SubsetView;
