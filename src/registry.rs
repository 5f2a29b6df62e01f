//! Host integration surface.
//!
//! Links live in a per-entity registry keyed by attribute; the operations
//! below are the owner-facing API. Creating a link at an attribute replaces
//! (detaches) any existing link there, and serialization renders linked
//! attributes from the raw identifier form instead of the live resolved
//! form.

use std::collections::BTreeMap;

use crate::entity::{Entity, EntityEvent};
use crate::error::{ConstructionError, LinkResult, UsageError};
use crate::link::core::{LinkOptions, ReferenceLink};
use crate::link::raw::RawValue;
use crate::set::EntitySet;
use crate::value::FieldValue;

/// Per-entity link storage, keyed by attribute.
#[derive(Debug, Default)]
pub(crate) struct LinkRegistry {
    links: BTreeMap<String, ReferenceLink>,
}

impl LinkRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, attribute: String, link: ReferenceLink) {
        self.links.insert(attribute, link);
    }

    fn get(&self, attribute: &str) -> Option<ReferenceLink> {
        self.links.get(attribute).cloned()
    }

    fn remove(&mut self, attribute: &str) -> Option<ReferenceLink> {
        self.links.remove(attribute)
    }

    fn drain_all(&mut self) -> Vec<(String, ReferenceLink)> {
        std::mem::take(&mut self.links).into_iter().collect()
    }
}

impl Entity {
    /// Creates a link from `attribute` to entities in `source`, replacing
    /// any existing link at that attribute. The link attaches immediately.
    ///
    /// # Errors
    /// [`ConstructionError::EmptyAttribute`] if the attribute name is empty;
    /// no state is installed in that case.
    pub fn create_link(
        &self,
        attribute: impl Into<String>,
        source: &EntitySet,
        options: LinkOptions,
    ) -> LinkResult<ReferenceLink> {
        let attribute = attribute.into();
        if attribute.is_empty() {
            return Err(ConstructionError::EmptyAttribute.into());
        }

        self.unlink(&attribute);

        let link = ReferenceLink::new(self, attribute.clone(), source.clone(), options);
        self.with_registry(|registry| registry.insert(attribute.clone(), link.clone()));
        link.attach();

        self.emit_event(&EntityEvent::Linked { attribute });
        Ok(link)
    }

    /// The link at an attribute, if any.
    #[must_use]
    pub fn link_at(&self, attribute: &str) -> Option<ReferenceLink> {
        self.with_registry(|registry| registry.get(attribute))
    }

    /// Detaches and discards the link at an attribute. Returns false if the
    /// attribute was not linked.
    pub fn unlink(&self, attribute: &str) -> bool {
        let link = self.with_registry(|registry| registry.remove(attribute));
        match link {
            Some(link) => {
                link.detach();
                self.emit_event(&EntityEvent::Unlinked {
                    attribute: attribute.to_string(),
                });
                true
            }
            None => false,
        }
    }

    /// Detaches and discards every link on this entity.
    pub fn unlink_all(&self) {
        let links = self.with_registry(LinkRegistry::drain_all);
        for (attribute, link) in links {
            link.detach();
            self.emit_event(&EntityEvent::Unlinked { attribute });
        }
    }

    /// The raw identifier form behind a linked attribute, or `None` if the
    /// attribute is not linked.
    #[must_use]
    pub fn deref(&self, attribute: &str) -> Option<RawValue> {
        self.link_at(attribute).map(|link| link.raw_value())
    }

    /// Invokes `callback` with the resolved value once the link at
    /// `attribute` is valid: synchronously if it already is, otherwise
    /// exactly once on the next transition to valid.
    ///
    /// # Errors
    /// [`UsageError::NoLink`] if the attribute is not linked.
    pub fn on_arrival<F>(&self, attribute: &str, callback: F) -> LinkResult<()>
    where
        F: FnOnce(FieldValue) + 'static,
    {
        match self.link_at(attribute) {
            Some(link) => {
                link.when_valid(callback);
                Ok(())
            }
            None => Err(UsageError::NoLink {
                attribute: attribute.to_string(),
            }
            .into()),
        }
    }

    /// Serializes the entity. Attributes with an active link render their
    /// raw identifier form; everything else renders through
    /// [`FieldValue`]'s serialization, which itself reduces live forms to
    /// identifiers.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for name in self.field_names() {
            let rendered = match self.link_at(&name) {
                Some(link) if link.is_active() => {
                    serde_json::to_value(link.raw_value()).unwrap_or(serde_json::Value::Null)
                }
                _ => serde_json::to_value(self.get(&name)).unwrap_or(serde_json::Value::Null),
            };
            map.insert(name, rendered);
        }
        map.insert(
            "id".to_string(),
            serde_json::Value::String(self.id().as_str().to_string()),
        );
        serde_json::Value::Object(map)
    }
}
