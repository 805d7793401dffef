use std::collections::BTreeMap;

use lumen_canon::Document;

use crate::entity::{Entity, EntityType};
use crate::error::EntityResult;
use crate::resolver::Resolver;

/// Deserializer entry stored in the registry.
pub type DeserializeFn = fn(&Document, &Resolver) -> EntityResult<Box<dyn Entity>>;

fn deserialize_boxed<T: EntityType>(
    doc: &Document,
    resolver: &Resolver,
) -> EntityResult<Box<dyn Entity>> {
    Ok(Box::new(T::deserialize(doc, resolver)?))
}

/// Open mapping from type tag to deserializer.
///
/// Populated once at startup. Crates defining entity types expose a
/// `register` function that adds their types; nothing in this crate needs
/// to know about them.
#[derive(Clone, Default)]
pub struct Registry {
    entries: BTreeMap<&'static str, DeserializeFn>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under its `TYPE_TAG`. Re-registering a tag replaces the
    /// previous entry.
    pub fn register<T: EntityType>(&mut self) -> &mut Self {
        if self
            .entries
            .insert(T::TYPE_TAG, deserialize_boxed::<T>)
            .is_some()
        {
            tracing::debug!(tag = T::TYPE_TAG, "replaced registry entry");
        }
        self
    }

    /// Register `T` under an additional tag, for types that write more than
    /// one document shape.
    pub fn register_alias<T: EntityType>(&mut self, tag: &'static str) -> &mut Self {
        self.entries.insert(tag, deserialize_boxed::<T>);
        self
    }

    /// Look up the deserializer for `tag`.
    pub fn get(&self, tag: &str) -> Option<DeserializeFn> {
        self.entries.get(tag).copied()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entries.contains_key(tag)
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tags", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Note, Notebook};

    #[test]
    fn register_and_lookup() {
        let mut registry = Registry::new();
        assert!(registry.is_empty());
        registry.register::<Note>().register::<Notebook>();
        assert_eq!(registry.len(), 2);
        assert!(registry.get("Note").is_some());
        assert!(registry.get("Hologram").is_none());
        assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["Note", "Notebook"]);
    }

    #[test]
    fn alias_shares_deserializer() {
        let mut registry = Registry::new();
        registry.register::<Note>().register_alias::<Note>("LegacyNote");
        assert!(registry.contains("LegacyNote"));
        assert_eq!(registry.len(), 2);
    }
}
