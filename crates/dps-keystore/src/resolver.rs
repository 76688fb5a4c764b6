//! Identifier-to-key resolution.
//!
//! Lookup order is fixed and observable only if identifiers collide:
//!
//! 1. General binding table (first binding wins for a repeated identifier)
//! 2. Network key identifier
//! 3. Publisher identity identifier
//! 4. Subscriber identity identifier
//!
//! Anything else is [`KeyStoreError::MissingKey`].

use std::{collections::HashMap, fmt};

use crate::{
    error::KeyStoreError,
    material::{KeyBinding, KeyId, KeyMaterial, NetworkKey},
};

/// Where a resolved key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySource {
    /// General binding table
    Binding,
    /// Network key fallback
    NetworkKey,
    /// Publisher identity fallback
    Publisher,
    /// Subscriber (own) identity fallback
    Subscriber,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Binding => "binding",
            Self::NetworkKey => "network-key",
            Self::Publisher => "publisher",
            Self::Subscriber => "subscriber",
        };
        f.write_str(name)
    }
}

/// Read-only resolver over the provisioned bindings.
///
/// # Invariants
///
/// - Immutable after construction
/// - `index[id]` is the position of the first binding for `id`
/// - Fallbacks are checked in the order network key, publisher, subscriber
#[derive(Debug, Clone)]
pub struct KeyResolver {
    bindings: Vec<KeyBinding>,
    index: HashMap<KeyId, usize>,
    fallbacks: Vec<(KeySource, KeyBinding)>,
}

impl KeyResolver {
    /// Build a resolver. Fallback roles are evaluated only after the
    /// binding table misses.
    pub fn new(
        bindings: Vec<KeyBinding>,
        network_key: &NetworkKey,
        publisher: Option<KeyBinding>,
        subscriber: Option<KeyBinding>,
    ) -> Self {
        let mut index = HashMap::with_capacity(bindings.len());
        for (position, binding) in bindings.iter().enumerate() {
            if index.contains_key(&binding.id) {
                tracing::warn!(id = %binding.id, position, "duplicate key binding ignored");
                continue;
            }
            index.insert(binding.id.clone(), position);
        }

        let mut fallbacks = Vec::with_capacity(3);
        fallbacks.push((
            KeySource::NetworkKey,
            KeyBinding::new(network_key.id.clone(), network_key.key.clone()),
        ));
        if let Some(binding) = publisher {
            fallbacks.push((KeySource::Publisher, binding));
        }
        if let Some(binding) = subscriber {
            fallbacks.push((KeySource::Subscriber, binding));
        }

        Self { bindings, index, fallbacks }
    }

    /// Find the material for `id` and the source that supplied it.
    pub fn lookup(&self, id: &KeyId) -> Option<(KeySource, &KeyMaterial)> {
        if let Some(&position) = self.index.get(id) {
            return Some((KeySource::Binding, &self.bindings[position].material));
        }

        self.fallbacks
            .iter()
            .find(|(_, binding)| binding.id == *id)
            .map(|(source, binding)| (*source, &binding.material))
    }

    /// Resolve `id` to key material.
    ///
    /// # Errors
    ///
    /// - `MissingKey` if no binding or fallback role matches
    pub fn resolve(&self, id: &KeyId) -> Result<KeyMaterial, KeyStoreError> {
        match self.lookup(id) {
            Some((source, material)) => {
                tracing::debug!(%id, %source, kind = material.kind(), "resolved key");
                Ok(material.clone())
            },
            None => {
                tracing::debug!(%id, "no key for identifier");
                Err(KeyStoreError::MissingKey)
            },
        }
    }

    /// Number of entries in the general binding table, duplicates included.
    pub fn binding_count(&self) -> usize {
        self.bindings.len()
    }
}
