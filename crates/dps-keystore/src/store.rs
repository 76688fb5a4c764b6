//! The key store and its request surface.
//!
//! A [`KeyStore`] is assembled once by [`KeyStoreBuilder::build`] and is
//! immutable afterwards. Every request is a local lookup or a local random
//! generation; nothing here performs I/O or holds a lock across a request,
//! so one instance can be shared across threads behind an `Arc`.

use std::sync::Arc;

use crate::{
    entropy::{EntropySource, OsEntropy},
    error::{ConfigError, KeyStoreError},
    generator::{EphemeralKeyGenerator, EphemeralRequest},
    material::{KeyBinding, KeyId, KeyMaterial, NetworkKey},
    mode::EncryptionMode,
    resolver::KeyResolver,
    trust::{TrustAnchor, TrustAnchorProvider},
};

/// A request from the messaging layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRequest<'a> {
    /// The network key and its identifier
    NetworkKey,
    /// Key material bound to an identifier
    Key(&'a KeyId),
    /// Freshly generated key material
    Ephemeral(EphemeralRequest),
    /// The certificate authority chain
    TrustAnchor,
}

/// Answer to a [`KeyRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResponse {
    /// Answer to [`KeyRequest::NetworkKey`]
    NetworkKey(NetworkKey),
    /// Answer to [`KeyRequest::Key`] and [`KeyRequest::Ephemeral`]
    Key(KeyMaterial),
    /// Answer to [`KeyRequest::TrustAnchor`]
    TrustAnchor(TrustAnchor),
}

/// Callback contract between the messaging layer and a key source.
///
/// Every operation is synchronous and returns either key material or a
/// [`KeyStoreError`]; failures are never swallowed.
pub trait KeyProvider: Send + Sync {
    /// The distinguished network key and its identifier.
    fn network_key(&self) -> Result<NetworkKey, KeyStoreError>;

    /// Key material bound to `id`.
    fn key(&self, id: &KeyId) -> Result<KeyMaterial, KeyStoreError>;

    /// Freshly generated key material. The provider keeps no copy.
    fn ephemeral_key(&self, request: EphemeralRequest) -> Result<KeyMaterial, KeyStoreError>;

    /// The certificate authority chain.
    fn trust_anchor(&self) -> Result<TrustAnchor, KeyStoreError>;

    /// Dispatch any request to the matching operation.
    fn handle(&self, request: KeyRequest<'_>) -> Result<KeyResponse, KeyStoreError> {
        match request {
            KeyRequest::NetworkKey => self.network_key().map(KeyResponse::NetworkKey),
            KeyRequest::Key(id) => self.key(id).map(KeyResponse::Key),
            KeyRequest::Ephemeral(kind) => self.ephemeral_key(kind).map(KeyResponse::Key),
            KeyRequest::TrustAnchor => self.trust_anchor().map(KeyResponse::TrustAnchor),
        }
    }
}

/// Key resolution subsystem for one node.
///
/// # Invariants
///
/// - Mode, bindings, network key and trust anchor never change after build
/// - In `CertificateBased` mode a trust anchor and an own identity with a
///   private key are present
/// - `node_identity` is `Some` exactly in `CertificateBased` mode
pub struct KeyStore {
    mode: EncryptionMode,
    network_key: NetworkKey,
    resolver: KeyResolver,
    generator: EphemeralKeyGenerator,
    trust: TrustAnchorProvider,
    node_identity: Option<KeyId>,
}

impl KeyStore {
    /// Start building a key store for `mode` around `network_key`.
    pub fn builder(mode: EncryptionMode, network_key: NetworkKey) -> KeyStoreBuilder {
        KeyStoreBuilder {
            mode,
            network_key,
            bindings: Vec::new(),
            publisher: None,
            subscriber: None,
            trust_anchor: None,
            entropy: None,
        }
    }

    /// Encryption mode fixed at construction.
    pub fn mode(&self) -> EncryptionMode {
        self.mode
    }

    /// Identity the messaging layer binds its listener to. `None` means an
    /// anonymous node.
    pub fn node_identity(&self) -> Option<&KeyId> {
        self.node_identity.as_ref()
    }

    /// Resolver over the provisioned bindings. [`KeyResolver::lookup`]
    /// reports which source an identifier resolves from without cloning.
    pub fn resolver(&self) -> &KeyResolver {
        &self.resolver
    }
}

impl KeyProvider for KeyStore {
    fn network_key(&self) -> Result<NetworkKey, KeyStoreError> {
        Ok(self.network_key.clone())
    }

    fn key(&self, id: &KeyId) -> Result<KeyMaterial, KeyStoreError> {
        self.resolver.resolve(id)
    }

    fn ephemeral_key(&self, request: EphemeralRequest) -> Result<KeyMaterial, KeyStoreError> {
        self.generator.generate(request)
    }

    fn trust_anchor(&self) -> Result<TrustAnchor, KeyStoreError> {
        self.trust.get().cloned()
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("mode", &self.mode)
            .field("network_key_id", &self.network_key.id)
            .field("bindings", &self.resolver.binding_count())
            .field("trust_anchor", &self.trust.is_active())
            .field("node_identity", &self.node_identity)
            .finish_non_exhaustive()
    }
}

/// Collects provisioning input and validates it into a [`KeyStore`].
pub struct KeyStoreBuilder {
    mode: EncryptionMode,
    network_key: NetworkKey,
    bindings: Vec<KeyBinding>,
    publisher: Option<KeyBinding>,
    subscriber: Option<KeyBinding>,
    trust_anchor: Option<TrustAnchor>,
    entropy: Option<Arc<dyn EntropySource>>,
}

impl KeyStoreBuilder {
    /// Add one entry to the general binding table.
    #[must_use]
    pub fn binding(mut self, binding: KeyBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Add entries to the general binding table, in order.
    #[must_use]
    pub fn bindings(mut self, bindings: impl IntoIterator<Item = KeyBinding>) -> Self {
        self.bindings.extend(bindings);
        self
    }

    /// Publisher identity, checked after the network key.
    #[must_use]
    pub fn publisher(mut self, binding: KeyBinding) -> Self {
        self.publisher = Some(binding);
        self
    }

    /// Subscriber (own) identity, checked last.
    #[must_use]
    pub fn subscriber(mut self, binding: KeyBinding) -> Self {
        self.subscriber = Some(binding);
        self
    }

    /// Certificate authority chain for certificate mode.
    #[must_use]
    pub fn trust_anchor(mut self, anchor: TrustAnchor) -> Self {
        self.trust_anchor = Some(anchor);
        self
    }

    /// Entropy source for ephemeral keys. Defaults to [`OsEntropy`].
    #[must_use]
    pub fn entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = Some(entropy);
        self
    }

    /// Validate the configuration and assemble the key store.
    ///
    /// # Errors
    ///
    /// - `EmptyKeyId` if any identifier has no bytes
    /// - `MissingTrustAnchor` in certificate mode without a trust anchor
    /// - `MissingNodeIdentity` in certificate mode without a subscriber
    ///   identity
    /// - `NodeIdentityWithoutPrivateKey` if that identity cannot decrypt
    pub fn build(self) -> Result<KeyStore, ConfigError> {
        let ids = std::iter::once(&self.network_key.id)
            .chain(self.bindings.iter().map(|b| &b.id))
            .chain(self.publisher.iter().map(|b| &b.id))
            .chain(self.subscriber.iter().map(|b| &b.id));
        for id in ids {
            if id.is_empty() {
                return Err(ConfigError::EmptyKeyId);
            }
        }

        let policy = self.mode.policy();

        let trust = match (policy.trust_anchor, self.trust_anchor) {
            (true, Some(anchor)) => TrustAnchorProvider::Active(anchor),
            (true, None) => return Err(ConfigError::MissingTrustAnchor),
            (false, Some(_)) => {
                tracing::debug!(mode = %self.mode, "trust anchor ignored outside certificate mode");
                TrustAnchorProvider::Disabled
            },
            (false, None) => TrustAnchorProvider::Disabled,
        };

        let node_identity = if policy.node_identity {
            let subscriber = self.subscriber.as_ref().ok_or(ConfigError::MissingNodeIdentity)?;
            let can_decrypt = subscriber
                .material
                .as_certificate()
                .is_some_and(|identity| identity.has_private_key());
            if !can_decrypt {
                return Err(ConfigError::NodeIdentityWithoutPrivateKey {
                    id: subscriber.id.to_hex(),
                });
            }
            Some(subscriber.id.clone())
        } else {
            None
        };

        let entropy = self.entropy.unwrap_or_else(|| Arc::new(OsEntropy::new()));
        let resolver =
            KeyResolver::new(self.bindings, &self.network_key, self.publisher, self.subscriber);

        tracing::info!(
            mode = %self.mode,
            bindings = resolver.binding_count(),
            trust_anchor = trust.is_active(),
            node_identity = node_identity.is_some(),
            "key store ready"
        );

        Ok(KeyStore {
            mode: self.mode,
            network_key: self.network_key,
            resolver,
            generator: EphemeralKeyGenerator::new(entropy),
            trust,
            node_identity,
        })
    }
}
