//! Fuzz target for key resolution order
//!
//! # Strategy
//!
//! - Binding tables with colliding identifiers
//! - Publisher, subscriber and network key identifiers that shadow each
//!   other or the table
//! - Probes drawn from the provisioned identifiers and from arbitrary bytes
//!
//! # Invariants
//!
//! - A table hit returns the FIRST binding for that identifier
//! - Fallbacks apply only after a table miss, in the order network key,
//!   publisher, subscriber
//! - Everything else is `MissingKey`
//! - Resolution is deterministic and never panics

#![no_main]

use arbitrary::Arbitrary;
use dps_keystore::{
    CertificateIdentity, EncryptionMode, KeyBinding, KeyId, KeyMaterial, KeyProvider, KeySource,
    KeyStore, KeyStoreError, NetworkKey, SymmetricKey,
};
use libfuzzer_sys::fuzz_target;

const CERT: &str = "-----BEGIN CERTIFICATE-----\nAA==\n-----END CERTIFICATE-----\n";

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    network_id: Id,
    bindings: Vec<(Id, u8)>,
    publisher: Option<Id>,
    subscriber: Option<Id>,
    probes: Vec<Probe>,
}

/// Identifier from a tiny alphabet so collisions are common.
#[derive(Debug, Clone, Arbitrary)]
struct Id(u8, Option<u8>);

impl Id {
    fn key_id(&self) -> KeyId {
        match self.1 {
            Some(second) => KeyId::new(vec![self.0 % 4, second % 4]),
            None => KeyId::new(vec![self.0 % 4]),
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum Probe {
    Provisioned(u8),
    Raw(Vec<u8>),
}

/// Reference resolution: a linear scan in the documented order.
fn expected(scenario: &Scenario, id: &KeyId) -> Option<KeySource> {
    if scenario.bindings.iter().any(|(b, _)| &b.key_id() == id) {
        return Some(KeySource::Binding);
    }
    if &scenario.network_id.key_id() == id {
        return Some(KeySource::NetworkKey);
    }
    if scenario.publisher.as_ref().is_some_and(|p| &p.key_id() == id) {
        return Some(KeySource::Publisher);
    }
    if scenario.subscriber.as_ref().is_some_and(|s| &s.key_id() == id) {
        return Some(KeySource::Subscriber);
    }
    None
}

fuzz_target!(|scenario: Scenario| {
    let mut builder = KeyStore::builder(
        EncryptionMode::PreSharedKey,
        NetworkKey::new(scenario.network_id.key_id(), SymmetricKey::new([0xFF; 32])),
    )
    .bindings(
        scenario
            .bindings
            .iter()
            .map(|(id, byte)| KeyBinding::new(id.key_id(), SymmetricKey::new([*byte; 32]))),
    );
    let certificate = || CertificateIdentity::public(CERT).unwrap();
    if let Some(id) = &scenario.publisher {
        builder = builder.publisher(KeyBinding::new(id.key_id(), certificate()));
    }
    if let Some(id) = &scenario.subscriber {
        builder = builder.subscriber(KeyBinding::new(id.key_id(), certificate()));
    }
    let store = builder.build().unwrap();

    let provisioned: Vec<KeyId> = std::iter::once(scenario.network_id.key_id())
        .chain(scenario.bindings.iter().map(|(id, _)| id.key_id()))
        .chain(scenario.publisher.iter().map(Id::key_id))
        .chain(scenario.subscriber.iter().map(Id::key_id))
        .collect();

    for probe in &scenario.probes {
        let id = match probe {
            Probe::Provisioned(i) => provisioned[usize::from(*i) % provisioned.len()].clone(),
            Probe::Raw(bytes) if bytes.is_empty() => continue,
            Probe::Raw(bytes) => KeyId::new(bytes.clone()),
        };

        let result = store.key(&id);

        // INVARIANT 1: deterministic
        assert_eq!(store.key(&id), result);

        let source = store.resolver().lookup(&id).map(|(source, _)| source);
        assert_eq!(source, expected(&scenario, &id), "wrong source for {id}");

        match (source, result) {
            (None, Err(KeyStoreError::MissingKey)) => {},
            (Some(KeySource::Binding), Ok(KeyMaterial::Symmetric(key))) => {
                // INVARIANT 2: first binding wins
                let first = scenario.bindings.iter().find(|(b, _)| b.key_id() == id).unwrap();
                assert_eq!(key.as_bytes(), &[first.1; 32]);
            },
            (Some(KeySource::NetworkKey), Ok(KeyMaterial::Symmetric(key))) => {
                assert_eq!(key.as_bytes(), &[0xFF; 32]);
            },
            (Some(KeySource::Publisher | KeySource::Subscriber), Ok(KeyMaterial::Certificate(_))) => {},
            (source, result) => panic!("source {source:?} answered with {result:?}"),
        }
    }
});
