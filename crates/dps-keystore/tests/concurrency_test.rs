//! Concurrent use of one key store.
//!
//! The messaging layer calls into the store from several threads at once.
//! Lookups must agree with single-threaded answers and generation must
//! never block indefinitely.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use dps_keystore::{
    CurveId, EncryptionMode, EntropyError, EntropySource, EphemeralRequest, GenerationError,
    KeyBinding, KeyId, KeyProvider, KeyStore, KeyStoreError, NetworkKey, SeededEntropy,
    SymmetricKey,
};

const THREADS: usize = 8;
const REQUESTS_PER_THREAD: usize = 50;

fn store_with(entropy: Arc<dyn EntropySource>) -> KeyStore {
    let bindings = (0..16u8).map(|i| KeyBinding::new([i; 16], SymmetricKey::new([i; 32])));
    KeyStore::builder(
        EncryptionMode::PreSharedKey,
        NetworkKey::new([0xAA; 16], SymmetricKey::new([0xAA; 32])),
    )
    .bindings(bindings)
    .entropy(entropy)
    .build()
    .unwrap()
}

#[test]
fn concurrent_lookups_match_sequential_answers() {
    let store = store_with(Arc::new(SeededEntropy::from_seed(1)));

    thread::scope(|s| {
        for t in 0..THREADS {
            let store = &store;
            s.spawn(move || {
                for n in 0..REQUESTS_PER_THREAD {
                    let i = ((t * REQUESTS_PER_THREAD + n) % 16) as u8;
                    let material = store.key(&KeyId::from([i; 16])).unwrap();
                    assert_eq!(material.as_symmetric().unwrap().as_bytes(), &[i; 32]);

                    assert_eq!(
                        store.key(&KeyId::from([0xEE; 16])),
                        Err(KeyStoreError::MissingKey)
                    );
                }
            });
        }
    });
}

#[test]
fn concurrent_generation_yields_distinct_keys() {
    let store = store_with(Arc::new(SeededEntropy::from_seed(2)));
    let seen = Mutex::new(HashSet::new());

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..REQUESTS_PER_THREAD {
                    let key = store.ephemeral_key(EphemeralRequest::Symmetric).unwrap();
                    let bytes = *key.as_symmetric().unwrap().as_bytes();
                    assert!(seen.lock().unwrap().insert(bytes), "ephemeral key repeated");
                }
            });
        }
    });

    assert_eq!(seen.lock().unwrap().len(), THREADS * REQUESTS_PER_THREAD);
}

#[test]
fn concurrent_key_pairs_have_wire_width() {
    let store = store_with(Arc::new(SeededEntropy::from_seed(3)));

    thread::scope(|s| {
        for t in 0..4 {
            let store = &store;
            s.spawn(move || {
                let (curve, width) =
                    if t % 2 == 0 { (CurveId::P384, 48) } else { (CurveId::P521, 66) };
                for _ in 0..5 {
                    let material =
                        store.ephemeral_key(EphemeralRequest::EllipticCurve { curve }).unwrap();
                    let pair = material.as_elliptic_curve().unwrap();
                    assert_eq!(pair.x().len(), width);
                    assert_eq!(pair.y().len(), width);
                    assert_eq!(pair.d().len(), width);
                }
            });
        }
    });
}

/// Source whose lock holder has hung past the wait bound.
struct StalledEntropy;

impl EntropySource for StalledEntropy {
    fn fill(&self, _buffer: &mut [u8]) -> Result<(), EntropyError> {
        Err(EntropyError::Stalled { waited: Duration::from_millis(20) })
    }
}

#[test]
fn stalled_entropy_fails_instead_of_blocking() {
    let store = store_with(Arc::new(StalledEntropy));
    let result = store.ephemeral_key(EphemeralRequest::Symmetric);

    assert!(matches!(
        result,
        Err(KeyStoreError::GenerationFailed(GenerationError::Entropy(EntropyError::Stalled { .. })))
    ));
    assert!(result.unwrap_err().is_retryable());
}

#[test]
fn seeded_source_shared_across_threads_stays_bounded() {
    let entropy = Arc::new(SeededEntropy::with_max_wait(4, Duration::from_secs(5)));
    let store = store_with(entropy);

    thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                for _ in 0..REQUESTS_PER_THREAD {
                    assert!(store.ephemeral_key(EphemeralRequest::Symmetric).is_ok());
                }
            });
        }
    });
}
