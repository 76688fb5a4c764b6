//! Secure random sources for ephemeral key generation.
//!
//! The key store never falls back to weaker randomness: a source that fails
//! or stalls reports an [`EntropyError`], which surfaces to the caller as a
//! generation failure.
//!
//! # Sources
//!
//! - [`OsEntropy`]: OS cryptographic RNG (getrandom). Inherently thread-safe
//! - [`SeededEntropy`]: ChaCha20 stream from a fixed seed. Reproducible, for
//!   tests and simulation only. Serialized behind a mutex that is acquired
//!   with a bounded wait

use std::{
    sync::{Mutex, TryLockError},
    thread,
    time::{Duration, Instant},
};

use rand_chacha::{
    ChaCha20Rng,
    rand_core::{RngCore, SeedableRng},
};

use crate::error::EntropyError;

/// Default upper bound on how long a caller waits for a serialized source.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_millis(250);

/// A cryptographically secure random source shared across threads.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `fill()` either fills the whole buffer with secure random bytes or
///   returns an error; partial or zero-filled output is never `Ok`
/// - `fill()` returns within a bounded time
pub trait EntropySource: Send + Sync {
    /// Fill `buffer` with random bytes.
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError>;
}

/// Operating system entropy via getrandom.
///
/// Uses `getrandom(2)` on Linux, `BCryptGenRandom` on Windows, and the
/// platform equivalent elsewhere. Needs no locking.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl OsEntropy {
    /// Create an OS entropy source.
    pub fn new() -> Self {
        Self
    }
}

impl EntropySource for OsEntropy {
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        getrandom::fill(buffer).map_err(|e| EntropyError::Os { reason: e.to_string() })
    }
}

/// Deterministic ChaCha20 source.
///
/// Same seed, same byte stream across all callers combined. Not suitable
/// for production keys.
#[derive(Debug)]
pub struct SeededEntropy {
    rng: Mutex<ChaCha20Rng>,
    max_wait: Duration,
}

impl SeededEntropy {
    /// Create a source seeded from a `u64`.
    pub fn from_seed(seed: u64) -> Self {
        Self::with_max_wait(seed, DEFAULT_MAX_WAIT)
    }

    /// Create a source with an explicit bound on lock acquisition.
    pub fn with_max_wait(seed: u64, max_wait: Duration) -> Self {
        Self { rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)), max_wait }
    }
}

impl EntropySource for SeededEntropy {
    #[allow(clippy::disallowed_methods)]
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        let start = Instant::now();
        let mut rng = loop {
            match self.rng.try_lock() {
                Ok(guard) => break guard,
                // The generator state is valid even if a holder panicked.
                Err(TryLockError::Poisoned(poisoned)) => break poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    let waited = start.elapsed();
                    if waited >= self.max_wait {
                        return Err(EntropyError::Stalled { waited });
                    }
                    thread::yield_now();
                },
            }
        };

        rng.try_fill_bytes(buffer).map_err(|e| EntropyError::Os { reason: e.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn os_entropy_bytes_are_random() {
        let source = OsEntropy::new();

        let mut bytes1 = [0u8; 32];
        let mut bytes2 = [0u8; 32];
        source.fill(&mut bytes1).unwrap();
        source.fill(&mut bytes2).unwrap();

        assert_ne!(bytes1, bytes2, "Random bytes should differ");
    }

    #[test]
    fn os_entropy_fills_buffer() {
        let mut bytes = [0u8; 64];
        OsEntropy::new().fill(&mut bytes).unwrap();

        let non_zero_count = bytes.iter().filter(|&&b| b != 0).count();
        assert!(non_zero_count > 32, "Most bytes should be non-zero");
    }

    #[test]
    fn seeded_entropy_is_reproducible() {
        let a = SeededEntropy::from_seed(42);
        let b = SeededEntropy::from_seed(42);

        let mut out_a = [0u8; 48];
        let mut out_b = [0u8; 48];
        a.fill(&mut out_a).unwrap();
        b.fill(&mut out_b).unwrap();
        assert_eq!(out_a, out_b);

        a.fill(&mut out_a).unwrap();
        assert_ne!(out_a, out_b, "stream must advance");
    }

    #[test]
    fn seeded_entropy_stalls_instead_of_hanging() {
        let source = Arc::new(SeededEntropy::with_max_wait(1, Duration::from_millis(20)));

        let held = source.rng.lock().unwrap();
        let contender = Arc::clone(&source);
        let result = thread::spawn(move || {
            let mut buf = [0u8; 8];
            contender.fill(&mut buf)
        })
        .join()
        .unwrap();
        drop(held);

        assert!(matches!(result, Err(EntropyError::Stalled { waited }) if waited >= Duration::from_millis(20)));
    }

    #[test]
    fn seeded_entropy_survives_poisoned_lock() {
        let source = Arc::new(SeededEntropy::from_seed(7));

        let poisoner = Arc::clone(&source);
        let _ = thread::spawn(move || {
            let _guard = poisoner.rng.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let mut buf = [0u8; 16];
        assert!(source.fill(&mut buf).is_ok());
    }
}
