//! Fuzz target for key pair generation under hostile entropy
//!
//! The fuzzer plays the entropy source, so every candidate scalar (zero,
//! above the group order, all ones) is reachable.
//!
//! # Invariants
//!
//! - Every key pair has components of exactly the curve's width
//! - The P-521 scalar never uses more than 521 bits
//! - Running out of candidates is `ScalarSearchExhausted`, a short script
//!   is an entropy failure
//! - NEVER panic

#![no_main]

use std::sync::{Arc, Mutex};

use arbitrary::Arbitrary;
use dps_keystore::{
    EcCurve, EntropyError, EntropySource, EphemeralKeyGenerator, GenerationError, KeyStoreError,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct Input {
    p521: bool,
    script: Vec<u8>,
}

/// Replays fuzzer bytes, failing once they run out.
struct ScriptedEntropy {
    remaining: Mutex<Vec<u8>>,
}

impl EntropySource for ScriptedEntropy {
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        let mut remaining = self.remaining.lock().unwrap();
        if remaining.len() < buffer.len() {
            return Err(EntropyError::Os { reason: "script exhausted".to_string() });
        }
        let rest = remaining.split_off(buffer.len());
        buffer.copy_from_slice(&remaining);
        *remaining = rest;
        Ok(())
    }
}

fuzz_target!(|input: Input| {
    let curve = if input.p521 { EcCurve::P521 } else { EcCurve::P384 };
    let entropy = ScriptedEntropy { remaining: Mutex::new(input.script) };
    let generator = EphemeralKeyGenerator::new(Arc::new(entropy));

    match generator.key_pair(curve) {
        Ok(pair) => {
            let width = curve.coordinate_width();
            assert_eq!(pair.x().len(), width);
            assert_eq!(pair.y().len(), width);
            assert_eq!(pair.d().len(), width);
            if curve == EcCurve::P521 {
                assert!(pair.d()[0] <= 0x01, "scalar exceeds 521 bits");
            }
        },
        Err(KeyStoreError::GenerationFailed(
            GenerationError::Entropy(_) | GenerationError::ScalarSearchExhausted { .. },
        )) => {},
        Err(e) => panic!("unexpected failure: {e}"),
    }
});
