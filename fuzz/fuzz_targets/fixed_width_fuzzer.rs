//! Fuzz target for fixed-width big-endian encoding
//!
//! # Strategy
//!
//! - Arbitrary values, including long runs of leading zeros
//! - Widths around the P-384 and P-521 coordinate sizes
//!
//! # Invariants
//!
//! - Success always yields exactly `width` bytes
//! - The encoded integer equals the input integer
//! - Failure happens only when the significant bytes exceed `width`
//! - NEVER truncate, NEVER panic

#![no_main]

use arbitrary::Arbitrary;
use dps_keystore::{encode_fixed_width, strip_leading_zeros};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct Input {
    leading_zeros: u8,
    value: Vec<u8>,
    width: Width,
}

#[derive(Debug, Clone, Arbitrary)]
enum Width {
    P384,
    P521,
    Symmetric,
    Other(u8),
}

impl Width {
    fn bytes(&self) -> usize {
        match self {
            Width::P384 => 48,
            Width::P521 => 66,
            Width::Symmetric => 32,
            Width::Other(n) => usize::from(*n),
        }
    }
}

fuzz_target!(|input: Input| {
    let mut value = vec![0u8; usize::from(input.leading_zeros)];
    value.extend_from_slice(&input.value);
    let width = input.width.bytes();
    let significant = strip_leading_zeros(&value);

    match encode_fixed_width(&value, width) {
        Ok(encoded) => {
            // INVARIANT 1: exact width
            assert_eq!(encoded.len(), width, "encoded length must equal width");

            // INVARIANT 2: same integer
            assert_eq!(strip_leading_zeros(&encoded), significant, "value changed");
        },
        Err(e) => {
            // INVARIANT 3: only oversized values fail
            assert!(significant.len() > width, "rejected a value that fits");
            assert_eq!(e.significant, significant.len());
            assert_eq!(e.width, width);
        },
    }
});
