//! Ephemeral key generation.
//!
//! Produces fresh symmetric keys or elliptic-curve key pairs on request. The
//! generator keeps no copy of anything it hands out.
//!
//! # Scalar Generation
//!
//! Private scalars are found by candidate testing: draw `width` random bytes,
//! clear the bits above the curve's bit size, and accept the candidate if it
//! is a valid scalar (`1 <= d < n`). For P-384 and P-521 the acceptance
//! probability per candidate is close to 1, so [`MAX_SCALAR_CANDIDATES`] is
//! only reached when the entropy source is broken.

use std::sync::Arc;

use p384::elliptic_curve::sec1::ToEncodedPoint;
use zeroize::{Zeroize, Zeroizing};

use crate::{
    encoding::encode_fixed_width,
    entropy::EntropySource,
    error::{GenerationError, KeyStoreError},
    material::{CurveId, EcCurve, EcKeyPair, KeyMaterial, SYMMETRIC_KEY_LEN, SymmetricKey},
};

/// Upper bound on scalar candidates drawn for one key pair.
pub const MAX_SCALAR_CANDIDATES: u32 = 64;

/// Kind of ephemeral key being requested.
///
/// Closed set: every request is either a symmetric key or a key pair on a
/// wire-identified curve. Curves outside [`EcCurve`] are answered with
/// [`KeyStoreError::UnsupportedKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EphemeralRequest {
    /// 32-byte symmetric key
    Symmetric,
    /// Elliptic-curve key pair
    EllipticCurve {
        /// Requested curve
        curve: CurveId,
    },
}

/// Generates fresh key material from a shared entropy source.
#[derive(Clone)]
pub struct EphemeralKeyGenerator {
    entropy: Arc<dyn EntropySource>,
}

impl EphemeralKeyGenerator {
    /// Create a generator drawing from `entropy`.
    pub fn new(entropy: Arc<dyn EntropySource>) -> Self {
        Self { entropy }
    }

    /// Answer an ephemeral key request.
    ///
    /// # Errors
    ///
    /// - `UnsupportedKey` if the curve is not P-384 or P-521
    /// - `GenerationFailed` if entropy fails or no valid key could be formed
    pub fn generate(&self, request: EphemeralRequest) -> Result<KeyMaterial, KeyStoreError> {
        match request {
            EphemeralRequest::Symmetric => self.symmetric().map(KeyMaterial::Symmetric),
            EphemeralRequest::EllipticCurve { curve } => {
                let Some(ec_curve) = EcCurve::from_id(curve) else {
                    return Err(KeyStoreError::UnsupportedKey { curve });
                };
                self.key_pair(ec_curve).map(KeyMaterial::EllipticCurve)
            },
        }
    }

    /// Fresh 32-byte symmetric key.
    pub fn symmetric(&self) -> Result<SymmetricKey, KeyStoreError> {
        let mut bytes = [0u8; SYMMETRIC_KEY_LEN];
        self.entropy.fill(&mut bytes).map_err(GenerationError::from)?;

        let key = SymmetricKey::new(bytes);
        bytes.zeroize();

        tracing::debug!(kind = "symmetric", "generated ephemeral key");
        Ok(key)
    }

    /// Fresh key pair on `curve`, every component `curve.coordinate_width()`
    /// bytes wide.
    pub fn key_pair(&self, curve: EcCurve) -> Result<EcKeyPair, KeyStoreError> {
        let width = curve.coordinate_width();
        let top_byte_mask = 0xFFu8 >> (width * 8 - curve.bit_size());

        let mut candidate = Zeroizing::new(vec![0u8; width]);
        for attempt in 1..=MAX_SCALAR_CANDIDATES {
            self.entropy.fill(&mut candidate).map_err(GenerationError::from)?;
            candidate[0] &= top_byte_mask;

            if let Some(raw) = RawKeyPair::from_scalar(curve, &candidate) {
                let pair = raw.encode(curve)?;
                tracing::debug!(
                    kind = "elliptic-curve",
                    %curve,
                    candidates = attempt,
                    "generated ephemeral key"
                );
                return Ok(pair);
            }
        }

        tracing::debug!(%curve, attempts = MAX_SCALAR_CANDIDATES, "scalar search exhausted");
        Err(GenerationError::ScalarSearchExhausted { attempts: MAX_SCALAR_CANDIDATES }.into())
    }
}

/// Key pair components in whatever encoding the curve library produced.
struct RawKeyPair {
    x: Vec<u8>,
    y: Vec<u8>,
    d: Zeroizing<Vec<u8>>,
}

impl RawKeyPair {
    /// Derive the public point for a candidate scalar. `None` if the
    /// candidate is not a valid scalar for `curve`.
    fn from_scalar(curve: EcCurve, scalar: &[u8]) -> Option<Self> {
        match curve {
            EcCurve::P384 => {
                let secret = p384::SecretKey::from_slice(scalar).ok()?;
                let point = secret.public_key().to_encoded_point(false);
                Some(Self {
                    x: point.x()?.to_vec(),
                    y: point.y()?.to_vec(),
                    d: Zeroizing::new(secret.to_bytes().to_vec()),
                })
            },
            EcCurve::P521 => {
                let secret = p521::SecretKey::from_slice(scalar).ok()?;
                let point = secret.public_key().to_encoded_point(false);
                Some(Self {
                    x: point.x()?.to_vec(),
                    y: point.y()?.to_vec(),
                    d: Zeroizing::new(secret.to_bytes().to_vec()),
                })
            },
        }
    }

    /// Re-encode every component at the curve's fixed width.
    ///
    /// A component wider than the curve is an invariant violation and fails
    /// closed.
    fn encode(&self, curve: EcCurve) -> Result<EcKeyPair, GenerationError> {
        let width = curve.coordinate_width();
        let x = encode_fixed_width(&self.x, width)?;
        let y = encode_fixed_width(&self.y, width)?;
        let d = encode_fixed_width(&self.d, width)?;
        Ok(EcKeyPair::new(curve, x, y, d)?)
    }
}
