//! DPS Key Store
//!
//! Supplies key material on demand to the DPS secure messaging layer. The
//! messaging layer never holds long-lived keys itself: when it needs to
//! encrypt, decrypt or authenticate it asks the key store through the
//! [`KeyProvider`] contract and receives key material or a typed failure.
//!
//! # Request Surface
//!
//! ```text
//! messaging layer
//!        │
//!        ▼ KeyRequest
//! ┌──────────────────────────────────────────────┐
//! │ KeyStore                                     │
//! │   NetworkKey  → network key + identifier     │
//! │   Key(id)     → binding table, then          │
//! │                 network / publisher /        │
//! │                 subscriber fallbacks         │
//! │   Ephemeral   → symmetric or P-384 / P-521   │
//! │   TrustAnchor → CA chain (certificate mode)  │
//! └──────────────────────────────────────────────┘
//!        │
//!        ▼ KeyResponse | KeyStoreError
//! ```
//!
//! # Modes
//!
//! The [`EncryptionMode`] is chosen once, when the store is built. Only
//! `CertificateBased` answers trust anchor requests, and only it requires
//! an own identity with a private key, which becomes the node identity.
//! Configuration problems are [`ConfigError`]s at build time; a store that
//! exists is always usable.
//!
//! # Security
//!
//! Key Hygiene:
//! - Symmetric keys, EC private scalars and passwords are zeroized on drop
//! - `Debug` implementations redact secret bytes
//! - Ephemeral keys are owned by the caller; the store keeps no copy
//!
//! Randomness:
//! - Ephemeral keys come from an [`EntropySource`], by default the OS RNG
//! - Entropy failure is reported as `GenerationFailed`, never replaced by
//!   weaker randomness
//!
//! Wire Compatibility:
//! - EC coordinates and scalars are fixed-width big-endian, 48 bytes for
//!   P-384 and 66 bytes for P-521
//! - Values that would not fit are rejected, never truncated

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod encoding;
pub mod entropy;
pub mod error;
pub mod generator;
pub mod material;
pub mod mode;
pub mod provision;
pub mod resolver;
pub mod store;
pub mod trust;

pub use encoding::{encode_fixed_width, strip_leading_zeros};
pub use entropy::{EntropySource, OsEntropy, SeededEntropy};
pub use error::{
    ConfigError, EntropyError, GenerationError, KeyStoreError, ProvisionError, WidthError,
};
pub use generator::{EphemeralKeyGenerator, EphemeralRequest};
pub use material::{
    CertificateIdentity, CurveId, EcCurve, EcKeyPair, KeyBinding, KeyId, KeyMaterial, NetworkKey,
    PrivateKey, SYMMETRIC_KEY_LEN, SymmetricKey,
};
pub use mode::{EncryptionMode, ModePolicy};
pub use provision::Provisioning;
pub use resolver::{KeyResolver, KeySource};
pub use store::{KeyProvider, KeyRequest, KeyResponse, KeyStore, KeyStoreBuilder};
pub use trust::{TrustAnchor, TrustAnchorProvider};
