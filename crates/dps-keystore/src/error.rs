//! Error types for key store operations.
//!
//! Two layers: runtime failures returned to the messaging layer from every
//! request ([`KeyStoreError`]), and construction-time configuration errors
//! that prevent a key store from existing at all ([`ConfigError`]).

use std::time::Duration;

use thiserror::Error;

use crate::material::CurveId;

/// Errors returned by key store requests.
///
/// All of these are recoverable from the caller's point of view; none of
/// them leave the key store in a different state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyStoreError {
    /// Identifier is known to no binding and matches no fallback role.
    #[error("missing key")]
    MissingKey,

    /// Requested key kind or curve is not implemented.
    #[error("unsupported key: curve {curve}")]
    UnsupportedKey {
        /// Curve identifier that was requested
        curve: CurveId,
    },

    /// Fresh key material could not be produced.
    #[error("key generation failed: {0}")]
    GenerationFailed(#[from] GenerationError),
}

impl KeyStoreError {
    /// Returns true if the same request may succeed when retried later.
    ///
    /// Only generation failures are retryable: entropy may become available
    /// again. Missing and unsupported keys are answers, not accidents.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::GenerationFailed(_) => true,
            Self::MissingKey | Self::UnsupportedKey { .. } => false,
        }
    }
}

/// Reasons an ephemeral key could not be generated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// The secure random source failed.
    #[error("entropy source: {0}")]
    Entropy(#[from] EntropyError),

    /// No valid private scalar was found among the drawn candidates.
    #[error("no valid scalar after {attempts} candidates")]
    ScalarSearchExhausted {
        /// Number of candidates drawn
        attempts: u32,
    },

    /// A generated component did not fit its fixed-width field.
    #[error("encoding: {0}")]
    Encoding(#[from] WidthError),
}

/// Failures of an [`crate::EntropySource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntropyError {
    /// The operating system random source reported an error.
    #[error("os random source failed: {reason}")]
    Os {
        /// Error reported by the platform
        reason: String,
    },

    /// The source did not become available within its bounded wait.
    #[error("entropy source stalled after {waited:?}")]
    Stalled {
        /// How long we waited
        waited: Duration,
    },
}

/// A big-endian integer does not fit the requested fixed width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("value of {significant} bytes does not fit width {width}")]
pub struct WidthError {
    /// Length of the value with leading zero bytes removed
    pub significant: usize,
    /// Width that was requested
    pub width: usize,
}

/// Construction-time configuration errors.
///
/// Any of these prevents a [`crate::KeyStore`] from being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Numeric encryption mode selector outside `0..=2`.
    #[error("unknown encryption mode: {0}")]
    UnknownMode(u8),

    /// Certificate mode selected without a trust anchor.
    #[error("certificate mode requires a trust anchor")]
    MissingTrustAnchor,

    /// Certificate mode selected without an own (subscriber) identity.
    #[error("certificate mode requires a node identity")]
    MissingNodeIdentity,

    /// The own identity has no private key and password.
    #[error("node identity {id} carries no private key")]
    NodeIdentityWithoutPrivateKey {
        /// Hex rendering of the offending identifier
        id: String,
    },

    /// Symmetric key is not an AES-256 key.
    #[error("invalid symmetric key length: expected {expected}, got {actual}")]
    InvalidSymmetricKeyLength {
        /// Required length
        expected: usize,
        /// Provided length
        actual: usize,
    },

    /// Key identifier has no bytes.
    #[error("key identifier is empty")]
    EmptyKeyId,

    /// Text expected to be PEM has no matching armor boundary.
    #[error("malformed PEM: expected {what}")]
    MalformedPem {
        /// What kind of PEM block was expected
        what: &'static str,
    },
}

/// Errors loading a provisioning document.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Document could not be read.
    #[error("cannot read provisioning document: {0}")]
    Io(#[from] std::io::Error),

    /// Document is not valid JSON for the provisioning schema.
    #[error("invalid provisioning document: {0}")]
    Json(#[from] serde_json::Error),

    /// A hex field did not decode.
    #[error("invalid hex in {field}: {source}")]
    Hex {
        /// Location of the field in the document
        field: String,
        /// Decoder error
        source: hex::FromHexError,
    },

    /// Private key given without password, or password without key.
    #[error("{field}: private key and password must be given together")]
    IncompletePrivateKey {
        /// Location of the certificate in the document
        field: String,
    },

    /// Provisioned values failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
