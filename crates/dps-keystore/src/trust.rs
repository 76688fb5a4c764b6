//! Trust anchor provider.

use std::fmt;

use crate::{
    error::{ConfigError, KeyStoreError},
    material::require_pem,
};

/// PEM certificate chain of the certificate authorities the node trusts.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustAnchor(String);

impl TrustAnchor {
    /// Wrap a PEM certificate chain. The text must contain at least one
    /// `CERTIFICATE` block; it is otherwise passed through unchanged.
    pub fn new(pem: impl Into<String>) -> Result<Self, ConfigError> {
        let pem = pem.into();
        require_pem(&pem, &["CERTIFICATE"], "trust anchor certificate")?;
        Ok(Self(pem))
    }

    /// PEM text of the chain.
    pub fn pem(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustAnchor").field("pem_len", &self.0.len()).finish()
    }
}

/// Supplies the trust anchor when certificate mode is active.
#[derive(Debug, Clone)]
pub enum TrustAnchorProvider {
    /// Certificate mode: the configured chain
    Active(TrustAnchor),
    /// Any other mode: every request is answered with `MissingKey`
    Disabled,
}

impl TrustAnchorProvider {
    /// The configured chain.
    ///
    /// # Errors
    ///
    /// - `MissingKey` if the provider is disabled
    pub fn get(&self) -> Result<&TrustAnchor, KeyStoreError> {
        match self {
            Self::Active(anchor) => Ok(anchor),
            Self::Disabled => Err(KeyStoreError::MissingKey),
        }
    }

    /// True if trust anchor requests are answered.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}
