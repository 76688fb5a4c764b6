//! Encryption mode selection.
//!
//! The mode is fixed when a key store is built. It decides which key
//! sources are wired in and whether the node must present an identity:
//!
//! | Mode               | Network key | Per-ID | Ephemeral | Trust anchor | Node identity |
//! |--------------------|-------------|--------|-----------|--------------|---------------|
//! | `None`             | active      | active | active    | disabled     | no            |
//! | `PreSharedKey`     | active      | active | active    | disabled     | no            |
//! | `CertificateBased` | active      | active | active    | active       | yes           |

use std::fmt;

use crate::error::ConfigError;

/// Encryption policy for the lifetime of a key store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionMode {
    /// No encryption
    None,
    /// Pre-shared symmetric keys
    PreSharedKey,
    /// Certificates and elliptic-curve keys
    CertificateBased,
}

/// Which optional components a mode wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePolicy {
    /// Trust anchor requests are answered
    pub trust_anchor: bool,
    /// An own identity with a private key must be provisioned and is
    /// handed to the messaging layer as the node identity
    pub node_identity: bool,
}

impl EncryptionMode {
    /// Components wired in for this mode.
    pub fn policy(self) -> ModePolicy {
        match self {
            Self::None | Self::PreSharedKey => {
                ModePolicy { trust_anchor: false, node_identity: false }
            },
            Self::CertificateBased => ModePolicy { trust_anchor: true, node_identity: true },
        }
    }
}

impl TryFrom<u8> for EncryptionMode {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::PreSharedKey),
            2 => Ok(Self::CertificateBased),
            other => Err(ConfigError::UnknownMode(other)),
        }
    }
}

impl From<EncryptionMode> for u8 {
    fn from(mode: EncryptionMode) -> Self {
        match mode {
            EncryptionMode::None => 0,
            EncryptionMode::PreSharedKey => 1,
            EncryptionMode::CertificateBased => 2,
        }
    }
}

impl fmt::Display for EncryptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::PreSharedKey => "pre-shared-key",
            Self::CertificateBased => "certificate",
        };
        f.write_str(name)
    }
}
