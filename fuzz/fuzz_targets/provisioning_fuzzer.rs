//! Fuzz target for provisioning documents
//!
//! # Strategy
//!
//! - Arbitrary text through the JSON parser
//! - Every mode for documents that parse
//!
//! # Invariants
//!
//! - Parsing and building return errors, NEVER panic
//! - A document that builds in certificate mode has a node identity
//! - A built store answers the network key request

#![no_main]

use dps_keystore::{EncryptionMode, KeyProvider, Provisioning};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (u8, &str)| {
    let (selector, text) = data;
    let Ok(document) = Provisioning::from_json(text) else {
        return;
    };
    let Ok(mode) = EncryptionMode::try_from(selector % 3) else {
        return;
    };

    if let Ok(store) = document.build(mode) {
        assert!(store.network_key().is_ok());
        assert_eq!(store.node_identity().is_some(), mode == EncryptionMode::CertificateBased);
    }
});
