//! Workspace root package. Carries the development git hooks; the key store
//! lives in `crates/dps-keystore`.
