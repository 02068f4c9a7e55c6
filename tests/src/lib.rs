// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Tests for alamgu signing app integration.
//!
//! Generic over [ledger_transport::Exchange] for reuse against physical
//! devices, the speculos simulator, or the in-process [mock::MockDevice].
//!

pub mod mock;




/// Derivation path used by the example app tests
pub const TEST_PATH: &str = "m/44'/535348'/0'";

/// Expected public key for [TEST_PATH]
pub const TEST_PUBLIC_KEY: &str =
    "19e2fea57e82293b4fee8120d934f0c5a4907198f8df29e9a153cfd7d9383488";

/// Expected application name
pub const APP_NAME: &str = "alamgu example";

/// Parse a derivation path for tests
pub fn parse_path(s: &str) -> anyhow::Result<ledger_alamgu::apdu::path::DerivationPath> {
    s.parse()
        .map_err(|e| anyhow::anyhow!("invalid path '{}': {}", s, e))
}
