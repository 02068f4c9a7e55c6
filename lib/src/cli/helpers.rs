// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::str::FromStr;

use ledger_alamgu::apdu::path::DerivationPath;

/// Variable length hex-encoded data
#[derive(Clone, PartialEq, Debug)]
pub struct HexData(pub Vec<u8>);

impl FromStr for HexData {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(s).map(HexData)
    }
}

impl AsRef<[u8]> for HexData {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for HexData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

/// Parse derivation paths for clap, mapping errors for display
pub fn parse_path(s: &str) -> Result<DerivationPath, String> {
    DerivationPath::from_str(s).map_err(|e| e.to_string())
}
