// Copyright (c) 2022-2023 The MobileCoin Foundation

/// APDU encode / decode errors
#[derive(Copy, Clone, Debug, PartialEq, Eq, strum::Display)]
pub enum ApduError {
    /// Declared field length exceeds the remaining buffer
    #[strum(serialize = "truncated response")]
    Truncated,

    /// Buffer or field length invalid
    #[strum(serialize = "invalid length")]
    InvalidLength,

    /// Field contents invalid
    #[strum(serialize = "invalid encoding")]
    InvalidEncoding,
}

impl From<encdec::Error> for ApduError {
    fn from(e: encdec::Error) -> Self {
        match e {
            encdec::Error::Length => ApduError::InvalidLength,
            _ => ApduError::InvalidEncoding,
        }
    }
}
