// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Status words returned by the device and their mapping to error kinds

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter};

/// Known status words, returned as the trailing two bytes of every response
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, TryFromPrimitive)]
#[repr(u16)]
pub enum StatusWord {
    Ok = 0x9000,
    Deny = 0x6985,
    WrongP1P2 = 0x6A86,
    InsNotSupported = 0x6D00,
    ClaNotSupported = 0x6E00,
    WrongApduLength = 0x6E03,
    WrongResponseLength = 0xB000,
    DisplayBip32PathFail = 0xB001,
    DisplayAddressFail = 0xB002,
    DisplayAmountFail = 0xB003,
    WrongTxLength = 0xB004,
    TxParsingFail = 0xB005,
    TxHashFail = 0xB006,
    BadState = 0xB007,
    SignatureFail = 0xB008,
}

/// Display elements that may fail to render
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DisplayFailure {
    Path,
    Address,
    Amount,
}

/// Error kinds for non-success status words
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    /// Operation rejected by the user
    UserDenied,
    /// Invalid P1 / P2 parameters
    MalformedParameters,
    /// Unsupported class or instruction
    UnsupportedOperation,
    /// Invalid APDU length
    MalformedLength,
    /// Response too short
    ResponseTooShort,
    /// Failed to display an element for review
    Display(DisplayFailure),
    /// Transaction exceeds the device limit
    TxTooLong,
    /// Transaction could not be parsed
    TxParseFailure,
    /// Transaction hashing failed
    TxHashFailure,
    /// Device in an invalid state for the request
    BadState,
    /// Signing failed
    SignatureFailure,
    /// Unrecognised status word
    Unknown,
}

impl StatusWord {
    /// Resolve the error kind for a non-success status word
    pub fn error_kind(&self) -> Option<ErrorKind> {
        use StatusWord::*;

        let k = match self {
            Ok => return None,
            Deny => ErrorKind::UserDenied,
            WrongP1P2 => ErrorKind::MalformedParameters,
            InsNotSupported | ClaNotSupported => ErrorKind::UnsupportedOperation,
            WrongApduLength => ErrorKind::MalformedLength,
            WrongResponseLength => ErrorKind::ResponseTooShort,
            DisplayBip32PathFail => ErrorKind::Display(DisplayFailure::Path),
            DisplayAddressFail => ErrorKind::Display(DisplayFailure::Address),
            DisplayAmountFail => ErrorKind::Display(DisplayFailure::Amount),
            WrongTxLength => ErrorKind::TxTooLong,
            TxParsingFail => ErrorKind::TxParseFailure,
            TxHashFail => ErrorKind::TxHashFailure,
            BadState => ErrorKind::BadState,
            SignatureFail => ErrorKind::SignatureFailure,
        };

        Some(k)
    }
}

impl ErrorKind {
    /// Map a raw status word to an error kind, `None` on success
    pub fn from_status(status: u16) -> Option<Self> {
        match StatusWord::try_from(status) {
            Ok(s) => s.error_kind(),
            Err(_) => Some(ErrorKind::Unknown),
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ErrorKind::UserDenied => write!(f, "denied by user"),
            ErrorKind::MalformedParameters => write!(f, "malformed parameters"),
            ErrorKind::UnsupportedOperation => write!(f, "unsupported operation"),
            ErrorKind::MalformedLength => write!(f, "malformed length"),
            ErrorKind::ResponseTooShort => write!(f, "response too short"),
            ErrorKind::Display(d) => write!(f, "failed to display {}", d),
            ErrorKind::TxTooLong => write!(f, "transaction too long"),
            ErrorKind::TxParseFailure => write!(f, "transaction parsing failed"),
            ErrorKind::TxHashFailure => write!(f, "transaction hashing failed"),
            ErrorKind::BadState => write!(f, "bad state"),
            ErrorKind::SignatureFailure => write!(f, "signing failed"),
            ErrorKind::Unknown => write!(f, "unknown status"),
        }
    }
}
