// Copyright (c) 2022-2023 The MobileCoin Foundation

use core::fmt::Debug;
use std::fmt::Display;

use ledger_alamgu_apdu::{path::PathError, status::ErrorKind, ApduError};
use tokio::time::error::Elapsed;

/// Ledger Alamgu API Error Type, generic over transport errors
#[derive(Debug, thiserror::Error)]
pub enum Error<E: Display + Debug> {
    /// Transport error, frame exchange failed
    #[error("Transport error {0}")]
    Transport(E),

    /// Device returned a failure status
    #[error("Device error: {0}")]
    Device(DeviceError),

    /// Unrecognised block protocol instruction from the device
    #[error("Unknown block protocol instruction: 0x{0:02x}")]
    UnknownInstruction(u8),

    /// Block protocol response contained no instruction
    #[error("Empty block protocol response")]
    EmptyResponse,

    /// Response decoding failed
    #[error("APDU decode failed: {0}")]
    Apdu(ApduError),

    /// Invalid derivation path
    #[error("Invalid derivation path: {0}")]
    Path(PathError),

    /// Frame exceeds transport capacity
    #[error("Frame length {0} exceeds maximum {1}")]
    FrameTooLarge(usize, usize),

    /// Request timeout
    #[error("Timeout waiting for device response")]
    RequestTimeout,

    /// Pending operation ended without a result
    #[error("Operation cancelled")]
    Cancelled,
}

/// Device-reported failure, containing the raw status word and any error data
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceError {
    pub kind: ErrorKind,
    pub status: u16,
    pub data: Vec<u8>,
}

impl Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (status: 0x{:04x}", self.kind, self.status)?;
        if !self.data.is_empty() {
            write!(f, ", data: {}", hex::encode(&self.data))?;
        }
        write!(f, ")")
    }
}

impl<E: Display + Debug> Error<E> {
    /// Fetch the device error kind where the device reported a failure
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Device(d) => Some(d.kind),
            _ => None,
        }
    }

    /// Fetch the device error where the device reported a failure
    pub fn device(&self) -> Option<&DeviceError> {
        match self {
            Error::Device(d) => Some(d),
            _ => None,
        }
    }
}

impl<E: Display + Debug> From<ApduError> for Error<E> {
    fn from(e: ApduError) -> Self {
        Error::Apdu(e)
    }
}

impl<E: Display + Debug> From<PathError> for Error<E> {
    fn from(e: PathError) -> Self {
        Error::Path(e)
    }
}

impl<E: Display + Debug> From<Elapsed> for Error<E> {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}
