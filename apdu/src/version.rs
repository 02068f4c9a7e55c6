// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Application version APDUs

use encdec::{Decode, Encode};

use crate::{ApduError, ApduReq, CommandHeader, Instruction};

/// Fetch application version APDU (empty payload)
#[derive(Copy, Clone, PartialEq, Debug, Default)]
pub struct AppVersionReq;

impl ApduReq for AppVersionReq {
    fn header(&self) -> CommandHeader {
        CommandHeader::new(Instruction::GetVersion)
    }
}

impl Encode for AppVersionReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, Self::Error> {
        Ok(0)
    }

    fn encode(&self, _buff: &mut [u8]) -> Result<usize, Self::Error> {
        Ok(0)
    }
}

/// Application version response APDU
///
/// ## Encoding
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     MAJOR     |     MINOR     |     PATCH     |               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+               /
/// /                     NAME (ASCII, remainder)                   /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AppVersionResp<'a> {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    /// Application name
    pub name: &'a str,
}

impl<'a> AppVersionResp<'a> {
    /// Create a new application version response
    pub fn new(version: (u8, u8, u8), name: &'a str) -> Self {
        Self {
            major: version.0,
            minor: version.1,
            patch: version.2,
            name,
        }
    }
}

impl<'a> Encode for AppVersionResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(3 + self.name.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }
        if !self.name.is_ascii() {
            return Err(ApduError::InvalidEncoding);
        }

        buff[0] = self.major;
        buff[1] = self.minor;
        buff[2] = self.patch;
        buff[3..n].copy_from_slice(self.name.as_bytes());

        Ok(n)
    }
}

impl<'a> Decode<'a> for AppVersionResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        if buff.len() < 3 {
            return Err(ApduError::Truncated);
        }

        // Name consumes the remainder of the buffer
        let name = &buff[3..];
        if !name.is_ascii() {
            return Err(ApduError::InvalidEncoding);
        }
        let name = core::str::from_utf8(name).map_err(|_| ApduError::InvalidEncoding)?;

        Ok((
            Self {
                major: buff[0],
                minor: buff[1],
                patch: buff[2],
                name,
            },
            buff.len(),
        ))
    }
}
