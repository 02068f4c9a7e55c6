// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Block protocol definitions
//!
//! The block protocol moves payloads larger than a single APDU as chains of
//! content-addressed chunks. Each chunk body is the hash of the next chunk
//! followed by a slice of payload data, so the device can pull a payload
//! from its root hash and verify every chunk as it arrives.
//!
//! Once started, the exchange is driven by the device, with each response
//! carrying a [LedgerToHost] code and each subsequent request a
//! [HostToLedger] code.

use encdec::{Decode, Encode};
use num_enum::TryFromPrimitive;
use sha2::{Digest, Sha256};
use strum::Display;

use crate::{ApduError, MAX_APDU_LEN};

/// Maximum payload data per chunk
pub const CHUNK_SIZE: usize = 180;

/// Chunk hash length
pub const HASH_LEN: usize = 32;

/// Chunk hash (SHA-256 over the chunk body)
pub type ChunkHash = [u8; HASH_LEN];

/// Sentinel hash terminating a chunk chain
pub const ZERO_HASH: ChunkHash = [0u8; HASH_LEN];

/// Maximum number of payload roots in a single `START` frame
pub const MAX_ROOTS: usize = (MAX_APDU_LEN - 1) / HASH_LEN;

/// Host to device block protocol codes
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum HostToLedger {
    Start = 0,
    GetChunkResponseSuccess = 1,
    GetChunkResponseFailure = 2,
    PutChunkResponse = 3,
    ResultAccumulatingResponse = 4,
}

/// Device to host block protocol codes
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, TryFromPrimitive)]
#[repr(u8)]
pub enum LedgerToHost {
    ResultAccumulating = 0,
    ResultFinal = 1,
    GetChunk = 2,
    PutChunk = 3,
}

/// Compute the hash for a chunk body
pub fn chunk_hash(body: &[u8]) -> ChunkHash {
    let mut h = ZERO_HASH;
    h.copy_from_slice(&Sha256::digest(body));
    h
}

/// Block protocol frame, a single code byte followed by an optional payload.
///
/// Used in both directions, see [BlockFrame::host_code] and [BlockFrame::ledger_code]
/// to interpret the code.
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct BlockFrame<'a> {
    pub code: u8,
    pub payload: &'a [u8],
}

impl<'a> BlockFrame<'a> {
    /// Create a host to device frame
    pub fn host(code: HostToLedger, payload: &'a [u8]) -> Self {
        Self {
            code: code as u8,
            payload,
        }
    }

    /// Create a device to host frame
    pub fn ledger(code: LedgerToHost, payload: &'a [u8]) -> Self {
        Self {
            code: code as u8,
            payload,
        }
    }

    /// Interpret the frame code as a [HostToLedger] code, returning the raw code if unknown
    pub fn host_code(&self) -> Result<HostToLedger, u8> {
        HostToLedger::try_from(self.code).map_err(|_| self.code)
    }

    /// Interpret the frame code as a [LedgerToHost] code, returning the raw code if unknown
    pub fn ledger_code(&self) -> Result<LedgerToHost, u8> {
        LedgerToHost::try_from(self.code).map_err(|_| self.code)
    }
}

impl<'a> Encode for BlockFrame<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1 + self.payload.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.code;
        buff[1..n].copy_from_slice(self.payload);

        Ok(n)
    }
}

impl<'a> Decode<'a> for BlockFrame<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        match buff.split_first() {
            Some((code, payload)) => Ok((
                Self {
                    code: *code,
                    payload,
                },
                buff.len(),
            )),
            None => Err(ApduError::Truncated),
        }
    }
}
