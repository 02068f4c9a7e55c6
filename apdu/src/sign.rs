// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction signing APDUs

use byteorder::{ByteOrder, LittleEndian};
use encdec::{Decode, Encode};

use crate::{
    helpers::{pack_sized_field, unpack_sized_field},
    path::DerivationPath,
    ApduError, ApduReq, CommandHeader, Instruction,
};

/// Length of transaction signatures
pub const SIGNATURE_LEN: usize = 64;

/// Transaction signing request
///
/// As transactions may exceed the maximum APDU length, this is delivered
/// via a transfer strategy rather than as a single APDU.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          TX_LEN (LE)                          |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                        TRANSACTION...                         /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /                      DERIVATION_PATH...                       /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct SignTxReq<'a> {
    /// Serialised transaction
    pub tx: &'a [u8],
    /// Path for signing key derivation
    pub path: DerivationPath,
}

impl<'a> SignTxReq<'a> {
    /// Create a new [SignTxReq]
    pub fn new(tx: &'a [u8], path: DerivationPath) -> Self {
        Self { tx, path }
    }
}

impl<'a> ApduReq for SignTxReq<'a> {
    fn header(&self) -> CommandHeader {
        CommandHeader::new(Instruction::SignTx)
    }
}

impl<'a> Encode for SignTxReq<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(4 + self.tx.len() + self.path.encode_len()?)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let mut index = 0;

        if self.tx.len() > u32::MAX as usize || buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        // Write transaction length and body
        LittleEndian::write_u32(&mut buff[index..], self.tx.len() as u32);
        index += 4;

        buff[index..][..self.tx.len()].copy_from_slice(self.tx);
        index += self.tx.len();

        // Write path
        index += self.path.encode(&mut buff[index..])?;

        Ok(index)
    }
}

impl<'a> Decode<'a> for SignTxReq<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        if buff.len() < 4 {
            return Err(ApduError::Truncated);
        }

        let tx_len = LittleEndian::read_u32(buff) as usize;
        if buff.len() - 4 < tx_len {
            return Err(ApduError::Truncated);
        }
        let tx = &buff[4..][..tx_len];

        let (path, n) = DerivationPath::decode(&buff[4 + tx_len..])?;

        Ok((Self { tx, path }, 4 + tx_len + n))
    }
}

/// Transaction signature response, a size-prefixed signature
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct SignTxResp {
    pub signature: [u8; SIGNATURE_LEN],
}

impl Encode for SignTxResp {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1 + SIGNATURE_LEN)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        pack_sized_field(&self.signature, buff)
    }
}

impl<'a> Decode<'a> for SignTxResp {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        let (_rest, n, value) = unpack_sized_field(buff)?;
        if n != SIGNATURE_LEN {
            return Err(ApduError::InvalidLength);
        }

        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(value);

        Ok((Self { signature }, 1 + n))
    }
}
