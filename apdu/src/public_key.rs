// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Public key APDUs

use encdec::{Decode, Encode};

use crate::{
    helpers::{pack_sized_field, unpack_sized_field},
    path::DerivationPath,
    ApduError, ApduReq, CommandHeader, Instruction,
};

/// Public key request APDU, optionally requiring on-device confirmation
///
/// ## Encoding:
/// Encoded [DerivationPath]
#[derive(Clone, PartialEq, Debug)]
pub struct PublicKeyReq {
    /// Path for key derivation
    pub path: DerivationPath,
    /// Display the key for confirmation prior to responding
    pub confirm: bool,
}

impl PublicKeyReq {
    /// Create a new [PublicKeyReq] APDU
    pub fn new(path: DerivationPath, confirm: bool) -> Self {
        Self { path, confirm }
    }
}

impl ApduReq for PublicKeyReq {
    fn header(&self) -> CommandHeader {
        match self.confirm {
            true => CommandHeader::new(Instruction::VerifyAddress),
            false => CommandHeader::new(Instruction::GetPublicKey),
        }
    }
}

impl Encode for PublicKeyReq {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        self.path.encode_len()
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        self.path.encode(buff)
    }
}

/// Public key response APDU
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    KEY_LEN    |                                               /
/// +-+-+-+-+-+-+-+-+                                               /
/// /                       PUBLIC_KEY (KEY_LEN)                    /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   CHAIN_LEN   |                                               /
/// +-+-+-+-+-+-+-+-+                                               /
/// /                      CHAIN_CODE (CHAIN_LEN)                   /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct PublicKeyResp<'a> {
    pub public_key: &'a [u8],
    pub chain_code: &'a [u8],
}

impl<'a> PublicKeyResp<'a> {
    pub fn new(public_key: &'a [u8], chain_code: &'a [u8]) -> Self {
        Self {
            public_key,
            chain_code,
        }
    }
}

impl<'a> Encode for PublicKeyResp<'a> {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(2 + self.public_key.len() + self.chain_code.len())
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let mut index = 0;

        index += pack_sized_field(self.public_key, &mut buff[index..])?;
        index += pack_sized_field(self.chain_code, &mut buff[index..])?;

        Ok(index)
    }
}

impl<'a> Decode<'a> for PublicKeyResp<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        let (rest, _, public_key) = unpack_sized_field(buff)?;
        let (rest, _, chain_code) = unpack_sized_field(rest)?;

        Ok((
            Self {
                public_key,
                chain_code,
            },
            buff.len() - rest.len(),
        ))
    }
}
