// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / APDU definitions for communication with the alamgu signing app
//!
//! This module provides the command vocabulary, status words, derivation path
//! encoding and request / response encodings shared between hosts and the
//! device, as well as the codes and hashing used by the block protocol.
//!
//! APDUs use a primitive binary encoding, size-prefixed fields use a single
//! length byte and integers are encoded little-endian.
//!

#![no_std]

pub use ledger_apdu::{APDUAnswer, APDUCommand};

pub mod block;
pub mod path;
pub mod prelude;
pub mod public_key;
pub mod sign;
pub mod status;
pub mod version;

mod error;
pub use error::ApduError;

mod helpers;
pub use helpers::{pack_sized_field, unpack_sized_field};

/// Alamgu APDU class
pub const ALAMGU_APDU_CLA: u8 = 0x00;

/// Maximum data length for a single APDU frame
pub const MAX_APDU_LEN: usize = 255;

/// Parameter 1 for the first (and only) APDU of a command
pub const P1_START: u8 = 0x00;

/// Parameter 2 for the last APDU of a command
pub const P2_LAST: u8 = 0x00;

/// Alamgu APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq, strum::Display)]
#[repr(u8)]
pub enum Instruction {
    /// Fetch application version and name
    GetVersion = 0x00,

    /// Fetch a public key, displaying it for on-device confirmation
    VerifyAddress = 0x01,

    /// Fetch a public key without confirmation
    GetPublicKey = 0x02,

    /// Sign a transaction (requires confirmation)
    SignTx = 0x03,
}

/// Command header, shared by every frame of a logical command
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CommandHeader {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
}

impl CommandHeader {
    /// Create a header for the provided instruction with default class and parameters
    pub const fn new(ins: Instruction) -> Self {
        Self {
            cla: ALAMGU_APDU_CLA,
            ins: ins as u8,
            p1: P1_START,
            p2: P2_LAST,
        }
    }

    /// Build a command carrying the provided data using this header
    pub fn command<B>(&self, data: B) -> APDUCommand<B> {
        build_command(self.cla, self.ins, self.p1, self.p2, data)
    }
}

/// Build a command frame from its parts
pub fn build_command<B>(cla: u8, ins: u8, p1: u8, p2: u8, data: B) -> APDUCommand<B> {
    APDUCommand {
        cla,
        ins,
        p1,
        p2,
        data,
    }
}

/// Request APDUs, providing the header used for the request
pub trait ApduReq: encdec::Encode<Error = ApduError> {
    fn header(&self) -> CommandHeader;
}
