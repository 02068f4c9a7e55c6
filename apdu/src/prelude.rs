//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    block::{BlockFrame, ChunkHash, HostToLedger, LedgerToHost, CHUNK_SIZE, ZERO_HASH},
    path::{DerivationPath, PathError, PathIndex},
    public_key::{PublicKeyReq, PublicKeyResp},
    sign::{SignTxReq, SignTxResp, SIGNATURE_LEN},
    status::{DisplayFailure, ErrorKind, StatusWord},
    version::{AppVersionReq, AppVersionResp},
    ApduError, ApduReq, CommandHeader, Instruction,
};
