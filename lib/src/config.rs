// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Device handle configuration
//!
//! Loadable via `serde` (with defaults for missing fields) or flattened into
//! command line options via `clap`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use ledger_alamgu_apdu::{
    block::{CHUNK_SIZE, HASH_LEN},
    MAX_APDU_LEN,
};

/// Strategy used to move command payloads to the device
#[derive(
    Copy, Clone, Debug, Default, PartialEq, clap::ValueEnum, strum::Display, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransferMode {
    /// Split payloads into consecutive frames
    #[default]
    Direct,
    /// Device-driven hash-linked chunk protocol
    Blocks,
}

/// Device handle configuration
#[derive(Clone, Debug, PartialEq, clap::Args, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Payload transfer strategy
    #[clap(long, value_enum, default_value_t = TransferMode::Direct, env = "ALAMGU_TRANSFER")]
    pub transfer: TransferMode,

    /// Maximum data length per frame
    #[clap(long, default_value_t = MAX_APDU_LEN)]
    pub frame_size: usize,

    /// Maximum payload data per block protocol chunk
    #[clap(long, default_value_t = CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Per-exchange timeout in seconds (disabled if unset)
    #[clap(long = "request-timeout-s")]
    pub request_timeout_s: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transfer: TransferMode::Direct,
            frame_size: MAX_APDU_LEN,
            chunk_size: CHUNK_SIZE,
            request_timeout_s: None,
        }
    }
}

/// Configuration validation errors
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("frame size {0} outside 1..={MAX_APDU_LEN}")]
    FrameSize(usize),

    #[error("chunk size {0} does not fit a {1} byte frame")]
    ChunkSize(usize, usize),
}

impl Config {
    /// Check frame and chunk sizes are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_size == 0 || self.frame_size > MAX_APDU_LEN {
            return Err(ConfigError::FrameSize(self.frame_size));
        }

        // GET_CHUNK_RESPONSE_SUCCESS ++ previous hash ++ data
        if self.chunk_size == 0 || 1 + HASH_LEN + self.chunk_size > self.frame_size {
            return Err(ConfigError::ChunkSize(self.chunk_size, self.frame_size));
        }

        Ok(())
    }

    /// Fetch the per-exchange timeout where configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_s.map(Duration::from_secs)
    }
}
