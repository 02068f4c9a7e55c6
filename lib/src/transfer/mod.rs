// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transfer strategies, moving logical command payloads over a frame-limited [Exchange]
//!
//! - [Direct] splits payloads into consecutive frames sharing a command header
//! - [Blocks] publishes payloads as hash-linked chunks and answers device requests
//!   until a final result is returned
//!
//! Both report the frame the device may hold while awaiting user confirmation
//! via [Progress], for the last frame of a direct send or any frame once every
//! payload chunk has been served.

use std::{
    fmt::{Debug, Display},
    time::Duration,
};

use ledger_transport::Exchange;
use log::trace;

use ledger_alamgu_apdu::{status::ErrorKind, CommandHeader, MAX_APDU_LEN};

use crate::{
    config::{Config, TransferMode},
    error::DeviceError,
    Error,
};

mod direct;
pub use direct::Direct;

mod blocks;
pub use blocks::{BlockSession, BlockStats, Blocks, Step};

/// Notified ahead of frames the device may hold while awaiting user confirmation
pub trait Progress: Sync {
    /// Called before sending a frame that may block on the user
    fn confirmable(&self);
}

/// No-op for transfers without pending handles
impl Progress for () {
    fn confirmable(&self) {}
}

/// Transfer strategy, selected once per device handle
#[derive(Clone, Debug, PartialEq)]
pub enum Transfer {
    Direct(Direct),
    Blocks(Blocks),
}

impl From<&Config> for Transfer {
    fn from(c: &Config) -> Self {
        match c.transfer {
            TransferMode::Direct => Transfer::Direct(Direct {
                frame_size: c.frame_size,
            }),
            TransferMode::Blocks => Transfer::Blocks(Blocks {
                frame_size: c.frame_size,
                chunk_size: c.chunk_size,
            }),
        }
    }
}

impl Default for Transfer {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl Transfer {
    /// Send a logical command payload, returning the logical response data
    pub async fn send<T, P>(
        &self,
        t: &T,
        progress: &P,
        header: &CommandHeader,
        payload: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, Error<T::Error>>
    where
        T: Exchange + Send + Sync,
        T::Error: Display + Debug,
        P: Progress + ?Sized,
    {
        match self {
            Transfer::Direct(d) => d.send(t, progress, header, payload, timeout).await,
            Transfer::Blocks(b) => b.send(t, progress, header, &[payload], timeout).await,
        }
    }

    /// Fetch the transfer mode
    pub fn mode(&self) -> TransferMode {
        match self {
            Transfer::Direct(_) => TransferMode::Direct,
            Transfer::Blocks(_) => TransferMode::Blocks,
        }
    }
}

/// Exchange a single frame, mapping failure status words to [Error::Device]
pub(crate) async fn exchange<T>(
    t: &T,
    header: &CommandHeader,
    data: &[u8],
    timeout: Option<Duration>,
) -> Result<Vec<u8>, Error<T::Error>>
where
    T: Exchange + Send + Sync,
    T::Error: Display + Debug,
{
    if data.len() > MAX_APDU_LEN {
        return Err(Error::FrameTooLarge(data.len(), MAX_APDU_LEN));
    }

    let cmd = header.command(data);

    trace!(
        "TX ins: 0x{:02x} p1: 0x{:02x} data: {}",
        cmd.ins,
        cmd.p1,
        hex::encode(data)
    );

    let f = t.exchange(&cmd);
    let answer = match timeout {
        Some(d) => tokio::time::timeout(d, f).await?,
        None => f.await,
    }
    .map_err(Error::Transport)?;

    let status = answer.retcode();
    let data = answer.data().to_vec();

    trace!("RX status: 0x{:04x} data: {}", status, hex::encode(&data));

    match ErrorKind::from_status(status) {
        None => Ok(data),
        Some(kind) => Err(Error::Device(DeviceError { kind, status, data })),
    }
}
