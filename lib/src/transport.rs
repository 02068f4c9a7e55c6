// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transports for communicating with alamgu devices, and a generic
//! transport abstraction for hiding underlying transport types
//!

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    ops::Deref,
};

use async_trait::async_trait;
use ledger_transport::{APDUAnswer, APDUCommand, Exchange};
use log::trace;
use strum::Display;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Mutex,
};

#[cfg(feature = "transport_hid")]
pub use ledger_transport_hid::{LedgerHIDError, TransportNativeHID};

use ledger_alamgu_apdu::MAX_APDU_LEN;

/// Default speculos APDU port
pub const DEFAULT_APDU_PORT: u16 = 9999;

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request exceeds frame length
    #[error("Invalid request length")]
    InvalidLength,

    /// Malformed response
    #[error("Invalid response")]
    InvalidAnswer,

    /// HID Init Error
    #[cfg(feature = "transport_hid")]
    #[error("could not create HidApi instance")]
    HidInit,

    /// Ledger HID Error
    #[cfg(feature = "transport_hid")]
    #[error("HID error: {0}")]
    Hid(#[from] LedgerHIDError),
}

/// TCP transport options
#[derive(Clone, Debug, PartialEq, clap::Args)]
pub struct TcpOptions {
    /// Speculos APDU address
    #[clap(long = "apdu-addr", default_value = "127.0.0.1", env = "APDU_ADDR")]
    pub addr: IpAddr,

    /// Speculos APDU port
    #[clap(long = "apdu-port", default_value_t = DEFAULT_APDU_PORT, env = "APDU_PORT")]
    pub port: u16,
}

impl Default for TcpOptions {
    fn default() -> Self {
        Self {
            addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_APDU_PORT,
        }
    }
}

impl TcpOptions {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

/// TCP transport for the speculos APDU socket.
///
/// Requests are sent as `LEN (u32 BE) ++ APDU`, responses are returned as
/// `LEN (u32 BE) ++ DATA ++ SW (2 bytes)` where `LEN` excludes the status word.
pub struct TransportTcp {
    s: Mutex<TcpStream>,
}

impl TransportTcp {
    /// Connect to a speculos APDU socket
    pub async fn new(opts: TcpOptions) -> Result<Self, TransportError> {
        let s = TcpStream::connect(opts.socket_addr()).await?;
        Ok(Self { s: Mutex::new(s) })
    }
}

/// Encode a command for the speculos APDU socket
fn encode_tcp<I: Deref<Target = [u8]>>(
    command: &APDUCommand<I>,
) -> Result<Vec<u8>, TransportError> {
    let data = command.data.deref();
    if data.len() > MAX_APDU_LEN {
        return Err(TransportError::InvalidLength);
    }

    let apdu_len = 5 + data.len();

    let mut buff = Vec::with_capacity(4 + apdu_len);
    buff.extend_from_slice(&(apdu_len as u32).to_be_bytes());
    buff.extend_from_slice(&[
        command.cla,
        command.ins,
        command.p1,
        command.p2,
        data.len() as u8,
    ]);
    buff.extend_from_slice(data);

    Ok(buff)
}

#[async_trait]
impl Exchange for TransportTcp {
    type Error = TransportError;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        let req = encode_tcp(command)?;

        let mut s = self.s.lock().await;

        trace!("TCP TX: {}", hex::encode(&req));
        s.write_all(&req).await?;

        // Response length excludes the status word
        let n = s.read_u32().await? as usize;
        let mut resp = vec![0u8; n + 2];
        s.read_exact(&mut resp).await?;

        trace!("TCP RX: {}", hex::encode(&resp));

        APDUAnswer::from_answer(resp).map_err(|_| TransportError::InvalidAnswer)
    }
}

/// Generic ledger device (abstract over transport types)
#[derive(Display)]
#[non_exhaustive]
pub enum GenericTransport {
    #[cfg(feature = "transport_hid")]
    Hid(TransportNativeHID),
    Tcp(TransportTcp),
}

/// Convert a HID transport into a generic transport
#[cfg(feature = "transport_hid")]
impl From<TransportNativeHID> for GenericTransport {
    fn from(t: TransportNativeHID) -> Self {
        Self::Hid(t)
    }
}

/// Convert a TCP transport into a generic transport
impl From<TransportTcp> for GenericTransport {
    fn from(t: TransportTcp) -> Self {
        Self::Tcp(t)
    }
}

/// Implementation of [Exchange] for [GenericTransport], hiding transport error types
#[async_trait]
impl Exchange for GenericTransport {
    type Error = TransportError;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        match self {
            #[cfg(feature = "transport_hid")]
            Self::Hid(t) => Ok(t.exchange(command).await?),
            Self::Tcp(t) => t.exchange(command).await,
        }
    }
}
