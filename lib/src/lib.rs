// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Ledger Alamgu API Library (and CLI)
//!
//! Provides a [DeviceHandle] for interacting with the alamgu signing app over
//! any [Exchange] transport, moving large payloads using either direct
//! chunking or the block protocol (see [transfer]).

use std::fmt::Debug;

pub use ledger_transport::{APDUAnswer, APDUCommand, Exchange};

use async_trait::async_trait;

#[cfg(feature = "transport_hid")]
use hidapi::HidApi;

/// Re-export transports for consumer use
pub mod transport;
use transport::*;

/// Re-export `ledger-alamgu-apdu` for consumers
pub use ledger_alamgu_apdu::{self as apdu};

pub mod chunk;
pub mod config;
pub mod transfer;
pub mod tracked;

mod handle;
pub use handle::{AppVersion, DeviceHandle, PublicKey};

mod pending;
pub use pending::Pending;

mod error;
pub use error::{DeviceError, Error};

/// Ledger provider manages ledger devices and connections
pub struct LedgerProvider {
    #[cfg(feature = "transport_hid")]
    hid_api: HidApi,
}

/// Device discovery filter
#[derive(Copy, Clone, Debug, PartialEq, clap::ValueEnum, strum::Display)]
#[non_exhaustive]
pub enum Filter {
    /// List all devices available using supported transport
    Any,
    /// List only HID devices
    Hid,
    /// List only TCP devices
    Tcp,
}

/// Ledger device information for listing, used by connect
#[derive(Debug)]
pub enum LedgerInfo {
    #[cfg(feature = "transport_hid")]
    Hid(hidapi::DeviceInfo),
    Tcp(TcpOptions),
}

impl LedgerProvider {
    /// Create a new ledger provider
    /// NOTE: only one provider may exist at a time (workaround for global
    /// HID context errors on macos/m1)
    pub fn new() -> Result<Self, TransportError> {
        #[cfg(feature = "transport_hid")]
        return Ok(Self {
            hid_api: HidApi::new().map_err(|_| TransportError::HidInit)?,
        });

        #[cfg(not(feature = "transport_hid"))]
        return Ok(Self {});
    }

    /// List available ledger devices
    pub async fn list_devices(&self, filter: Filter, tcp: &TcpOptions) -> Vec<LedgerInfo> {
        let mut devices = vec![];

        #[cfg(feature = "transport_hid")]
        if filter == Filter::Any || filter == Filter::Hid {
            TransportNativeHID::list_ledgers(&self.hid_api).for_each(|d| {
                devices.push(LedgerInfo::Hid(d.clone()));
            });
        }

        if filter == Filter::Any || filter == Filter::Tcp {
            // Probe speculos APDU port
            if let Ok(_t) = tokio::net::TcpStream::connect(tcp.socket_addr()).await {
                devices.push(LedgerInfo::Tcp(tcp.clone()));
            };
        }

        log::debug!("Found {} devices: {:?}", devices.len(), devices);

        devices
    }
}

/// Generic ledger device handle (abstract over transport types)
pub type GenericHandle = DeviceHandle<GenericTransport>;

impl std::fmt::Display for LedgerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "transport_hid")]
            LedgerInfo::Hid(hid_info) => {
                write!(
                    f,
                    "{:16} (USB, {:04x}:{:04x}, {})",
                    hid_info.product_string().unwrap_or("UNKNOWN"),
                    hid_info.vendor_id(),
                    hid_info.product_id(),
                    hid_info.serial_number().unwrap_or("UNKNOWN"),
                )
            }
            LedgerInfo::Tcp(tcp_info) => {
                write!(
                    f,
                    "{:16} (TCP, {}:{})",
                    "Speculos", tcp_info.addr, tcp_info.port
                )
            }
        }
    }
}

/// Connect trait for supported transports
#[async_trait]
pub trait Connect<T: Exchange> {
    type Options: Debug;

    /// Connect to the specified device
    async fn connect(&self, opts: &Self::Options) -> Result<T, TransportError>;
}

/// Generic connect implementation
#[async_trait]
impl Connect<GenericTransport> for LedgerProvider {
    type Options = LedgerInfo;

    async fn connect(&self, opts: &Self::Options) -> Result<GenericTransport, TransportError> {
        let t = match opts {
            #[cfg(feature = "transport_hid")]
            LedgerInfo::Hid(hid_info) => {
                GenericTransport::Hid(TransportNativeHID::open_device(&self.hid_api, hid_info)?)
            }
            LedgerInfo::Tcp(tcp_info) => {
                GenericTransport::Tcp(TransportTcp::new(tcp_info.clone()).await?)
            }
        };

        Ok(t)
    }
}

/// Connect implementation for HID devices
#[cfg(feature = "transport_hid")]
#[async_trait]
impl Connect<TransportNativeHID> for LedgerProvider {
    type Options = hidapi::DeviceInfo;

    async fn connect(&self, opts: &Self::Options) -> Result<TransportNativeHID, TransportError> {
        Ok(TransportNativeHID::open_device(&self.hid_api, opts)?)
    }
}

/// Connect implementation for TCP devices
#[async_trait]
impl Connect<TransportTcp> for LedgerProvider {
    type Options = TcpOptions;

    async fn connect(&self, opts: &Self::Options) -> Result<TransportTcp, TransportError> {
        TransportTcp::new(opts.clone()).await
    }
}
