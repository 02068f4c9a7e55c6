// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handle for connected ledger devices
//!
//! This provides methods for interacting with the alamgu app
//! and is generic over [Exchange] implementations

use std::{
    fmt::{Debug, Display},
    sync::Arc,
    time::Duration,
};

use encdec::{Decode, Encode};
use ledger_transport::Exchange;
use log::debug;
use tokio::sync::{oneshot, watch, Mutex, OwnedMutexGuard};

use ledger_alamgu_apdu::prelude::*;

use crate::{
    config::Config,
    pending::Pending,
    tracked::{Activity, Tracked},
    transfer::Transfer,
    Error,
};

/// Alamgu handle for a connected ledger device.
///
/// This is generic over [Exchange] types to support different
/// underlying transports. Clones share the underlying device, with
/// logical operations serialised.
pub struct DeviceHandle<T> {
    /// Device for communication
    t: Arc<Mutex<Tracked<T>>>,
    /// Activity updates for pending operations
    activity: watch::Receiver<Activity>,
    /// Payload transfer strategy
    transfer: Transfer,
    /// Timeout for APDU requests
    request_timeout: Option<Duration>,
}

impl<T> Clone for DeviceHandle<T> {
    fn clone(&self) -> Self {
        Self {
            t: self.t.clone(),
            activity: self.activity.clone(),
            transfer: self.transfer.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

/// Create a [DeviceHandle] wrapper from a type implementing [Exchange],
/// using the default configuration
impl<T> From<T> for DeviceHandle<T> {
    fn from(t: T) -> Self {
        Self::with_config(t, &Config::default())
    }
}

/// Application version information
#[derive(Clone, Debug, PartialEq)]
pub struct AppVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    pub name: String,
}

impl Display for AppVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}.{}.{}", self.name, self.major, self.minor, self.patch)
    }
}

/// Public key and chain code for a derivation path
#[derive(Clone, Debug, PartialEq)]
pub struct PublicKey {
    pub public_key: Vec<u8>,
    pub chain_code: Vec<u8>,
}

impl<T> DeviceHandle<T> {
    /// Create a device handle with the provided configuration
    pub fn with_config(t: T, c: &Config) -> Self {
        let t = Tracked::new(t);
        let activity = t.subscribe();

        Self {
            t: Arc::new(Mutex::new(t)),
            activity,
            transfer: Transfer::from(c),
            request_timeout: c.request_timeout(),
        }
    }

    /// Fetch the configured transfer strategy
    pub fn transfer(&self) -> &Transfer {
        &self.transfer
    }

    /// Fetch current transport activity
    pub fn activity(&self) -> Activity {
        *self.activity.borrow()
    }
}

impl<T> DeviceHandle<T>
where
    T: Exchange + Send + Sync + 'static,
    T::Error: Display + Debug + Send + 'static,
{
    /// Fetch application version and name
    pub async fn app_version(&self) -> Result<AppVersion, Error<T::Error>> {
        debug!("Requesting app version");

        let t = self.t.lock().await;
        let data = request(&*t, &self.transfer, &AppVersionReq, self.request_timeout).await?;

        let (v, _) = AppVersionResp::decode(&data)?;

        Ok(AppVersion {
            major: v.major,
            minor: v.minor,
            patch: v.patch,
            name: v.name.to_string(),
        })
    }

    /// Fetch the public key for a derivation path without confirmation
    pub async fn public_key(&self, path: &DerivationPath) -> Result<PublicKey, Error<T::Error>> {
        debug!("Requesting public key for path: {}", path);

        let t = self.t.lock().await;
        let req = PublicKeyReq::new(path.clone(), false);

        let data = request(&*t, &self.transfer, &req, self.request_timeout).await?;

        decode_public_key(&data)
    }

    /// Fetch the public key for a derivation path, displaying the key on the
    /// device for user confirmation
    pub async fn public_key_confirm(
        &self,
        path: &DerivationPath,
    ) -> Pending<PublicKey, T::Error> {
        debug!("Requesting public key confirmation for path: {}", path);

        let req = PublicKeyReq::new(path.clone(), true);

        self.spawn(move |t, transfer| async move {
            let data = request(&*t, &transfer, &req, None).await?;
            decode_public_key(&data)
        })
        .await
    }

    /// Sign a transaction with the key for `path`, waiting for user approval
    pub async fn sign_tx(
        &self,
        path: &DerivationPath,
        tx: &[u8],
    ) -> Result<[u8; SIGNATURE_LEN], Error<T::Error>> {
        debug!("Signing {} byte transaction with path: {}", tx.len(), path);

        let t = self.t.lock().await;
        let req = SignTxReq::new(tx, path.clone());

        let data = request(&*t, &self.transfer, &req, None).await?;

        decode_signature(&data)
    }

    /// Sign a transaction in the background, returning a [Pending] handle
    /// to await device readiness and the resulting signature
    pub async fn sign_tx_pending(
        &self,
        path: &DerivationPath,
        tx: Vec<u8>,
    ) -> Pending<[u8; SIGNATURE_LEN], T::Error> {
        debug!("Signing {} byte transaction with path: {}", tx.len(), path);

        let path = path.clone();

        self.spawn(move |t, transfer| async move {
            let req = SignTxReq::new(&tx, path);
            let data = request(&*t, &transfer, &req, None).await?;
            decode_signature(&data)
        })
        .await
    }

    /// Acquire the device and run an operation in the background,
    /// returning a [Pending] handle for the result
    async fn spawn<R, F, Fut>(&self, f: F) -> Pending<R, T::Error>
    where
        R: Send + 'static,
        F: FnOnce(OwnedMutexGuard<Tracked<T>>, Transfer) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<R, Error<T::Error>>> + Send + 'static,
    {
        let t = self.t.clone().lock_owned().await;
        let baseline = t.activity().sent;

        let (tx, rx) = oneshot::channel();
        let op = f(t, self.transfer.clone());

        tokio::spawn(async move {
            // Receiver may have been dropped, abandoning the result
            let _ = tx.send(op.await);
        });

        Pending::new(self.activity.clone(), baseline, rx)
    }
}

/// Encode and send a request using the provided transfer strategy,
/// marking confirmable frames on the tracked transport
async fn request<T, R>(
    t: &Tracked<T>,
    transfer: &Transfer,
    req: &R,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, Error<T::Error>>
where
    T: Exchange + Send + Sync,
    T::Error: Display + Debug,
    R: ApduReq,
{
    let mut buff = vec![0u8; req.encode_len()?];
    let n = req.encode(&mut buff)?;

    transfer.send(t, t, &req.header(), &buff[..n], timeout).await
}

fn decode_public_key<E: Display + Debug>(data: &[u8]) -> Result<PublicKey, Error<E>> {
    let (r, _) = PublicKeyResp::decode(data)?;

    Ok(PublicKey {
        public_key: r.public_key.to_vec(),
        chain_code: r.chain_code.to_vec(),
    })
}

fn decode_signature<E: Display + Debug>(data: &[u8]) -> Result<[u8; SIGNATURE_LEN], Error<E>> {
    let (r, _) = SignTxResp::decode(data)?;
    Ok(r.signature)
}
