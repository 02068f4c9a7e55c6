// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Handles for operations awaiting on-device confirmation

use std::fmt::{Debug, Display};

use tokio::sync::{oneshot, watch};

use crate::{tracked::Activity, Error};

/// Handle to an operation running in the background, typically awaiting
/// user approval on the device.
///
/// Use [Pending::ready] to wait until the device may be awaiting the user,
/// then [Pending::response] to collect the result.
pub struct Pending<R, E: Display + Debug> {
    activity: watch::Receiver<Activity>,
    baseline: u64,
    result: oneshot::Receiver<Result<R, Error<E>>>,
    early: Option<Result<R, Error<E>>>,
}

impl<R, E: Display + Debug> Pending<R, E> {
    /// Create a pending handle, ready once `activity` reports a confirmable
    /// frame sent after `baseline` in flight
    pub(crate) fn new(
        activity: watch::Receiver<Activity>,
        baseline: u64,
        result: oneshot::Receiver<Result<R, Error<E>>>,
    ) -> Self {
        Self {
            activity,
            baseline,
            result,
            early: None,
        }
    }

    /// Wait until the frame the device may hold for user confirmation is in
    /// flight (or the operation has already completed).
    ///
    /// Earlier frames of a multi-frame request never signal readiness.
    pub async fn ready(&mut self) -> Result<(), Error<E>> {
        if self.early.is_some() {
            return Ok(());
        }

        loop {
            if self.activity.borrow_and_update().confirming(self.baseline) {
                return Ok(());
            }

            tokio::select! {
                r = self.activity.changed() => {
                    // Transport dropped, the operation result follows
                    if r.is_err() {
                        let r = (&mut self.result).await;
                        self.early = Some(r.unwrap_or(Err(Error::Cancelled)));
                        return Ok(());
                    }
                }
                r = &mut self.result => {
                    self.early = Some(r.unwrap_or(Err(Error::Cancelled)));
                    return Ok(());
                }
            }
        }
    }

    /// Await the operation result
    pub async fn response(self) -> Result<R, Error<E>> {
        match self.early {
            Some(r) => r,
            None => self.result.await.unwrap_or(Err(Error::Cancelled)),
        }
    }
}
