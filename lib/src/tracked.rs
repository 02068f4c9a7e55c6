// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Activity tracking for [Exchange] implementations
//!
//! Transfers mark the frame the device may hold while awaiting the user (see
//! [Progress]), so on-device approval is only attempted once that frame is
//! in flight.

use std::ops::Deref;

use async_trait::async_trait;
use ledger_transport::{APDUAnswer, APDUCommand, Exchange};
use tokio::sync::watch;

use crate::transfer::Progress;

/// Transport activity counters
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Activity {
    /// Frames handed to the transport
    pub sent: u64,
    /// Whether a frame is awaiting a response
    pub in_flight: bool,
    /// Index (by `sent`) of the latest frame the device may hold while
    /// awaiting user confirmation
    pub confirm_frame: Option<u64>,
}

impl Activity {
    /// Check whether a confirmable frame sent after `baseline` is awaiting a response
    pub fn confirming(&self, baseline: u64) -> bool {
        match self.confirm_frame {
            Some(f) => f > baseline && f == self.sent && self.in_flight,
            None => false,
        }
    }
}

/// [Exchange] wrapper publishing [Activity] for each frame
pub struct Tracked<T> {
    inner: T,
    activity: watch::Sender<Activity>,
}

impl<T> Tracked<T> {
    pub fn new(inner: T) -> Self {
        let (activity, _) = watch::channel(Activity::default());
        Self { inner, activity }
    }

    /// Subscribe to activity updates
    pub fn subscribe(&self) -> watch::Receiver<Activity> {
        self.activity.subscribe()
    }

    /// Fetch current activity
    pub fn activity(&self) -> Activity {
        *self.activity.borrow()
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }
}

/// Marks frame completion on drop, covering errors and cancellation
struct InFlight<'a>(&'a watch::Sender<Activity>);

impl<'a> Drop for InFlight<'a> {
    fn drop(&mut self) {
        self.0.send_modify(|a| a.in_flight = false);
    }
}

/// Marks the next frame as confirmable
impl<T: Sync> Progress for Tracked<T> {
    fn confirmable(&self) {
        self.activity.send_modify(|a| a.confirm_frame = Some(a.sent + 1));
    }
}

#[async_trait]
impl<T: Exchange + Send + Sync> Exchange for Tracked<T> {
    type Error = T::Error;
    type AnswerType = T::AnswerType;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        self.activity.send_modify(|a| {
            a.sent += 1;
            a.in_flight = true;
        });
        let _f = InFlight(&self.activity);

        self.inner.exchange(command).await
    }
}
