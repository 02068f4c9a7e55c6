// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    fmt::{Debug, Display},
    time::Duration,
};

use ledger_transport::Exchange;
use log::debug;

use ledger_alamgu_apdu::{CommandHeader, MAX_APDU_LEN};

use super::{exchange, Progress};
use crate::Error;

/// Direct chunked send, splitting payloads into consecutive frames.
///
/// Every frame shares the command header and intermediate responses are
/// discarded, the response to the final frame is the logical result. Only
/// the final frame is marked as confirmable.
#[derive(Clone, Debug, PartialEq)]
pub struct Direct {
    /// Maximum data length per frame
    pub frame_size: usize,
}

impl Default for Direct {
    fn default() -> Self {
        Self {
            frame_size: MAX_APDU_LEN,
        }
    }
}

impl Direct {
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
        // Commands without a payload still require a frame
        if payload.is_empty() {
            progress.confirmable();
            return exchange(t, header, &[], timeout).await;
        }

        let frames = payload.chunks(self.frame_size.max(1));
        let n = frames.len();

        debug!(
            "Sending {} byte payload in {} frame(s) (ins: 0x{:02x})",
            payload.len(),
            n,
            header.ins
        );

        let mut resp = vec![];
        for (i, f) in frames.enumerate() {
            if i + 1 == n {
                progress.confirmable();
            }

            resp = exchange(t, header, f, timeout).await?;
        }

        Ok(resp)
    }
}
