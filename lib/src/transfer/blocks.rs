// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Block protocol transfers
//!
//! Payloads are published to the device by root hash in a `START` frame,
//! after which the device drives the exchange: pulling chunks by hash,
//! pushing chunks for the host to hold, and returning the result in one or
//! more slices. [BlockSession] holds the per-transfer state and maps each
//! device frame to the next host frame, [Blocks] runs the exchange loop.
//!
//! The device can only await user confirmation once it holds the whole
//! payload, so frames are marked confirmable after every payload chunk has
//! been served at least once.

use std::{
    collections::HashSet,
    fmt::{Debug, Display},
    time::Duration,
};

use encdec::{Decode, Encode};
use ledger_transport::Exchange;
use log::{debug, trace, warn};

use ledger_alamgu_apdu::{
    block::{BlockFrame, ChunkHash, HostToLedger, LedgerToHost, CHUNK_SIZE, HASH_LEN, MAX_ROOTS},
    CommandHeader, MAX_APDU_LEN,
};

use super::{exchange, Progress};
use crate::{chunk::ChunkStore, Error};

/// Block protocol strategy configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Blocks {
    /// Maximum data length per frame
    pub frame_size: usize,
    /// Maximum payload data per chunk
    pub chunk_size: usize,
}

impl Default for Blocks {
    fn default() -> Self {
        Self {
            frame_size: MAX_APDU_LEN,
            chunk_size: CHUNK_SIZE,
        }
    }
}

/// Per-transfer counters, logged on completion
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BlockStats {
    /// Frames exchanged, including `START`
    pub exchanges: usize,
    /// `GET_CHUNK` requests answered from the store
    pub served: usize,
    /// `GET_CHUNK` requests for unknown hashes
    pub misses: usize,
    /// Chunks pushed by the device
    pub pushes: usize,
    /// Result slices received
    pub results: usize,
}

/// Next action following a device frame
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Send the enclosed host frame
    Reply(Vec<u8>),
    /// Final result received
    Done,
}

/// Block protocol state for a single logical transfer
#[derive(Debug, Default)]
pub struct BlockSession {
    store: ChunkStore,
    unserved: HashSet<ChunkHash>,
    result: Vec<u8>,
    stats: BlockStats,
}

impl BlockSession {
    /// Create a session serving chunks from the provided store
    pub fn new(store: ChunkStore) -> Self {
        Self {
            store,
            unserved: HashSet::new(),
            result: vec![],
            stats: BlockStats::default(),
        }
    }

    /// Build the `START` frame announcing payload roots, tracking the
    /// chunks of each payload until served
    pub fn start_frame<E: Display + Debug>(
        &mut self,
        roots: &[ChunkHash],
    ) -> Result<Vec<u8>, Error<E>> {
        if roots.len() > MAX_ROOTS {
            return Err(Error::FrameTooLarge(1 + roots.len() * HASH_LEN, MAX_APDU_LEN));
        }

        let unserved = roots.iter().flat_map(|r| self.store.chain(r)).collect();
        self.unserved = unserved;

        let payload = roots.concat();
        encode_frame(BlockFrame::host(HostToLedger::Start, &payload))
    }

    /// Handle a device response, returning the next step
    pub fn handle<E: Display + Debug>(&mut self, data: &[u8]) -> Result<Step, Error<E>> {
        self.stats.exchanges += 1;

        let (frame, _) = BlockFrame::decode(data).map_err(|_| Error::EmptyResponse)?;
        let code = frame.ledger_code().map_err(Error::UnknownInstruction)?;

        trace!("Block frame: {} ({} bytes)", code, frame.payload.len());

        let reply = match code {
            LedgerToHost::ResultAccumulating => {
                self.stats.results += 1;
                self.result.extend_from_slice(frame.payload);

                BlockFrame::host(HostToLedger::ResultAccumulatingResponse, &[])
            }
            LedgerToHost::ResultFinal => {
                self.stats.results += 1;
                self.result.extend_from_slice(frame.payload);

                return Ok(Step::Done);
            }
            LedgerToHost::GetChunk => match self.store.get(frame.payload) {
                Some(body) => {
                    self.stats.served += 1;
                    if let Ok(h) = ChunkHash::try_from(frame.payload) {
                        self.unserved.remove(&h);
                    }

                    BlockFrame::host(HostToLedger::GetChunkResponseSuccess, body)
                }
                None => {
                    self.stats.misses += 1;
                    warn!("Device requested unknown chunk: {}", hex::encode(frame.payload));

                    BlockFrame::host(HostToLedger::GetChunkResponseFailure, &[])
                }
            },
            LedgerToHost::PutChunk => {
                self.stats.pushes += 1;
                let h = self.store.insert(frame.payload.to_vec());
                trace!("Stored device chunk: {}", hex::encode(h));

                BlockFrame::host(HostToLedger::PutChunkResponse, &[])
            }
        };

        encode_frame(reply).map(Step::Reply)
    }

    /// Check whether every payload chunk has been served to the device
    pub fn payload_served(&self) -> bool {
        self.unserved.is_empty()
    }

    /// Result accumulated so far
    pub fn result(&self) -> &[u8] {
        &self.result
    }

    pub fn stats(&self) -> &BlockStats {
        &self.stats
    }

    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    /// Consume the session, returning the accumulated result
    pub fn into_result(self) -> Vec<u8> {
        self.result
    }
}

fn encode_frame<E: Display + Debug>(f: BlockFrame<'_>) -> Result<Vec<u8>, Error<E>> {
    let mut buff = vec![0u8; f.encode_len()?];
    let n = f.encode(&mut buff)?;
    buff.truncate(n);
    Ok(buff)
}

impl Blocks {
    /// Transfer payloads using the block protocol, returning the accumulated result
    pub async fn send<T, P>(
        &self,
        t: &T,
        progress: &P,
        header: &CommandHeader,
        payloads: &[&[u8]],
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, Error<T::Error>>
    where
        T: Exchange + Send + Sync,
        T::Error: Display + Debug,
        P: Progress + ?Sized,
    {
        self.send_with(t, progress, header, payloads, ChunkStore::new(), timeout)
            .await
    }

    /// Transfer payloads using the block protocol, serving additional
    /// pre-seeded chunks from `store`
    pub async fn send_with<T, P>(
        &self,
        t: &T,
        progress: &P,
        header: &CommandHeader,
        payloads: &[&[u8]],
        mut store: ChunkStore,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, Error<T::Error>>
    where
        T: Exchange + Send + Sync,
        T::Error: Display + Debug,
        P: Progress + ?Sized,
    {
        if payloads.len() > MAX_ROOTS {
            return Err(Error::FrameTooLarge(
                1 + payloads.len() * HASH_LEN,
                self.frame_size,
            ));
        }

        let roots: Vec<_> = payloads
            .iter()
            .map(|p| store.insert_payload(p, self.chunk_size))
            .collect();

        debug!(
            "Starting block transfer (ins: 0x{:02x}, {} root(s), {} chunk(s))",
            header.ins,
            roots.len(),
            store.len()
        );

        let mut session = BlockSession::new(store);
        let mut frame = session.start_frame(&roots)?;

        loop {
            if frame.len() > self.frame_size {
                return Err(Error::FrameTooLarge(frame.len(), self.frame_size));
            }

            if session.payload_served() {
                progress.confirmable();
            }

            let resp = exchange(t, header, &frame, timeout).await?;

            match session.handle(&resp)? {
                Step::Reply(f) => frame = f,
                Step::Done => break,
            }
        }

        debug!("Block transfer complete: {:?}", session.stats());

        Ok(session.into_result())
    }
}
