// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Content-addressed chunk storage for the block protocol
//!
//! Payloads are split into slices and folded from the last slice backward,
//! each chunk body holding the hash of the following chunk and the slice data.
//! The hash of the chunk holding the first slice is the payload root.

use std::collections::HashMap;

use ledger_alamgu_apdu::block::{chunk_hash, ChunkHash, HASH_LEN, ZERO_HASH};

/// Map of chunk hash to chunk body
#[derive(Clone, Debug, Default)]
pub struct ChunkStore {
    chunks: HashMap<ChunkHash, Vec<u8>>,
}

impl ChunkStore {
    /// Create an empty chunk store
    pub fn new() -> Self {
        Self::default()
    }

    /// Chunk a payload into the store, returning the payload root.
    ///
    /// An empty payload adds no chunks and returns [ZERO_HASH].
    pub fn insert_payload(&mut self, payload: &[u8], chunk_size: usize) -> ChunkHash {
        let mut next = ZERO_HASH;

        for slice in payload.chunks(chunk_size.max(1)).rev() {
            let mut body = Vec::with_capacity(HASH_LEN + slice.len());
            body.extend_from_slice(&next);
            body.extend_from_slice(slice);

            next = self.insert(body);
        }

        next
    }

    /// Insert a chunk body, returning its hash
    pub fn insert(&mut self, body: Vec<u8>) -> ChunkHash {
        let h = chunk_hash(&body);
        self.chunks.insert(h, body);
        h
    }

    /// Fetch a chunk body by hash
    pub fn get(&self, hash: &[u8]) -> Option<&[u8]> {
        let h: &ChunkHash = hash.try_into().ok()?;
        self.chunks.get(h).map(|b| b.as_slice())
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Hashes of the chunks linked from `root` in chain order, stopping at the first missing link
    pub fn chain(&self, root: &ChunkHash) -> Vec<ChunkHash> {
        let mut hashes = vec![];
        let mut next = *root;

        while next != ZERO_HASH {
            let body = match self.chunks.get(&next) {
                Some(b) if b.len() >= HASH_LEN => b,
                _ => break,
            };

            hashes.push(next);
            next.copy_from_slice(&body[..HASH_LEN]);
        }

        hashes
    }

    /// Follow a chain from `root`, returning the payload or `None` where a link is missing
    pub fn reassemble(&self, root: &ChunkHash) -> Option<Vec<u8>> {
        let mut payload = vec![];
        let mut next = *root;

        while next != ZERO_HASH {
            let body = self.chunks.get(&next)?;
            if body.len() < HASH_LEN {
                return None;
            }

            payload.extend_from_slice(&body[HASH_LEN..]);
            next.copy_from_slice(&body[..HASH_LEN]);
        }

        Some(payload)
    }
}
