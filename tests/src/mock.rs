// Copyright (c) 2022-2023 The MobileCoin Foundation

//! In-process mock of the alamgu example app, for exercising transfer
//! strategies and device handles without a device or simulator.
//!
//! Keys and signatures are deterministic stand-ins: the public key for
//! [TEST_PATH](crate::TEST_PATH) matches the example app, other keys and all
//! signatures are derived by hashing request data.
//!
//! Approvals are only honoured once the frame completing a request has been
//! received. Earlier approvals are counted (see [MockDevice::early_approvals])
//! and treated as rejections, as a button press before the prompt would be
//! lost on a real device.

use std::{
    fmt::Display,
    future::Future,
    ops::Deref,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use encdec::{Decode, DecodeOwned, Encode};
use ledger_transport::{APDUAnswer, APDUCommand, Exchange};
use log::{debug, trace, warn};
use sha2::{Digest, Sha256, Sha512};
use tokio::sync::{mpsc, Mutex};

use ledger_alamgu::{apdu::prelude::*, config::TransferMode};
use ledger_alamgu_apdu::block::{chunk_hash, HASH_LEN};

use crate::{APP_NAME, TEST_PATH, TEST_PUBLIC_KEY};

/// Status words used by the mock
const SW_OK: u16 = StatusWord::Ok as u16;
const SW_DENY: u16 = StatusWord::Deny as u16;

/// Body pushed to the host when exercising `PUT_CHUNK`
const PUSHED_STATE: &[u8] = b"alamgu-mock-state";

/// Mock device options
#[derive(Clone, Debug, PartialEq)]
pub struct MockOptions {
    /// Transfer mode expected from the host
    pub mode: TransferMode,
    /// Reported app version
    pub version: (u8, u8, u8),
    /// Maximum result bytes per block protocol frame
    pub result_slice: usize,
    /// Request an unknown chunk before reading payloads
    pub probe_missing: bool,
    /// Push a chunk to the host and read it back before reading payloads
    pub put_chunk: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            mode: TransferMode::Direct,
            version: (0, 1, 0),
            result_slice: 32,
            probe_missing: false,
            put_chunk: false,
        }
    }
}

impl MockOptions {
    /// Options for block protocol transfers, exercising every device request
    pub fn blocks() -> Self {
        Self {
            mode: TransferMode::Blocks,
            probe_missing: true,
            put_chunk: true,
            ..Default::default()
        }
    }
}

/// Mock transport errors
#[derive(Clone, Debug, PartialEq)]
pub enum MockError {
    /// Device disconnected
    Disconnected,
}

impl Display for MockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MockError::Disconnected => write!(f, "mock device disconnected"),
        }
    }
}

impl std::error::Error for MockError {}

/// Frame received by the mock
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

/// Mock alamgu device, implementing [Exchange].
///
/// Clones share device state, so a clone may be retained to approve or
/// reject operations and inspect received frames.
#[derive(Clone)]
pub struct MockDevice {
    inner: Arc<Inner>,
}

struct Inner {
    opts: MockOptions,
    state: Mutex<State>,
    approvals: Mutex<mpsc::UnboundedReceiver<Approval>>,
    approve_tx: mpsc::UnboundedSender<Approval>,
    frames: std::sync::Mutex<Vec<Frame>>,
    /// Index of the frame being handled
    current: AtomicUsize,
    early: AtomicUsize,
    disconnected: AtomicBool,
}

impl Inner {
    /// Record a received frame, returning its (1-indexed) position
    fn record(&self, frame: Frame) -> usize {
        let mut f = match self.frames.lock() {
            Ok(f) => f,
            Err(e) => e.into_inner(),
        };

        f.push(frame);
        f.len()
    }

    fn received(&self) -> usize {
        match self.frames.lock() {
            Ok(f) => f.len(),
            Err(e) => e.into_inner().len(),
        }
    }
}

/// User decision, with the number of frames received when it was made
#[derive(Copy, Clone, Debug)]
struct Approval {
    approve: bool,
    received: usize,
}

#[derive(Default)]
struct State {
    /// Direct mode payload buffer
    buff: Vec<u8>,
    /// Block protocol session
    session: Option<Session>,
}

/// Block protocol session state
struct Session {
    ins: u8,
    roots: Vec<ChunkHash>,
    payload: Vec<u8>,
    phase: Phase,
}

enum Phase {
    /// Awaiting failure for a missing chunk request
    Probe,
    /// Awaiting acknowledgement of a pushed chunk
    Pushed(ChunkHash),
    /// Awaiting the pushed chunk read back from the host
    Verify,
    /// Reading the payload chain, awaiting the requested chunk
    Reading(ChunkHash),
    /// Returning the remaining result
    Responding(Vec<u8>),
    /// Session complete
    Done,
}

/// Device response, data and status word
type Response = (Vec<u8>, u16);

impl MockDevice {
    pub fn new(opts: MockOptions) -> Self {
        let (approve_tx, approvals) = mpsc::unbounded_channel();

        Self {
            inner: Arc::new(Inner {
                opts,
                state: Mutex::new(State::default()),
                approvals: Mutex::new(approvals),
                approve_tx,
                frames: std::sync::Mutex::new(vec![]),
                current: AtomicUsize::new(0),
                early: AtomicUsize::new(0),
                disconnected: AtomicBool::new(false),
            }),
        }
    }

    /// Approve the next operation requiring confirmation
    pub fn approve(&self) -> impl Future<Output = ()> + Send + 'static {
        self.decide(true)
    }

    /// Reject the next operation requiring confirmation
    pub fn reject(&self) -> impl Future<Output = ()> + Send + 'static {
        self.decide(false)
    }

    fn decide(&self, approve: bool) -> impl Future<Output = ()> + Send + 'static {
        let inner = self.inner.clone();
        async move {
            let received = inner.received();
            let _ = inner.approve_tx.send(Approval { approve, received });
        }
    }

    /// Number of decisions made before the device had received the
    /// complete request
    pub fn early_approvals(&self) -> usize {
        self.inner.early.load(Ordering::SeqCst)
    }

    /// Fail all subsequent exchanges
    pub fn disconnect(&self) {
        self.inner.disconnected.store(true, Ordering::SeqCst);
    }

    /// Fetch frames received by the device
    pub fn frames(&self) -> Vec<Frame> {
        match self.inner.frames.lock() {
            Ok(f) => f.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }

    /// Public key returned for a derivation path
    pub fn public_key(path: &DerivationPath) -> Vec<u8> {
        if path.to_string() == TEST_PATH {
            if let Ok(k) = hex::decode(TEST_PUBLIC_KEY) {
                return k;
            }
        }

        derive(b"alamgu-mock-key", path).to_vec()
    }

    /// Chain code returned for a derivation path
    pub fn chain_code(path: &DerivationPath) -> Vec<u8> {
        derive(b"alamgu-mock-chain", path).to_vec()
    }

    /// Signature returned for a transaction
    pub fn signature(path: &DerivationPath, tx: &[u8]) -> [u8; SIGNATURE_LEN] {
        let mut h = Sha512::new();
        h.update(Self::public_key(path));
        h.update(tx);

        let mut s = [0u8; SIGNATURE_LEN];
        s.copy_from_slice(&h.finalize());
        s
    }

    /// Handle a single frame
    async fn handle(&self, ins: u8, data: &[u8]) -> Response {
        let mut state = self.inner.state.lock().await;

        match self.inner.opts.mode {
            TransferMode::Direct => self.handle_direct(&mut state, ins, data).await,
            TransferMode::Blocks => {
                let r = self.handle_block(&mut state, ins, data).await;

                // Drop session state on failure
                if r.1 != SW_OK {
                    state.session = None;
                }

                r
            }
        }
    }

    async fn handle_direct(&self, state: &mut State, ins: u8, data: &[u8]) -> Response {
        state.buff.extend_from_slice(data);

        // Wait for remaining frames where the request is incomplete
        match complete(ins, &state.buff) {
            Ok(true) => (),
            Ok(false) => return (vec![], SW_OK),
            Err(sw) => {
                state.buff.clear();
                return (vec![], sw);
            }
        }

        let payload = std::mem::take(&mut state.buff);

        match self.process(ins, &payload).await {
            Ok(r) => (r, SW_OK),
            Err(sw) => (vec![], sw),
        }
    }

    async fn handle_block(&self, state: &mut State, ins: u8, data: &[u8]) -> Response {
        let (frame, _) = match BlockFrame::decode(data) {
            Ok(v) => v,
            Err(_) => return (vec![], StatusWord::WrongApduLength as u16),
        };

        let code = match frame.host_code() {
            Ok(c) => c,
            Err(_) => return (vec![], StatusWord::WrongP1P2 as u16),
        };

        trace!("mock block frame: {}", code);

        // Start a new session
        if code == HostToLedger::Start {
            if frame.payload.len() % HASH_LEN != 0 {
                return (vec![], StatusWord::WrongApduLength as u16);
            }

            let roots: Vec<ChunkHash> = frame
                .payload
                .chunks_exact(HASH_LEN)
                .filter_map(|c| c.try_into().ok())
                .collect();

            let mut s = Session {
                ins,
                roots,
                payload: vec![],
                phase: Phase::Probe,
            };

            if self.inner.opts.probe_missing {
                state.session = Some(s);
                return get_chunk(&[0xee; HASH_LEN]);
            }

            let r = self.begin(&mut s).await;
            state.session = Some(s);
            return r;
        }

        let mut s = match state.session.take() {
            Some(s) if s.ins == ins => s,
            _ => return (vec![], StatusWord::BadState as u16),
        };

        let phase = std::mem::replace(&mut s.phase, Phase::Done);

        let r = match (code, phase) {
            (HostToLedger::GetChunkResponseFailure, Phase::Probe) => {
                debug!("mock: missing chunk reported");
                self.begin(&mut s).await
            }
            (HostToLedger::PutChunkResponse, Phase::Pushed(h)) => {
                s.phase = Phase::Verify;
                get_chunk(&h)
            }
            (HostToLedger::GetChunkResponseSuccess, Phase::Verify) => {
                if frame.payload != PUSHED_STATE {
                    return (vec![], StatusWord::BadState as u16);
                }

                self.next_root(&mut s).await
            }
            (HostToLedger::GetChunkResponseSuccess, Phase::Reading(h)) => {
                let body = frame.payload;

                if body.len() < HASH_LEN || chunk_hash(body) != h {
                    return (vec![], StatusWord::TxHashFail as u16);
                }

                s.payload.extend_from_slice(&body[HASH_LEN..]);

                let mut next = ZERO_HASH;
                next.copy_from_slice(&body[..HASH_LEN]);

                match next == ZERO_HASH {
                    true => self.next_root(&mut s).await,
                    false => {
                        s.phase = Phase::Reading(next);
                        get_chunk(&next)
                    }
                }
            }
            (HostToLedger::ResultAccumulatingResponse, Phase::Responding(r)) => {
                self.respond(&mut s, r)
            }
            _ => return (vec![], StatusWord::BadState as u16),
        };

        // Retain session until the final result is sent
        if !matches!(s.phase, Phase::Done) {
            state.session = Some(s);
        }

        r
    }

    /// Push a chunk to the host where enabled, then start reading payloads
    async fn begin(&self, s: &mut Session) -> Response {
        if self.inner.opts.put_chunk {
            s.phase = Phase::Pushed(chunk_hash(PUSHED_STATE));
            return block_frame(LedgerToHost::PutChunk, PUSHED_STATE);
        }

        self.next_root(s).await
    }

    /// Request the next payload root, or finish once all payloads are read
    async fn next_root(&self, s: &mut Session) -> Response {
        while !s.roots.is_empty() {
            let root = s.roots.remove(0);

            if root != ZERO_HASH {
                s.phase = Phase::Reading(root);
                return get_chunk(&root);
            }
        }

        self.finish(s).await
    }

    /// Process a complete payload and start returning the result
    async fn finish(&self, s: &mut Session) -> Response {
        let payload = std::mem::take(&mut s.payload);

        match self.process(s.ins, &payload).await {
            Ok(r) => self.respond(s, r),
            Err(sw) => {
                s.phase = Phase::Done;
                (vec![], sw)
            }
        }
    }

    /// Return the next result slice
    fn respond(&self, s: &mut Session, mut result: Vec<u8>) -> Response {
        let n = result.len().min(self.inner.opts.result_slice.max(1));
        let rest = result.split_off(n);

        match rest.is_empty() {
            true => {
                s.phase = Phase::Done;
                block_frame(LedgerToHost::ResultFinal, &result)
            }
            false => {
                s.phase = Phase::Responding(rest);
                block_frame(LedgerToHost::ResultAccumulating, &result)
            }
        }
    }

    /// Wait for user approval of the request completed by the current frame
    async fn confirm(&self) -> Result<(), u16> {
        let frame = self.inner.current.load(Ordering::SeqCst);
        debug!("mock: awaiting confirmation (frame {})", frame);

        match self.inner.approvals.lock().await.recv().await {
            Some(a) if a.received < frame => {
                warn!(
                    "mock: decision made after {} of {} frames, rejecting",
                    a.received, frame
                );
                self.inner.early.fetch_add(1, Ordering::SeqCst);
                Err(SW_DENY)
            }
            Some(a) if a.approve => Ok(()),
            _ => Err(SW_DENY),
        }
    }

    /// Execute a command, returning response data or a failure status
    async fn process(&self, ins: u8, payload: &[u8]) -> Result<Vec<u8>, u16> {
        let malformed = |_| StatusWord::WrongApduLength as u16;

        let r = match ins {
            i if i == Instruction::GetVersion as u8 => {
                encode(&AppVersionResp::new(self.inner.opts.version, APP_NAME))
            }
            i if i == Instruction::GetPublicKey as u8 || i == Instruction::VerifyAddress as u8 => {
                let (path, _) = DerivationPath::decode_owned(payload).map_err(malformed)?;

                if i == Instruction::VerifyAddress as u8 {
                    self.confirm().await?;
                }

                let (k, c) = (Self::public_key(&path), Self::chain_code(&path));
                encode(&PublicKeyResp::new(&k, &c))
            }
            i if i == Instruction::SignTx as u8 => {
                let (req, _) = SignTxReq::decode(payload).map_err(malformed)?;

                self.confirm().await?;

                encode(&SignTxResp {
                    signature: Self::signature(&req.path, req.tx),
                })
            }
            _ => return Err(StatusWord::InsNotSupported as u16),
        };

        r.map_err(|_| StatusWord::WrongResponseLength as u16)
    }
}

/// Check whether a direct mode payload is complete
fn complete(ins: u8, buff: &[u8]) -> Result<bool, u16> {
    let r = match ins {
        i if i == Instruction::GetVersion as u8 => return Ok(true),
        i if i == Instruction::GetPublicKey as u8 || i == Instruction::VerifyAddress as u8 => {
            DerivationPath::decode_owned(buff).map(|_| ())
        }
        i if i == Instruction::SignTx as u8 => SignTxReq::decode(buff).map(|_| ()),
        _ => return Err(StatusWord::InsNotSupported as u16),
    };

    match r {
        Ok(_) => Ok(true),
        Err(ApduError::Truncated) => Ok(false),
        Err(_) => Err(StatusWord::WrongApduLength as u16),
    }
}

fn derive(domain: &[u8], path: &DerivationPath) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(domain);
    h.update(path.to_string().as_bytes());
    h.finalize().into()
}

fn encode(v: &impl Encode<Error = ApduError>) -> Result<Vec<u8>, ApduError> {
    let mut buff = vec![0u8; v.encode_len()?];
    let n = v.encode(&mut buff)?;
    buff.truncate(n);
    Ok(buff)
}

fn block_frame(code: LedgerToHost, payload: &[u8]) -> Response {
    let mut r = vec![code as u8];
    r.extend_from_slice(payload);
    (r, SW_OK)
}

fn get_chunk(h: &ChunkHash) -> Response {
    block_frame(LedgerToHost::GetChunk, h)
}

#[async_trait]
impl Exchange for MockDevice {
    type Error = MockError;
    type AnswerType = Vec<u8>;

    async fn exchange<I>(
        &self,
        command: &APDUCommand<I>,
    ) -> Result<APDUAnswer<Self::AnswerType>, Self::Error>
    where
        I: Deref<Target = [u8]> + Send + Sync,
    {
        if self.inner.disconnected.load(Ordering::SeqCst) {
            return Err(MockError::Disconnected);
        }

        let data = command.data.deref();

        let n = self.inner.record(Frame {
            cla: command.cla,
            ins: command.ins,
            p1: command.p1,
            p2: command.p2,
            data: data.to_vec(),
        });
        self.inner.current.store(n, Ordering::SeqCst);

        let (mut resp, sw) = match command.cla {
            ALAMGU_CLA => self.handle(command.ins, data).await,
            _ => (vec![], StatusWord::ClaNotSupported as u16),
        };

        trace!("mock response: {} (0x{:04x})", hex::encode(&resp), sw);

        resp.extend_from_slice(&sw.to_be_bytes());

        APDUAnswer::from_answer(resp).map_err(|_| MockError::Disconnected)
    }
}

const ALAMGU_CLA: u8 = ledger_alamgu_apdu::ALAMGU_APDU_CLA;

#[cfg(test)]
mod test {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn golden_public_key() {
        let p = DerivationPath::from_str(TEST_PATH).unwrap();
        assert_eq!(hex::encode(MockDevice::public_key(&p)), TEST_PUBLIC_KEY);

        let q = DerivationPath::from_str("m/44'/1'/0'/0/0").unwrap();
        assert_ne!(MockDevice::public_key(&q), MockDevice::public_key(&p));
    }

    #[test]
    fn direct_completion() {
        let p = DerivationPath::from_str(TEST_PATH).unwrap();
        let mut buff = [0u8; 64];
        let n = p.encode(&mut buff).unwrap();

        let ins = Instruction::GetPublicKey as u8;
        assert_eq!(complete(ins, &buff[..n - 1]), Ok(false));
        assert_eq!(complete(ins, &buff[..n]), Ok(true));
        assert_eq!(complete(0x7f, &buff[..n]), Err(0x6D00));
    }

    #[tokio::test]
    async fn unknown_class() {
        let d = MockDevice::new(MockOptions::default());
        let c = ledger_alamgu_apdu::build_command(0xe0, 0x00, 0, 0, &[0u8; 0][..]);

        let a = d.exchange(&c).await.unwrap();
        assert_eq!(a.retcode(), 0x6E00);
    }
}
