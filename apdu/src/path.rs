// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Derivation path encoding
//!
//! Paths are written as `m/44'/535348'/0'`, with the leading `m` root marker
//! and a trailing `'` marking hardened segments.

use core::{fmt::Display, str::FromStr};

use byteorder::{ByteOrder, LittleEndian};
use encdec::{DecodeOwned, Encode};

use crate::ApduError;

/// Maximum number of segments in a derivation path
pub const MAX_PATH_DEPTH: usize = 10;

/// Bit set in encoded indices for hardened segments
pub const HARDENED: u32 = 0x8000_0000;

/// Root marker for textual paths
const ROOT: &str = "m";

/// A single derivation path segment
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PathIndex {
    pub index: u32,
    pub hardened: bool,
}

impl PathIndex {
    /// Create a hardened path index
    pub const fn hardened(index: u32) -> Self {
        Self {
            index,
            hardened: true,
        }
    }

    /// Create a non-hardened path index
    pub const fn normal(index: u32) -> Self {
        Self {
            index,
            hardened: false,
        }
    }

    /// Encoded index value (with the hardened bit where required)
    pub const fn value(&self) -> u32 {
        match self.hardened {
            true => self.index | HARDENED,
            false => self.index,
        }
    }
}

/// Derivation path parsing errors, segment positions are 1-indexed
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PathError {
    /// Path does not begin with the root marker
    MissingRoot,
    /// Empty path segment
    EmptySegment(usize),
    /// Segment is not a non-negative integer
    InvalidSegment(usize),
    /// Segment index collides with the hardened bit
    IndexOutOfRange(usize),
    /// Path exceeds [MAX_PATH_DEPTH]
    TooLong,
}

impl Display for PathError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PathError::MissingRoot => write!(f, "path must start with '{ROOT}'"),
            PathError::EmptySegment(i) => write!(f, "empty path segment at position {i}"),
            PathError::InvalidSegment(i) => write!(f, "invalid path segment at position {i}"),
            PathError::IndexOutOfRange(i) => {
                write!(f, "path index out of range at position {i}")
            }
            PathError::TooLong => write!(f, "path exceeds {MAX_PATH_DEPTH} segments"),
        }
    }
}

/// Derivation path, an ordered list of (possibly hardened) indices
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     COUNT     |               INDEX_0 (LE)                    /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// /               |              INDEX_N...                       /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DerivationPath {
    segments: heapless::Vec<PathIndex, MAX_PATH_DEPTH>,
}

impl DerivationPath {
    /// Create a derivation path from a list of segments
    pub fn new(segments: &[PathIndex]) -> Result<Self, PathError> {
        let segments = heapless::Vec::from_slice(segments).map_err(|_| PathError::TooLong)?;
        Ok(Self { segments })
    }

    /// Fetch path segments
    pub fn segments(&self) -> &[PathIndex] {
        &self.segments
    }

    /// Number of segments in the path
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Check whether the path is the bare root
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for DerivationPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split('/');

        if parts.next() != Some(ROOT) {
            return Err(PathError::MissingRoot);
        }

        let mut segments = heapless::Vec::new();

        for (i, p) in parts.enumerate() {
            let n = i + 1;

            if p.is_empty() {
                return Err(PathError::EmptySegment(n));
            }

            let (digits, hardened) = match p.strip_suffix('\'') {
                Some(d) => (d, true),
                None => (p, false),
            };

            let index = u32::from_str(digits).map_err(|_| PathError::InvalidSegment(n))?;
            if index & HARDENED != 0 {
                return Err(PathError::IndexOutOfRange(n));
            }

            segments
                .push(PathIndex { index, hardened })
                .map_err(|_| PathError::TooLong)?;
        }

        Ok(Self { segments })
    }
}

impl Display for DerivationPath {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{ROOT}")?;

        for s in self.segments.iter() {
            match s.hardened {
                true => write!(f, "/{}'", s.index)?,
                false => write!(f, "/{}", s.index)?,
            }
        }

        Ok(())
    }
}

impl Encode for DerivationPath {
    type Error = ApduError;

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1 + self.segments.len() * 4)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.encode_len()?;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.segments.len() as u8;

        for (i, s) in self.segments.iter().enumerate() {
            LittleEndian::write_u32(&mut buff[1 + i * 4..], s.value());
        }

        Ok(n)
    }
}

impl DecodeOwned for DerivationPath {
    type Output = Self;

    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), ApduError> {
        let count = match buff.first() {
            Some(c) => *c as usize,
            None => return Err(ApduError::Truncated),
        };

        if count > MAX_PATH_DEPTH {
            return Err(ApduError::InvalidLength);
        }

        let n = 1 + count * 4;
        if buff.len() < n {
            return Err(ApduError::Truncated);
        }

        let mut segments = heapless::Vec::new();
        for i in 0..count {
            let v = LittleEndian::read_u32(&buff[1 + i * 4..]);

            // Capacity checked against count above
            let _ = segments.push(PathIndex {
                index: v & !HARDENED,
                hardened: v & HARDENED != 0,
            });
        }

        Ok((Self { segments }, n))
    }
}
