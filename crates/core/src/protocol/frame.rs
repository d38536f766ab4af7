//! Binary frame protocol: 5-byte header + payload
//!
//! Wire format: `[1 byte frame type][4 bytes payload length, big endian][payload]`.
//! The transport may split a frame's header or payload at any byte offset, so
//! frames are reassembled from an accumulator that never assumes one transport
//! message equals one frame.

use bytes::{Bytes, BytesMut};

use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::error::{Result, StreamError};

/// Header size: 1 byte type + 4 bytes payload length
pub const FRAME_HEADER_LEN: usize = 5;

/// Frame type discriminator
///
/// Only `Output` carries interpreted data; all other values are reserved for
/// protocol extension and their payloads are consumed without effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Terminal output (UTF-8 text, possibly split mid-codepoint)
    Output,
    /// Reserved frame type, consumed but ignored
    Reserved(u8),
}

impl FrameKind {
    /// Map a raw type byte to a frame kind
    pub fn from_u8(byte: u8) -> Self {
        match byte {
            0 => Self::Output,
            other => Self::Reserved(other),
        }
    }
}

/// One decoded protocol frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Bytes,
}

/// Accumulator for raw inbound bytes not yet formed into a complete frame
///
/// Bytes belonging to an incomplete frame are never discarded; the buffer
/// shrinks only by the exact length of a consumed frame.
#[derive(Debug, Default)]
pub struct ByteAccumulator {
    buf: BytesMut,
}

impl ByteAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw transport bytes
    pub fn append(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Number of buffered bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the first `n` buffered bytes without consuming them
    pub fn peek(&self, n: usize) -> Option<&[u8]> {
        if self.buf.len() < n {
            None
        } else {
            Some(&self.buf[..n])
        }
    }

    /// Remove exactly `n` bytes from the front
    ///
    /// Panics if fewer than `n` bytes are buffered; callers check with
    /// [`peek`](Self::peek) or [`len`](Self::len) first.
    pub fn consume(&mut self, n: usize) -> Bytes {
        self.buf.split_to(n).freeze()
    }

    /// Drop all buffered bytes
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

/// Parses the binary frame protocol out of a [`ByteAccumulator`]
#[derive(Debug)]
pub struct FrameDecoder {
    acc: ByteAccumulator,
    max_frame_size: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameDecoder {
    /// Create a decoder enforcing the given maximum payload size
    pub fn new(max_frame_size: usize) -> Self {
        Self {
            acc: ByteAccumulator::new(),
            max_frame_size,
        }
    }

    /// Append raw transport bytes to the accumulator
    pub fn append(&mut self, data: &[u8]) {
        self.acc.append(data);
    }

    /// Number of bytes buffered but not yet consumed
    pub fn buffered(&self) -> usize {
        self.acc.len()
    }

    /// Try to extract the next complete frame
    ///
    /// Returns `Ok(None)` when fewer than the header or the declared payload
    /// length are buffered (wait for more data). A declared length above the
    /// configured maximum is a protocol violation and fails with
    /// [`StreamError::FrameTooLarge`]; the buffer is left untouched so the
    /// caller can tear the connection down.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let header = match self.acc.peek(FRAME_HEADER_LEN) {
            Some(h) => h,
            None => return Ok(None),
        };

        let kind = FrameKind::from_u8(header[0]);
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;

        if len > self.max_frame_size {
            return Err(StreamError::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        if self.acc.len() < FRAME_HEADER_LEN + len {
            return Ok(None);
        }

        let _ = self.acc.consume(FRAME_HEADER_LEN);
        let payload = self.acc.consume(len);
        Ok(Some(Frame { kind, payload }))
    }

    /// Drain all complete frames currently buffered
    pub fn drain(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame()? {
            frames.push(frame);
        }
        Ok(frames)
    }

    /// Discard all buffered bytes (connection teardown)
    pub fn reset(&mut self) {
        self.acc.clear();
    }
}

/// Encode a frame header + payload (used by tests and tooling)
pub fn encode_frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.push(kind);
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    buf
}
