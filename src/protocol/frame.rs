//! Frame reader for the backend byte stream.
//!
//! Every backend message is framed as:
//! - Type byte (1 byte) - NOT included in length
//! - Length (4 bytes, big-endian) - includes itself
//! - Payload (Length - 4 bytes)
//!
//! Bytes arrive in arbitrary chunks. [`FrameReader`] keeps whatever does not
//! yet form a complete frame and only ever yields frames whose payload is
//! fully buffered.

use bytes::{Buf, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Type byte.
pub const CODE_LEN: usize = 1;
/// Length field.
pub const LENGTH_LEN: usize = 4;
/// Type byte + length field.
pub const HEADER_LEN: usize = CODE_LEN + LENGTH_LEN;

/// One length-delimited protocol unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type byte
    pub code: u8,
    /// Value of the length field: payload length + 4
    pub length: u32,
    /// Message payload (after the length field)
    pub payload: Bytes,
}

impl Frame {
    /// Build a frame from its type byte and payload.
    pub fn new(code: u8, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        Self {
            code,
            length: (payload.len() + LENGTH_LEN) as u32,
            payload,
        }
    }
}

/// Splits a chunked byte stream into [`Frame`]s.
///
/// The reader never blocks: [`extend`](Self::extend) only buffers, and
/// [`next_frame`](Self::next_frame) returns `Ok(None)` when the caller has to
/// supply more bytes. A caller that wants to apply backpressure simply stops
/// pulling frames.
#[derive(Debug)]
pub struct FrameReader {
    buffer: BytesMut,
    broken: bool,
    /// Error hit by `feed` after it had already extracted frames
    deferred: Option<Error>,
}

impl FrameReader {
    /// Create a new frame reader.
    pub fn new() -> Self {
        Self::with_capacity(8192)
    }

    /// Create a new frame reader with an initial carry-over buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(capacity),
            broken: false,
            deferred: None,
        }
    }

    /// Number of bytes buffered but not yet emitted as a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true once the reader has rejected the stream.
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Append a chunk of bytes received from the server.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Try to extract a single frame from the buffer.
    ///
    /// Returns:
    /// - `Ok(Some(frame))` if a complete frame was extracted
    /// - `Ok(None)` if more data is needed
    /// - `Err(...)` if the length field is impossible; the reader is then broken
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        if self.broken {
            return Err(Error::ConnectionBroken);
        }
        if self.buffer.len() < HEADER_LEN {
            return Ok(None);
        }

        let code = self.buffer[0];
        let length = u32::from_be_bytes([
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
            self.buffer[4],
        ]);

        if (length as usize) < LENGTH_LEN || length > i32::MAX as u32 {
            self.broken = true;
            return Err(Error::Framing(format!(
                "impossible length {length} for message '{}'",
                char::from(code)
            )));
        }

        let frame_len = CODE_LEN + length as usize;
        if self.buffer.len() < frame_len {
            // Make room for the rest of the frame in one go
            self.buffer.reserve(frame_len - self.buffer.len());
            return Ok(None);
        }

        let mut frame = self.buffer.split_to(frame_len);
        frame.advance(HEADER_LEN);

        Ok(Some(Frame {
            code,
            length,
            payload: frame.freeze(),
        }))
    }

    /// Append a chunk and extract every complete frame it finishes.
    ///
    /// Frames extracted before an error are returned; the error is reported
    /// by the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Frame>> {
        self.extend(chunk);

        let mut frames = Vec::new();
        loop {
            match self.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => return Ok(frames),
                Err(err) if frames.is_empty() => return Err(err),
                Err(err) => {
                    self.deferred = Some(err);
                    return Ok(frames);
                }
            }
        }
    }
}

impl Default for FrameReader {
    fn default() -> Self {
        Self::new()
    }
}
