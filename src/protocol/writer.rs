//! Outbound message buffer.
//!
//! PostgreSQL frontend message format:
//! - Type byte (1 byte) - NOT included in length
//! - Length (4 bytes) - includes itself
//! - Payload (Length - 4 bytes)
//!
//! [`Writer`] reserves the header when a message begins and back-patches the
//! length when it ends, so several messages can be pipelined into one buffer
//! before a single [`flush`](Writer::flush).

use bytes::{BufMut, Bytes, BytesMut};

/// Default initial capacity of a [`Writer`].
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy)]
struct OpenMessage {
    /// Offset of the 4-byte length field
    length_at: usize,
}

/// Growable buffer owned by one outbound pipeline.
///
/// The buffer is reused across messages: [`flush`](Self::flush) hands out the
/// bytes written so far and keeps the allocation for the next batch.
#[derive(Debug)]
pub struct Writer {
    buf: BytesMut,
    open: Option<OpenMessage>,
}

impl Writer {
    /// Create a writer with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a writer with the given initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            open: None,
        }
    }

    /// Bytes written and not yet flushed.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing is waiting to be flushed.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current allocation size.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Make sure `additional` more bytes fit, growing to
    /// `max(needed, 1.5 * capacity)` when they do not.
    fn ensure(&mut self, additional: usize) {
        let capacity = self.buf.capacity();
        let needed = self.buf.len() + additional;
        if needed > capacity {
            let target = needed.max(capacity + capacity / 2);
            self.buf.reserve(target - self.buf.len());
        }
    }

    /// Start a message with a type byte.
    ///
    /// # Panics
    ///
    /// Panics if the previous message was not ended.
    pub fn begin_message(&mut self, code: u8) -> &mut Self {
        self.ensure(5);
        self.buf.put_u8(code);
        self.begin_untagged()
    }

    /// Start a message without a type byte (StartupMessage, SSLRequest, CancelRequest).
    ///
    /// # Panics
    ///
    /// Panics if the previous message was not ended.
    pub fn begin_untagged(&mut self) -> &mut Self {
        assert!(
            self.open.is_none(),
            "begin_message called while another message is open"
        );
        self.ensure(4);
        self.open = Some(OpenMessage {
            length_at: self.buf.len(),
        });
        self.buf.put_slice(&[0, 0, 0, 0]); // Placeholder for length
        self
    }

    /// Finish the open message by filling in its length field.
    ///
    /// # Panics
    ///
    /// Panics if no message is open, or if the message exceeds `i32::MAX` bytes.
    pub fn end_message(&mut self) -> &mut Self {
        let Some(open) = self.open.take() else {
            panic!("end_message called without begin_message");
        };
        let len = self.buf.len() - open.length_at;
        assert!(
            len <= i32::MAX as usize,
            "message length {len} exceeds i32::MAX"
        );
        self.buf[open.length_at..open.length_at + 4].copy_from_slice(&(len as i32).to_be_bytes());
        self
    }

    /// Write 2-byte big-endian integer.
    pub fn add_i16(&mut self, value: i16) -> &mut Self {
        self.ensure(2);
        self.buf.put_i16(value);
        self
    }

    /// Write 4-byte big-endian integer.
    pub fn add_i32(&mut self, value: i32) -> &mut Self {
        self.ensure(4);
        self.buf.put_i32(value);
        self
    }

    /// Write 4-byte big-endian unsigned integer.
    pub fn add_u32(&mut self, value: u32) -> &mut Self {
        self.ensure(4);
        self.buf.put_u32(value);
        self
    }

    /// Write a single byte.
    pub fn add_char(&mut self, value: u8) -> &mut Self {
        self.ensure(1);
        self.buf.put_u8(value);
        self
    }

    /// Write null-terminated string. An empty string still writes the terminator.
    pub fn add_cstring(&mut self, s: &str) -> &mut Self {
        self.ensure(s.len() + 1);
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
        self
    }

    /// Write string bytes without terminator.
    pub fn add_string(&mut self, s: &str) -> &mut Self {
        self.add(s.as_bytes())
    }

    /// Write raw bytes.
    pub fn add(&mut self, data: &[u8]) -> &mut Self {
        self.ensure(data.len());
        self.buf.put_slice(data);
        self
    }

    /// Write a length-prefixed value; the length of a non-null value must fit in i32.
    ///
    /// # Panics
    ///
    /// Panics if the value exceeds `i32::MAX` bytes.
    pub fn add_len_prefixed(&mut self, value: Option<&[u8]>) -> &mut Self {
        match value {
            None => self.add_i32(-1),
            Some(data) => {
                assert!(
                    data.len() <= i32::MAX as usize,
                    "value length {} exceeds i32::MAX",
                    data.len()
                );
                self.add_i32(data.len() as i32).add(data)
            }
        }
    }

    /// Hand out everything written so far and reset for reuse.
    ///
    /// A message that is still open is ended first.
    pub fn flush(&mut self) -> Bytes {
        if self.open.is_some() {
            self.end_message();
        }
        self.buf.split().freeze()
    }

    /// Drop everything written so far, including an open message.
    pub fn clear(&mut self) {
        self.open = None;
        self.buf.clear();
    }
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}
