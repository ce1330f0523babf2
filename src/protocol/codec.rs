//! PostgreSQL wire protocol decoding primitives.
//!
//! PostgreSQL uses big-endian (network byte order) for all integers.
//! Every read is bounds-checked; running off the end of a payload is a
//! decode error that names the message being decoded.

use zerocopy::FromBytes;
use zerocopy::byteorder::big_endian::{I16 as I16BE, I32 as I32BE, U16 as U16BE, U32 as U32BE};

use crate::error::{Error, Result};

/// Cursor over a single message payload.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    code: u8,
    message: &'static str,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Start reading `data`, the payload of a message with type byte `code`.
    pub fn new(code: u8, message: &'static str, data: &'a [u8]) -> Self {
        Self {
            code,
            message,
            data,
            pos: 0,
        }
    }

    /// Build a decode error carrying this message's context.
    pub fn error(&self, reason: impl Into<String>) -> Error {
        Error::Decode {
            code: self.code,
            message: self.message,
            reason: reason.into(),
        }
    }

    /// Offset of the next unread byte.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    #[inline]
    fn unread(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn truncated(&self, what: &str, need: usize) -> Error {
        self.error(format!(
            "{what}: buffer too short at offset {}: {} < {need}",
            self.pos,
            self.remaining()
        ))
    }

    /// Read 1-byte unsigned integer.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        match self.unread().first() {
            Some(&value) => {
                self.pos += 1;
                Ok(value)
            }
            None => Err(self.truncated("read_u8", 1)),
        }
    }

    /// Read 2-byte big-endian signed integer.
    #[inline]
    pub fn read_i16(&mut self) -> Result<i16> {
        let (value, _) =
            I16BE::read_from_prefix(self.unread()).map_err(|_| self.truncated("read_i16", 2))?;
        self.pos += 2;
        Ok(value.get())
    }

    /// Read 2-byte big-endian unsigned integer.
    #[inline]
    pub fn read_u16(&mut self) -> Result<u16> {
        let (value, _) =
            U16BE::read_from_prefix(self.unread()).map_err(|_| self.truncated("read_u16", 2))?;
        self.pos += 2;
        Ok(value.get())
    }

    /// Read 4-byte big-endian signed integer.
    #[inline]
    pub fn read_i32(&mut self) -> Result<i32> {
        let (value, _) =
            I32BE::read_from_prefix(self.unread()).map_err(|_| self.truncated("read_i32", 4))?;
        self.pos += 4;
        Ok(value.get())
    }

    /// Read 4-byte big-endian unsigned integer.
    #[inline]
    pub fn read_u32(&mut self) -> Result<u32> {
        let (value, _) =
            U32BE::read_from_prefix(self.unread()).map_err(|_| self.truncated("read_u32", 4))?;
        self.pos += 4;
        Ok(value.get())
    }

    /// Read a fixed-layout zerocopy struct.
    #[inline]
    pub fn read_struct<T: FromBytes>(&mut self, what: &str) -> Result<T> {
        let size = size_of::<T>();
        let (value, _) =
            T::read_from_prefix(self.unread()).map_err(|_| self.truncated(what, size))?;
        self.pos += size;
        Ok(value)
    }

    /// Read fixed-length bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(self.truncated("read_bytes", len));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Read null-terminated string (PostgreSQL String type).
    /// Returns the string bytes without the null terminator.
    #[inline]
    pub fn read_cstring(&mut self) -> Result<&'a [u8]> {
        let unread = self.unread();
        match memchr::memchr(0, unread) {
            Some(end) => {
                self.pos += end + 1;
                Ok(&unread[..end])
            }
            None => Err(self.error(format!(
                "read_cstring: no null terminator found after offset {}",
                self.pos
            ))),
        }
    }

    /// Read null-terminated UTF-8 string.
    #[inline]
    pub fn read_cstr(&mut self) -> Result<&'a str> {
        let start = self.pos;
        let bytes = self.read_cstring()?;
        simdutf8::compat::from_utf8(bytes)
            .map_err(|e| self.error(format!("read_cstr: invalid UTF-8 at offset {start}: {e}")))
    }

    /// Consume everything that is left.
    #[inline]
    pub fn read_rest(&mut self) -> &'a [u8] {
        let rest = self.unread();
        self.pos = self.data.len();
        rest
    }

    /// Assert the payload was consumed exactly.
    pub fn finish(&self) -> Result<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(self.error(format!(
                "{n} trailing bytes after {} decoded bytes",
                self.pos
            ))),
        }
    }
}
