//! Inbound message pipeline: bytes in, decoded [`BackendMessage`]s out.

use crate::error::{Error, Result};
use crate::protocol::backend::BackendMessage;
use crate::protocol::frame::FrameReader;

/// [`FrameReader`] followed by [`BackendMessage::decode`].
///
/// A framing or decode error poisons the reader; every later call returns
/// [`Error::ConnectionBroken`].
#[derive(Debug, Default)]
pub struct MessageReader {
    frames: FrameReader,
    poisoned: bool,
    /// Error hit by `feed` after it had already decoded messages
    deferred: Option<Error>,
}

impl MessageReader {
    /// Create a new message reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new message reader with an initial buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            frames: FrameReader::with_capacity(capacity),
            poisoned: false,
            deferred: None,
        }
    }

    /// Returns true once a fatal error was reported.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Number of bytes buffered but not yet decoded.
    pub fn buffered(&self) -> usize {
        self.frames.buffered()
    }

    /// Append a chunk of bytes received from the server.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.frames.extend(chunk);
    }

    /// Decode the next complete message, or `Ok(None)` if more bytes are needed.
    pub fn next_message(&mut self) -> Result<Option<BackendMessage>> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        if self.poisoned {
            return Err(Error::ConnectionBroken);
        }

        let result = match self.frames.next_frame() {
            Ok(Some(frame)) => BackendMessage::decode(&frame).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };
        if result.is_err() {
            self.poisoned = true;
        }
        result
    }

    /// Append a chunk and decode every complete message it finishes.
    ///
    /// Messages decoded before a fatal error are returned, so an
    /// ErrorResponse explaining a disconnect is never lost; the error itself
    /// is reported by the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<BackendMessage>> {
        self.extend(chunk);

        let mut messages = Vec::new();
        loop {
            match self.next_message() {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => return Ok(messages),
                Err(err) if messages.is_empty() => return Err(err),
                Err(err) => {
                    self.deferred = Some(err);
                    return Ok(messages);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::TransactionStatus;

    #[test]
    fn test_feed_in_pieces() {
        let mut reader = MessageReader::new();
        assert!(reader.feed(b"1\0\0").unwrap().is_empty());
        let messages = reader.feed(b"\0\x04Z\0\0\0\x05I").unwrap();
        assert_eq!(
            messages,
            vec![
                BackendMessage::ParseComplete,
                BackendMessage::ReadyForQuery(TransactionStatus::Idle),
            ]
        );
    }

    #[test]
    fn test_decode_error_poisons() {
        let mut reader = MessageReader::new();
        // ReadyForQuery with an unknown status
        let err = reader.feed(b"Z\0\0\0\x05?").unwrap_err();
        assert!(matches!(err, Error::Decode { code: b'Z', .. }));
        assert!(reader.is_poisoned());

        let err = reader.feed(b"1\0\0\0\x04").unwrap_err();
        assert!(matches!(err, Error::ConnectionBroken));
    }

    #[test]
    fn test_framing_error_poisons() {
        let mut reader = MessageReader::new();
        let err = reader.feed(b"Z\0\0\0\x01").unwrap_err();
        assert!(matches!(err, Error::Framing(_)));
        assert!(matches!(
            reader.next_message(),
            Err(Error::ConnectionBroken)
        ));
    }

    #[test]
    fn test_messages_before_error_kept() {
        let mut chunk = b"E\0\0\0\x11SFATAL\0Mwhy\0\0".to_vec();
        chunk.extend_from_slice(b"Z\0\0\0\x01");

        let mut reader = MessageReader::new();
        let messages = reader.feed(&chunk).unwrap();
        let [BackendMessage::ErrorResponse(fields)] = messages.as_slice() else {
            panic!("expected one ErrorResponse, got {messages:?}");
        };
        assert_eq!(fields.severity.as_deref(), Some("FATAL"));
        assert_eq!(fields.message.as_deref(), Some("why"));
        assert!(reader.is_poisoned());

        assert!(matches!(reader.feed(b""), Err(Error::Framing(_))));
        assert!(matches!(reader.next_message(), Err(Error::ConnectionBroken)));
    }
}
