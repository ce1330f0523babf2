//! Blocking message stream.

use std::io::{ErrorKind, Read, Write};

use crate::auth::{AuthStep, Authenticator, Channel};
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::backend::BackendMessage;
use crate::protocol::frontend::{FrontendMessage, Serializer};
use crate::protocol::reader::MessageReader;

/// Decoded messages over a blocking byte stream.
///
/// The stream is only read when no complete message is buffered, so a caller
/// that stops calling [`read_message`](Self::read_message) stops reading the
/// socket.
#[derive(Debug)]
pub struct MessageStream<S> {
    stream: S,
    reader: MessageReader,
    serializer: Serializer,
    chunk: Box<[u8]>,
}

impl<S: Read + Write> MessageStream<S> {
    /// Wrap a connected stream with default buffer sizes.
    pub fn new(stream: S) -> Self {
        Self::with_opts(stream, &Opts::default())
    }

    /// Wrap a connected stream, sizing buffers from `opts`.
    pub fn with_opts(stream: S, opts: &Opts) -> Self {
        let read_capacity = opts.read_buffer_capacity.max(512);
        Self {
            stream,
            reader: MessageReader::with_capacity(read_capacity),
            serializer: Serializer::with_capacity(opts.write_buffer_capacity),
            chunk: vec![0; read_capacity].into_boxed_slice(),
        }
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Get a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Unwrap the underlying stream. Buffered, undecoded bytes are lost.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Read the next backend message.
    ///
    /// End of stream before a complete message is an
    /// [`UnexpectedEof`](ErrorKind::UnexpectedEof) I/O error.
    pub fn read_message(&mut self) -> Result<BackendMessage> {
        loop {
            if let Some(message) = self.reader.next_message()? {
                return Ok(message);
            }

            let n = match self.stream.read(&mut self.chunk) {
                Ok(0) => {
                    return Err(Error::Io(std::io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "server closed the connection",
                    )));
                }
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            self.reader.extend(&self.chunk[..n]);
        }
    }

    /// Encode and write messages in one batch, then flush.
    pub fn send(&mut self, messages: &[FrontendMessage<'_>]) -> Result<()> {
        let bytes = self.serializer.serialize_all(messages);
        self.write_bytes(&bytes)
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Send the StartupMessage and authenticate.
    ///
    /// Returns after AuthenticationOk; the ParameterStatus, BackendKeyData and
    /// ReadyForQuery messages that follow are left for the caller.
    pub fn startup(&mut self, opts: &Opts, channel: Channel) -> Result<()> {
        let authenticator = Authenticator::new(opts, channel);
        self.startup_with(opts, authenticator)
    }

    /// [`startup`](Self::startup) with a preconfigured [`Authenticator`].
    pub fn startup_with(&mut self, opts: &Opts, mut authenticator: Authenticator) -> Result<()> {
        let params = opts.startup_params();
        self.send(&[FrontendMessage::Startup { params: &params }])?;

        loop {
            let message = self.read_message()?;
            if message.is_async() {
                tracing::debug!("Skipping asynchronous message during authentication");
                continue;
            }
            match authenticator.handle_message(&message)? {
                AuthStep::Send(bytes) => self.write_bytes(&bytes)?,
                AuthStep::Wait => {}
                AuthStep::Done => return Ok(()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::protocol::types::TransactionStatus;

    /// Reads from a fixed script, records writes.
    struct Scripted {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            // One byte at a time to exercise reassembly
            let len = buf.len().min(1);
            self.input.read(&mut buf[..len])
        }
    }

    impl Write for Scripted {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn scripted(input: &[u8]) -> MessageStream<Scripted> {
        MessageStream::new(Scripted {
            input: Cursor::new(input.to_vec()),
            output: Vec::new(),
        })
    }

    #[test]
    fn test_read_messages_then_eof() {
        let mut stream = scripted(b"1\0\0\0\x04Z\0\0\0\x05T");
        assert_eq!(stream.read_message().unwrap(), BackendMessage::ParseComplete);
        assert_eq!(
            stream.read_message().unwrap(),
            BackendMessage::ReadyForQuery(TransactionStatus::InTransaction)
        );

        let err = stream.read_message().unwrap_err();
        assert!(matches!(&err, Error::Io(e) if e.kind() == ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_send() {
        let mut stream = scripted(b"");
        stream
            .send(&[FrontendMessage::Query { query: "select 1" }, FrontendMessage::Sync])
            .unwrap();
        assert_eq!(
            stream.get_ref().output,
            b"Q\0\0\0\x0dselect 1\0S\0\0\0\x04"
        );
    }

    #[test]
    fn test_startup_trust() {
        let mut stream = scripted(b"R\0\0\0\x08\0\0\0\0Z\0\0\0\x05I");
        let opts = Opts {
            user: "postgres".into(),
            ..Opts::default()
        };
        stream.startup(&opts, Channel::Plain).unwrap();

        let output = &stream.get_ref().output;
        assert!(output.ends_with(b"user\0postgres\0client_encoding\0UTF8\0\0"));
        assert_eq!(
            stream.read_message().unwrap(),
            BackendMessage::ReadyForQuery(TransactionStatus::Idle)
        );
    }
}
