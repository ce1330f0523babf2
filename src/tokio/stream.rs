//! Async message stream for tokio.

use std::io::ErrorKind;

use ::tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::auth::{AuthStep, Authenticator, Channel};
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::backend::BackendMessage;
use crate::protocol::frontend::{FrontendMessage, Serializer};
use crate::protocol::reader::MessageReader;

/// Decoded messages over an async byte stream.
///
/// The stream is only read when no complete message is buffered.
#[derive(Debug)]
pub struct MessageStream<S> {
    stream: S,
    reader: MessageReader,
    serializer: Serializer,
    chunk: Box<[u8]>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> MessageStream<S> {
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
    pub async fn read_message(&mut self) -> Result<BackendMessage> {
        loop {
            if let Some(message) = self.reader.next_message()? {
                return Ok(message);
            }

            let n = self.stream.read(&mut self.chunk).await?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "server closed the connection",
                )));
            }
            self.reader.extend(&self.chunk[..n]);
        }
    }

    /// Encode and write messages in one batch, then flush.
    pub async fn send(&mut self, messages: &[FrontendMessage<'_>]) -> Result<()> {
        let bytes = self.serializer.serialize_all(messages);
        self.write_bytes(&bytes).await
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Send the StartupMessage and authenticate.
    ///
    /// Returns after AuthenticationOk; the ParameterStatus, BackendKeyData and
    /// ReadyForQuery messages that follow are left for the caller.
    pub async fn startup(&mut self, opts: &Opts, channel: Channel) -> Result<()> {
        let authenticator = Authenticator::new(opts, channel);
        self.startup_with(opts, authenticator).await
    }

    /// [`startup`](Self::startup) with a preconfigured [`Authenticator`].
    pub async fn startup_with(
        &mut self,
        opts: &Opts,
        mut authenticator: Authenticator,
    ) -> Result<()> {
        let params = opts.startup_params();
        self.send(&[FrontendMessage::Startup { params: &params }])
            .await?;

        loop {
            let message = self.read_message().await?;
            if message.is_async() {
                tracing::debug!("Skipping asynchronous message during authentication");
                continue;
            }
            match authenticator.handle_message(&message)? {
                AuthStep::Send(bytes) => self.write_bytes(&bytes).await?,
                AuthStep::Wait => {}
                AuthStep::Done => return Ok(()),
            }
        }
    }
}
