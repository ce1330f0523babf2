//! A sans-I/O engine for the client side of the PostgreSQL wire protocol.
//!
//! # Features
//!
//! - **Zero-copy framing**: Frame payloads and row values are slices of the read buffer
//! - **Sans-I/O core**: Framing, decoding, encoding and authentication never touch a socket
//! - **SCRAM-SHA-256(-PLUS)**: Including `tls-server-end-point` channel binding
//! - **Sync and async adapters**: Blocking `Read + Write` and tokio streams
//!
//! # Example
//!
//! ```no_run
//! use std::net::TcpStream;
//!
//! use zero_pgwire::auth::Channel;
//! use zero_pgwire::protocol::{BackendMessage, FrontendMessage};
//! use zero_pgwire::sync::MessageStream;
//! use zero_pgwire::Opts;
//!
//! fn main() -> zero_pgwire::Result<()> {
//!     let opts = Opts {
//!         user: "postgres".into(),
//!         database: Some("mydb".into()),
//!         password: Some("secret".into()),
//!         ..Default::default()
//!     };
//!
//!     let mut stream = MessageStream::with_opts(TcpStream::connect("localhost:5432")?, &opts);
//!     stream.startup(&opts, Channel::Plain)?;
//!     // ParameterStatus and BackendKeyData precede the first ReadyForQuery
//!     while !matches!(stream.read_message()?, BackendMessage::ReadyForQuery(_)) {}
//!
//!     stream.send(&[FrontendMessage::Query { query: "SELECT 1" }])?;
//!     loop {
//!         match stream.read_message()? {
//!             BackendMessage::DataRow(row) => println!("{:?}", row.get(0)),
//!             BackendMessage::ErrorResponse(fields) => return Err(zero_pgwire::Error::Server(fields)),
//!             BackendMessage::ReadyForQuery(_) => break,
//!             _ => {}
//!         }
//!     }
//!
//!     stream.send(&[FrontendMessage::Terminate])?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod error;
pub mod opts;
pub mod protocol;
pub mod sasl;

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "tokio")]
pub mod tokio;

pub use auth::{AuthStep, Authenticator, Channel};
pub use error::{Error, ErrorFields, ErrorKind, Result, SaslError, SaslErrorKind};
pub use opts::{ChannelBinding, Opts};
pub use protocol::backend::BackendMessage;
pub use protocol::frontend::{FrontendMessage, Serializer};
pub use protocol::types::{FormatCode, Oid, TransactionStatus};
pub use sasl::SaslSession;
