//! PostgreSQL wire protocol implementation.
//!
//! This module contains the low-level protocol encoding and decoding.
//! Nothing here performs I/O.
//!
//! # Structure
//!
//! - `frame`: Splits the inbound byte stream into length-delimited frames
//! - `backend`: Server → Client messages (decoding)
//! - `reader`: Frames + decoding behind one pull-based interface
//! - `writer`: Growable outbound buffer with length back-patching
//! - `frontend`: Client → Server messages (encoding)
//! - `codec`: Bounded read primitives used by the decoders
//! - `types`: Common protocol types (FormatCode, Oid, TransactionStatus)

pub mod backend;
pub mod codec;
pub mod frame;
pub mod frontend;
pub mod reader;
pub mod types;
pub mod writer;

// Re-export commonly used types
pub use backend::BackendMessage;
pub use frame::{Frame, FrameReader};
pub use frontend::{BindValue, FrontendMessage, Serializer, Target};
pub use reader::MessageReader;
pub use types::{FormatCode, Oid, TransactionStatus};
pub use writer::Writer;
