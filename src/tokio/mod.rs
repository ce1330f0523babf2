//! Tokio I/O adapter.

mod stream;

pub use stream::MessageStream;
