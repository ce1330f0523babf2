//! PostgreSQL frontend (client → server) messages.

pub mod auth;
pub mod copy;
pub mod extended;
pub mod simple;
pub mod startup;

use bytes::Bytes;

use crate::protocol::types::{FormatCode, Oid};
use crate::protocol::writer::Writer;

pub use auth::{md5_password, write_password, write_sasl_initial_response, write_sasl_response};
pub use copy::{write_copy_data, write_copy_done, write_copy_fail};
pub use extended::{
    BindValue, Target, write_bind, write_close, write_describe, write_execute, write_flush,
    write_parse, write_sync,
};
pub use simple::write_query;
pub use startup::{write_cancel_request, write_ssl_request, write_startup, write_terminate};

/// Frontend message type bytes.
pub mod msg_type {
    /// Password/SASL response (all auth response types use 'p')
    pub const PASSWORD: u8 = b'p';
    /// Query (simple query protocol)
    pub const QUERY: u8 = b'Q';
    /// Parse (extended query protocol)
    pub const PARSE: u8 = b'P';
    /// Bind (extended query protocol)
    pub const BIND: u8 = b'B';
    /// Execute (extended query protocol)
    pub const EXECUTE: u8 = b'E';
    /// Describe (extended query protocol)
    pub const DESCRIBE: u8 = b'D';
    /// Close (extended query protocol)
    pub const CLOSE: u8 = b'C';
    /// Sync (extended query protocol)
    pub const SYNC: u8 = b'S';
    /// Flush (extended query protocol)
    pub const FLUSH: u8 = b'H';
    /// CopyData
    pub const COPY_DATA: u8 = b'd';
    /// CopyDone
    pub const COPY_DONE: u8 = b'c';
    /// CopyFail
    pub const COPY_FAIL: u8 = b'f';
    /// Terminate
    pub const TERMINATE: u8 = b'X';
}

/// A message the client can send, borrowing its contents from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontendMessage<'a> {
    /// StartupMessage with ordered (name, value) parameters
    Startup { params: &'a [(&'a str, &'a str)] },
    /// SSLRequest
    SslRequest,
    /// PasswordMessage (cleartext or MD5 hashed)
    Password { password: &'a str },
    /// SASLInitialResponse
    SaslInitialResponse { mechanism: &'a str, data: &'a [u8] },
    /// SASLResponse
    SaslResponse { data: &'a [u8] },
    /// Simple query
    Query { query: &'a str },
    /// Parse a prepared statement
    Parse {
        name: &'a str,
        query: &'a str,
        param_oids: &'a [Oid],
    },
    /// Bind a portal
    Bind {
        portal: &'a str,
        statement: &'a str,
        params: &'a [BindValue<'a>],
        result_format: FormatCode,
    },
    /// Describe a statement or portal
    Describe { target: Target, name: &'a str },
    /// Execute a portal
    Execute { portal: &'a str, max_rows: u32 },
    /// Close a statement or portal
    Close { target: Target, name: &'a str },
    /// Flush
    Flush,
    /// Sync
    Sync,
    /// Terminate
    Terminate,
    /// COPY payload chunk
    CopyData { data: &'a [u8] },
    /// End of COPY data
    CopyDone,
    /// Abort COPY with an error message
    CopyFail { message: &'a str },
    /// CancelRequest (sent on a separate connection)
    CancelRequest { process_id: u32, secret_key: u32 },
}

impl FrontendMessage<'_> {
    /// Append this message to a writer.
    pub fn write_to(&self, w: &mut Writer) {
        match *self {
            FrontendMessage::Startup { params } => write_startup(w, params),
            FrontendMessage::SslRequest => write_ssl_request(w),
            FrontendMessage::Password { password } => write_password(w, password),
            FrontendMessage::SaslInitialResponse { mechanism, data } => {
                write_sasl_initial_response(w, mechanism, data)
            }
            FrontendMessage::SaslResponse { data } => write_sasl_response(w, data),
            FrontendMessage::Query { query } => write_query(w, query),
            FrontendMessage::Parse {
                name,
                query,
                param_oids,
            } => write_parse(w, name, query, param_oids),
            FrontendMessage::Bind {
                portal,
                statement,
                params,
                result_format,
            } => write_bind(w, portal, statement, params, result_format),
            FrontendMessage::Describe { target, name } => write_describe(w, target, name),
            FrontendMessage::Execute { portal, max_rows } => write_execute(w, portal, max_rows),
            FrontendMessage::Close { target, name } => write_close(w, target, name),
            FrontendMessage::Flush => write_flush(w),
            FrontendMessage::Sync => write_sync(w),
            FrontendMessage::Terminate => write_terminate(w),
            FrontendMessage::CopyData { data } => write_copy_data(w, data),
            FrontendMessage::CopyDone => write_copy_done(w),
            FrontendMessage::CopyFail { message } => write_copy_fail(w, message),
            FrontendMessage::CancelRequest {
                process_id,
                secret_key,
            } => write_cancel_request(w, process_id, secret_key),
        }
    }
}

/// Encodes frontend messages into wire bytes, reusing one [`Writer`].
#[derive(Debug, Default)]
pub struct Serializer {
    writer: Writer,
}

impl Serializer {
    /// Create a serializer with the default writer capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a serializer whose writer starts with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            writer: Writer::with_capacity(capacity),
        }
    }

    /// Encode one message.
    pub fn serialize(&mut self, message: &FrontendMessage<'_>) -> Bytes {
        message.write_to(&mut self.writer);
        self.writer.flush()
    }

    /// Encode several messages back to back into one buffer.
    pub fn serialize_all(&mut self, messages: &[FrontendMessage<'_>]) -> Bytes {
        for message in messages {
            message.write_to(&mut self.writer);
        }
        self.writer.flush()
    }
}
