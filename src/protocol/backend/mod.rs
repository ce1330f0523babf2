//! PostgreSQL backend (server → client) messages.

pub mod auth;
pub mod copy;
pub mod error;
pub mod extended;
pub mod query;

use bytes::Bytes;

use crate::error::{ErrorFields, Result};
use crate::protocol::codec::Cursor;
use crate::protocol::frame::Frame;
use crate::protocol::types::{Oid, TransactionStatus};

pub use auth::{Authentication, BackendKeyData, NotificationResponse, ParameterStatus};
pub use copy::CopyResponse;
pub use query::{CommandComplete, DataRow, Field, RowDescription};

/// Backend message type bytes.
pub mod msg_type {
    /// Authentication message
    pub const AUTHENTICATION: u8 = b'R';
    /// BackendKeyData
    pub const BACKEND_KEY_DATA: u8 = b'K';
    /// ParameterStatus
    pub const PARAMETER_STATUS: u8 = b'S';
    /// ReadyForQuery
    pub const READY_FOR_QUERY: u8 = b'Z';
    /// RowDescription
    pub const ROW_DESCRIPTION: u8 = b'T';
    /// DataRow
    pub const DATA_ROW: u8 = b'D';
    /// CommandComplete
    pub const COMMAND_COMPLETE: u8 = b'C';
    /// EmptyQueryResponse
    pub const EMPTY_QUERY_RESPONSE: u8 = b'I';
    /// ErrorResponse
    pub const ERROR_RESPONSE: u8 = b'E';
    /// NoticeResponse
    pub const NOTICE_RESPONSE: u8 = b'N';
    /// NotificationResponse
    pub const NOTIFICATION_RESPONSE: u8 = b'A';
    /// ParseComplete
    pub const PARSE_COMPLETE: u8 = b'1';
    /// BindComplete
    pub const BIND_COMPLETE: u8 = b'2';
    /// CloseComplete
    pub const CLOSE_COMPLETE: u8 = b'3';
    /// ParameterDescription
    pub const PARAMETER_DESCRIPTION: u8 = b't';
    /// NoData
    pub const NO_DATA: u8 = b'n';
    /// PortalSuspended
    pub const PORTAL_SUSPENDED: u8 = b's';
    /// CopyInResponse
    pub const COPY_IN_RESPONSE: u8 = b'G';
    /// CopyOutResponse
    pub const COPY_OUT_RESPONSE: u8 = b'H';
    /// CopyBothResponse (start of streaming replication)
    pub const COPY_BOTH_RESPONSE: u8 = b'W';
    /// CopyData
    pub const COPY_DATA: u8 = b'd';
    /// CopyDone
    pub const COPY_DONE: u8 = b'c';

    /// Human-readable message name for a type byte.
    pub fn name(code: u8) -> &'static str {
        match code {
            AUTHENTICATION => "Authentication",
            BACKEND_KEY_DATA => "BackendKeyData",
            PARAMETER_STATUS => "ParameterStatus",
            READY_FOR_QUERY => "ReadyForQuery",
            ROW_DESCRIPTION => "RowDescription",
            DATA_ROW => "DataRow",
            COMMAND_COMPLETE => "CommandComplete",
            EMPTY_QUERY_RESPONSE => "EmptyQueryResponse",
            ERROR_RESPONSE => "ErrorResponse",
            NOTICE_RESPONSE => "NoticeResponse",
            NOTIFICATION_RESPONSE => "NotificationResponse",
            PARSE_COMPLETE => "ParseComplete",
            BIND_COMPLETE => "BindComplete",
            CLOSE_COMPLETE => "CloseComplete",
            PARAMETER_DESCRIPTION => "ParameterDescription",
            NO_DATA => "NoData",
            PORTAL_SUSPENDED => "PortalSuspended",
            COPY_IN_RESPONSE => "CopyInResponse",
            COPY_OUT_RESPONSE => "CopyOutResponse",
            COPY_BOTH_RESPONSE => "CopyBothResponse",
            COPY_DATA => "CopyData",
            COPY_DONE => "CopyDone",
            _ => "Unknown",
        }
    }
}

/// Decoded message from the PostgreSQL server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendMessage {
    /// Authentication request or result
    Authentication(Authentication),
    /// Server parameter name and value
    ParameterStatus(ParameterStatus),
    /// Process ID and secret key for cancellation
    BackendKeyData(BackendKeyData),
    /// Server is ready for a new query
    ReadyForQuery(TransactionStatus),
    /// Columns of the upcoming rows
    RowDescription(RowDescription),
    /// Parameter type OIDs of a prepared statement
    ParameterDescription(Vec<Oid>),
    /// One row of raw column values
    DataRow(DataRow),
    /// Command finished, with its tag
    CommandComplete(CommandComplete),
    /// Server error
    ErrorResponse(ErrorFields),
    /// Server notice
    NoticeResponse(ErrorFields),
    /// Parse finished
    ParseComplete,
    /// Bind finished
    BindComplete,
    /// Close finished
    CloseComplete,
    /// Described statement/portal returns no rows
    NoData,
    /// Execute hit its row limit
    PortalSuspended,
    /// Query string was empty
    EmptyQueryResponse,
    /// LISTEN/NOTIFY notification
    NotificationResponse(NotificationResponse),
    /// Server is ready to receive COPY data
    CopyInResponse(CopyResponse),
    /// Server is about to send COPY data
    CopyOutResponse(CopyResponse),
    /// COPY payload chunk
    CopyData(Bytes),
    /// End of COPY data
    CopyDone,
    /// Bidirectional COPY started (streaming replication)
    ReplicationStart(CopyResponse),
    /// Framed message with a type byte this decoder does not know
    Unknown {
        /// Message type byte
        code: u8,
        /// Undecoded payload
        payload: Bytes,
    },
}

impl BackendMessage {
    /// Decode a frame.
    ///
    /// Dispatch depends only on the type byte. Structured payloads must be
    /// consumed exactly; leftover or missing bytes are a decode error.
    pub fn decode(frame: &Frame) -> Result<Self> {
        let code = frame.code;
        let payload = &frame.payload;
        let mut cur = Cursor::new(code, msg_type::name(code), payload);

        let message = match code {
            msg_type::PARSE_COMPLETE => BackendMessage::ParseComplete,
            msg_type::BIND_COMPLETE => BackendMessage::BindComplete,
            msg_type::CLOSE_COMPLETE => BackendMessage::CloseComplete,
            msg_type::NO_DATA => BackendMessage::NoData,
            msg_type::PORTAL_SUSPENDED => BackendMessage::PortalSuspended,
            msg_type::EMPTY_QUERY_RESPONSE => BackendMessage::EmptyQueryResponse,
            msg_type::COPY_DONE => BackendMessage::CopyDone,
            msg_type::COPY_DATA => BackendMessage::CopyData(payload.clone()),
            msg_type::AUTHENTICATION => {
                BackendMessage::Authentication(Authentication::parse(&mut cur, payload)?)
            }
            msg_type::PARAMETER_STATUS => {
                BackendMessage::ParameterStatus(ParameterStatus::parse(&mut cur)?)
            }
            msg_type::BACKEND_KEY_DATA => {
                BackendMessage::BackendKeyData(BackendKeyData::parse(&mut cur)?)
            }
            msg_type::READY_FOR_QUERY => {
                let status = cur.read_u8()?;
                let status = TransactionStatus::from_byte(status).ok_or_else(|| {
                    cur.error(format!("unknown transaction status '{}'", char::from(status)))
                })?;
                BackendMessage::ReadyForQuery(status)
            }
            msg_type::ROW_DESCRIPTION => {
                BackendMessage::RowDescription(RowDescription::parse(&mut cur)?)
            }
            msg_type::PARAMETER_DESCRIPTION => {
                BackendMessage::ParameterDescription(extended::parse_parameter_description(
                    &mut cur,
                )?)
            }
            msg_type::DATA_ROW => BackendMessage::DataRow(DataRow::parse(&mut cur, payload)?),
            msg_type::COMMAND_COMPLETE => {
                BackendMessage::CommandComplete(CommandComplete::parse(&mut cur)?)
            }
            msg_type::ERROR_RESPONSE => BackendMessage::ErrorResponse(error::parse_fields(&mut cur)?),
            msg_type::NOTICE_RESPONSE => {
                BackendMessage::NoticeResponse(error::parse_fields(&mut cur)?)
            }
            msg_type::NOTIFICATION_RESPONSE => {
                BackendMessage::NotificationResponse(NotificationResponse::parse(&mut cur)?)
            }
            msg_type::COPY_IN_RESPONSE => {
                BackendMessage::CopyInResponse(CopyResponse::parse(&mut cur)?)
            }
            msg_type::COPY_OUT_RESPONSE => {
                BackendMessage::CopyOutResponse(CopyResponse::parse(&mut cur)?)
            }
            msg_type::COPY_BOTH_RESPONSE => {
                BackendMessage::ReplicationStart(CopyResponse::parse(&mut cur)?)
            }
            _ => {
                tracing::warn!(
                    "Unrecognized backend message type '{}' ({} bytes)",
                    char::from(code),
                    payload.len()
                );
                return Ok(BackendMessage::Unknown {
                    code,
                    payload: payload.clone(),
                });
            }
        };

        if !matches!(message, BackendMessage::CopyData(_)) {
            cur.finish()?;
        }
        tracing::trace!("decoded {} ({} bytes)", msg_type::name(code), frame.length);
        Ok(message)
    }

    /// Check if this message can arrive at any time, outside of a request cycle.
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            BackendMessage::NoticeResponse(_)
                | BackendMessage::NotificationResponse(_)
                | BackendMessage::ParameterStatus(_)
        )
    }
}
