//! Extended query protocol messages.

use crate::protocol::types::{FormatCode, Oid};
use crate::protocol::writer::Writer;

/// Parameter value for a Bind message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindValue<'a> {
    /// SQL NULL
    Null,
    /// Value in text format
    Text(&'a str),
    /// Value already encoded in binary format
    Binary(&'a [u8]),
}

impl BindValue<'_> {
    fn is_binary(&self) -> bool {
        matches!(self, BindValue::Binary(_))
    }

    fn bytes(&self) -> Option<&[u8]> {
        match self {
            BindValue::Null => None,
            BindValue::Text(s) => Some(s.as_bytes()),
            BindValue::Binary(b) => Some(b),
        }
    }
}

impl<'a> From<&'a str> for BindValue<'a> {
    fn from(value: &'a str) -> Self {
        BindValue::Text(value)
    }
}

impl<'a> From<&'a [u8]> for BindValue<'a> {
    fn from(value: &'a [u8]) -> Self {
        BindValue::Binary(value)
    }
}

impl<'a, T: Into<BindValue<'a>>> From<Option<T>> for BindValue<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(BindValue::Null, Into::into)
    }
}

/// Target of a Describe or Close message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Prepared statement ('S')
    Statement,
    /// Portal ('P')
    Portal,
}

impl Target {
    /// Wire byte for this target.
    pub fn as_byte(self) -> u8 {
        match self {
            Target::Statement => b'S',
            Target::Portal => b'P',
        }
    }
}

/// Write a Parse message to create a prepared statement.
///
/// - `name`: Statement name (empty string for unnamed statement)
/// - `query`: SQL query with $1, $2, ... placeholders
/// - `param_oids`: Parameter type OIDs (0 = let server infer)
///
/// # Panics
///
/// Panics if there are more than `i16::MAX` parameter types.
pub fn write_parse(w: &mut Writer, name: &str, query: &str, param_oids: &[Oid]) {
    let count = count_i16(param_oids.len(), "parameter types");
    w.begin_message(super::msg_type::PARSE)
        .add_cstring(name)
        .add_cstring(query)
        .add_i16(count);
    for &oid in param_oids {
        w.add_u32(oid);
    }
    w.end_message();
}

/// Write a Bind message to create a portal from a prepared statement.
///
/// Parameter format codes are only sent when at least one value is binary;
/// otherwise the server treats every value as text.
///
/// - `portal`: Portal name (empty string for unnamed portal)
/// - `statement`: Statement name
/// - `params`: Parameter values
/// - `result_format`: Format requested for all result columns
///
/// # Panics
///
/// Panics if there are more than `i16::MAX` parameters, or a value exceeds
/// `i32::MAX` bytes.
pub fn write_bind(
    w: &mut Writer,
    portal: &str,
    statement: &str,
    params: &[BindValue<'_>],
    result_format: FormatCode,
) {
    let count = count_i16(params.len(), "parameters");
    w.begin_message(super::msg_type::BIND)
        .add_cstring(portal)
        .add_cstring(statement);

    // Parameter format codes
    if params.iter().any(BindValue::is_binary) {
        w.add_i16(count);
        for param in params {
            let format = if param.is_binary() {
                FormatCode::Binary
            } else {
                FormatCode::Text
            };
            w.add_i16(format.as_i16());
        }
    } else {
        w.add_i16(0);
    }

    // Parameter values (count + length-prefixed data)
    w.add_i16(count);
    for param in params {
        w.add_len_prefixed(param.bytes());
    }

    // Result format codes
    match result_format {
        FormatCode::Text => w.add_i16(0),
        FormatCode::Binary => w.add_i16(1).add_i16(FormatCode::Binary.as_i16()),
    };

    w.end_message();
}

/// Write an Execute message to run a portal.
///
/// - `portal`: Portal name
/// - `max_rows`: Maximum number of rows to return (0 = unlimited)
pub fn write_execute(w: &mut Writer, portal: &str, max_rows: u32) {
    w.begin_message(super::msg_type::EXECUTE)
        .add_cstring(portal)
        .add_u32(max_rows)
        .end_message();
}

/// Write a Describe message to get metadata of a statement or portal.
pub fn write_describe(w: &mut Writer, target: Target, name: &str) {
    w.begin_message(super::msg_type::DESCRIBE)
        .add_char(target.as_byte())
        .add_cstring(name)
        .end_message();
}

/// Write a Close message to release a statement or portal.
pub fn write_close(w: &mut Writer, target: Target, name: &str) {
    w.begin_message(super::msg_type::CLOSE)
        .add_char(target.as_byte())
        .add_cstring(name)
        .end_message();
}

/// Write a Sync message.
///
/// This ends an extended query sequence and causes:
/// - Implicit COMMIT if successful and not in explicit transaction
/// - Implicit ROLLBACK if failed and not in explicit transaction
/// - Server responds with ReadyForQuery
pub fn write_sync(w: &mut Writer) {
    w.begin_message(super::msg_type::SYNC).end_message();
}

/// Write a Flush message.
///
/// Forces the server to send all pending responses without waiting for Sync.
pub fn write_flush(w: &mut Writer) {
    w.begin_message(super::msg_type::FLUSH).end_message();
}

fn count_i16(len: usize, what: &str) -> i16 {
    match i16::try_from(len) {
        Ok(count) => count,
        Err(_) => panic!("too many {what}: {len} exceeds i16::MAX"),
    }
}
