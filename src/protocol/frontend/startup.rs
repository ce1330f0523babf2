//! Startup, cancellation and termination messages.

use crate::protocol::writer::Writer;

/// Protocol version 3.0 (0x00030000)
pub const PROTOCOL_VERSION_3_0: i32 = 196608;

/// SSL request code (1234 << 16 | 5679)
pub const SSL_REQUEST_CODE: i32 = 80877103;

/// Cancel request code (1234 << 16 | 5678)
pub const CANCEL_REQUEST_CODE: i32 = 80877102;

/// Write an SSLRequest message.
///
/// This is sent before StartupMessage to request TLS encryption.
/// Server responds with single byte: 'S' (accepted) or 'N' (rejected).
pub fn write_ssl_request(w: &mut Writer) {
    w.begin_untagged().add_i32(SSL_REQUEST_CODE).end_message();
}

/// Write a StartupMessage.
///
/// Parameters is a list of (name, value) pairs; see [`crate::Opts::startup_params`].
pub fn write_startup(w: &mut Writer, params: &[(&str, &str)]) {
    w.begin_untagged().add_i32(PROTOCOL_VERSION_3_0);
    for (name, value) in params {
        w.add_cstring(name).add_cstring(value);
    }
    // Terminator
    w.add_char(0).end_message();
}

/// Write a CancelRequest message.
///
/// This is sent on a NEW connection to cancel a query running on another connection.
/// The server closes the connection immediately with no response.
pub fn write_cancel_request(w: &mut Writer, process_id: u32, secret_key: u32) {
    w.begin_untagged()
        .add_i32(CANCEL_REQUEST_CODE)
        .add_u32(process_id)
        .add_u32(secret_key)
        .end_message();
}

/// Write a Terminate message.
pub fn write_terminate(w: &mut Writer) {
    w.begin_message(super::msg_type::TERMINATE).end_message();
}
