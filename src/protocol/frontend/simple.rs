//! Simple query protocol messages.

use crate::protocol::writer::Writer;

/// Write a Query message.
///
/// The query string may contain multiple SQL statements separated by semicolons.
pub fn write_query(w: &mut Writer, query: &str) {
    w.begin_message(super::msg_type::QUERY)
        .add_cstring(query)
        .end_message();
}
