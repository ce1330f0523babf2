//! COPY protocol frontend messages.

use crate::protocol::writer::Writer;

/// Write a CopyData message.
pub fn write_copy_data(w: &mut Writer, data: &[u8]) {
    w.begin_message(super::msg_type::COPY_DATA)
        .add(data)
        .end_message();
}

/// Write a CopyDone message.
pub fn write_copy_done(w: &mut Writer) {
    w.begin_message(super::msg_type::COPY_DONE).end_message();
}

/// Write a CopyFail message.
pub fn write_copy_fail(w: &mut Writer, error_message: &str) {
    w.begin_message(super::msg_type::COPY_FAIL)
        .add_cstring(error_message)
        .end_message();
}
