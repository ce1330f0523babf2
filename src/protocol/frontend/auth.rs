//! Authentication messages.

use crate::protocol::writer::Writer;

/// Write a PasswordMessage (cleartext or MD5 hashed password).
pub fn write_password(w: &mut Writer, password: &str) {
    w.begin_message(super::msg_type::PASSWORD)
        .add_cstring(password)
        .end_message();
}

/// Compute MD5 password hash.
///
/// PostgreSQL MD5 password format: "md5" + md5(md5(password + username) + salt)
pub fn md5_password(username: &str, password: &str, salt: &[u8; 4]) -> String {
    use md5::{Digest, Md5};

    // First hash: md5(password + username)
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(username.as_bytes());
    let first_hash_hex = format!("{:x}", hasher.finalize());

    // Second hash: md5(first_hash_hex + salt)
    let mut hasher = Md5::new();
    hasher.update(first_hash_hex.as_bytes());
    hasher.update(salt);

    format!("md5{:x}", hasher.finalize())
}

/// Write a SASLInitialResponse message.
///
/// mechanism: SASL mechanism name (e.g., "SCRAM-SHA-256")
/// initial_response: Client-first-message for SCRAM
///
/// # Panics
///
/// Panics if the response exceeds `i32::MAX` bytes.
pub fn write_sasl_initial_response(w: &mut Writer, mechanism: &str, initial_response: &[u8]) {
    w.begin_message(super::msg_type::PASSWORD)
        .add_cstring(mechanism)
        .add_len_prefixed(Some(initial_response))
        .end_message();
}

/// Write a SASLResponse message.
///
/// response: Client-final-message for SCRAM
pub fn write_sasl_response(w: &mut Writer, response: &[u8]) {
    w.begin_message(super::msg_type::PASSWORD)
        .add(response)
        .end_message();
}
