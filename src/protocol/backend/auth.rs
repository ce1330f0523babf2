//! Authentication and session-level backend messages.

use bytes::Bytes;
use zerocopy::byteorder::big_endian::U32 as U32BE;
use zerocopy::{FromBytes, Immutable, KnownLayout};

use crate::error::Result;
use crate::protocol::codec::Cursor;

/// Authentication method constants.
pub mod auth_type {
    pub const OK: i32 = 0;
    pub const KERBEROS_V5: i32 = 2;
    pub const CLEARTEXT_PASSWORD: i32 = 3;
    pub const MD5_PASSWORD: i32 = 5;
    pub const GSS: i32 = 7;
    pub const GSS_CONTINUE: i32 = 8;
    pub const SSPI: i32 = 9;
    pub const SASL: i32 = 10;
    pub const SASL_CONTINUE: i32 = 11;
    pub const SASL_FINAL: i32 = 12;
}

/// Authentication message from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authentication {
    /// Authentication successful
    Ok,
    /// Kerberos V5 authentication required
    KerberosV5,
    /// Cleartext password required
    CleartextPassword,
    /// MD5 password required (with 4-byte salt)
    Md5Password { salt: [u8; 4] },
    /// GSS authentication
    Gss,
    /// GSS continue (with additional data)
    GssContinue { data: Bytes },
    /// SSPI authentication
    Sspi,
    /// SASL authentication required (with list of mechanisms)
    Sasl { mechanisms: Vec<String> },
    /// SASL continue (with server-first-message)
    SaslContinue { data: Bytes },
    /// SASL final (with server-final-message)
    SaslFinal { data: Bytes },
}

impl Authentication {
    /// Parse an Authentication message body.
    pub(crate) fn parse(cur: &mut Cursor<'_>, payload: &Bytes) -> Result<Self> {
        let auth_type = cur.read_i32()?;

        let auth = match auth_type {
            auth_type::OK => Authentication::Ok,
            auth_type::KERBEROS_V5 => Authentication::KerberosV5,
            auth_type::CLEARTEXT_PASSWORD => Authentication::CleartextPassword,
            auth_type::MD5_PASSWORD => {
                let mut salt = [0u8; 4];
                salt.copy_from_slice(cur.read_bytes(4)?);
                Authentication::Md5Password { salt }
            }
            auth_type::GSS => Authentication::Gss,
            auth_type::SSPI => Authentication::Sspi,
            auth_type::SASL => {
                let mut mechanisms = Vec::new();
                loop {
                    let mechanism = cur.read_cstr()?;
                    if mechanism.is_empty() {
                        break;
                    }
                    mechanisms.push(mechanism.to_string());
                }
                Authentication::Sasl { mechanisms }
            }
            auth_type::GSS_CONTINUE | auth_type::SASL_CONTINUE | auth_type::SASL_FINAL => {
                let start = cur.position();
                cur.read_rest();
                let data = payload.slice(start..);
                match auth_type {
                    auth_type::GSS_CONTINUE => Authentication::GssContinue { data },
                    auth_type::SASL_CONTINUE => Authentication::SaslContinue { data },
                    _ => Authentication::SaslFinal { data },
                }
            }
            _ => {
                return Err(cur.error(format!("unknown authentication type: {auth_type}")));
            }
        };
        Ok(auth)
    }
}

/// Fixed layout of BackendKeyData.
#[derive(Debug, Clone, Copy, FromBytes, KnownLayout, Immutable)]
#[repr(C, packed)]
struct BackendKeyDataRaw {
    pid: U32BE,
    secret_key: U32BE,
}

/// BackendKeyData message - contains process ID and secret key for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendKeyData {
    /// Process ID of the backend
    pub process_id: u32,
    /// Secret key for cancellation
    pub secret_key: u32,
}

impl BackendKeyData {
    pub(crate) fn parse(cur: &mut Cursor<'_>) -> Result<Self> {
        let raw: BackendKeyDataRaw = cur.read_struct("BackendKeyData")?;
        Ok(Self {
            process_id: raw.pid.get(),
            secret_key: raw.secret_key.get(),
        })
    }
}

/// ParameterStatus message - server parameter name and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterStatus {
    /// Parameter name
    pub name: String,
    /// Parameter value
    pub value: String,
}

impl ParameterStatus {
    pub(crate) fn parse(cur: &mut Cursor<'_>) -> Result<Self> {
        let name = cur.read_cstr()?.to_string();
        let value = cur.read_cstr()?.to_string();
        Ok(Self { name, value })
    }
}

/// NotificationResponse message - asynchronous notification from LISTEN/NOTIFY.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationResponse {
    /// PID of the notifying backend
    pub process_id: u32,
    /// Channel name
    pub channel: String,
    /// Notification payload
    pub payload: String,
}

impl NotificationResponse {
    pub(crate) fn parse(cur: &mut Cursor<'_>) -> Result<Self> {
        let process_id = cur.read_u32()?;
        let channel = cur.read_cstr()?.to_string();
        let payload = cur.read_cstr()?.to_string();
        Ok(Self {
            process_id,
            channel,
            payload,
        })
    }
}
