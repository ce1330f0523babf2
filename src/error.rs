//! Error types for zero-pgwire.

use thiserror::Error;

/// Result type for zero-pgwire operations.
pub type Result<T> = core::result::Result<T, Error>;

/// PostgreSQL error/notice fields, as carried by ErrorResponse and NoticeResponse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorFields {
    /// Severity: ERROR, FATAL, PANIC, WARNING, NOTICE, DEBUG, INFO, LOG
    pub severity: Option<String>,
    /// Non-localized severity (same as severity but never translated)
    pub severity_non_localized: Option<String>,
    /// SQLSTATE error code (5 characters)
    pub code: Option<String>,
    /// Primary error message
    pub message: Option<String>,
    /// Detailed error explanation
    pub detail: Option<String>,
    /// Suggestion for fixing the error
    pub hint: Option<String>,
    /// Cursor position in query string (1-based)
    pub position: Option<u32>,
    /// Position in internal query
    pub internal_position: Option<u32>,
    /// Failed internal command text
    pub internal_query: Option<String>,
    /// Context/stack trace
    pub where_: Option<String>,
    /// Schema name
    pub schema: Option<String>,
    /// Table name
    pub table: Option<String>,
    /// Column name
    pub column: Option<String>,
    /// Data type name
    pub data_type: Option<String>,
    /// Constraint name
    pub constraint: Option<String>,
    /// Source file name
    pub file: Option<String>,
    /// Source line number
    pub line: Option<u32>,
    /// Source routine name
    pub routine: Option<String>,
}

impl std::fmt::Display for ErrorFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(severity) = &self.severity {
            write!(f, "{}: ", severity)?;
        }
        if let Some(message) = &self.message {
            write!(f, "{}", message)?;
        }
        if let Some(code) = &self.code {
            write!(f, " (SQLSTATE {})", code)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, "\nDETAIL: {}", detail)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, "\nHINT: {}", hint)?;
        }
        Ok(())
    }
}

/// Coarse classification of an [`Error`], for recovery decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The byte stream could not be split into frames.
    Framing,
    /// A frame could not be decoded into a backend message.
    Decode,
    /// The server reported an error.
    Server,
    /// The authentication exchange failed on the client side.
    Auth,
    /// The underlying transport failed.
    Io,
    /// The engine was used outside of its contract.
    InvalidUsage,
    /// The server asked for something this engine does not implement.
    Unsupported,
}

/// Error type for zero-pgwire.
#[derive(Debug, Error)]
pub enum Error {
    /// The inbound byte stream is not a sequence of well-formed frames
    #[error("Framing error: {0}")]
    Framing(String),

    /// A frame carried a malformed payload
    #[error("Decode error in {message} ('{}'): {reason}", code_char(.code))]
    Decode {
        /// Message type byte of the offending frame
        code: u8,
        /// Message name
        message: &'static str,
        /// What went wrong
        reason: String,
    },

    /// Server error response
    #[error("PostgreSQL error: {0}")]
    Server(ErrorFields),

    /// SASL/SCRAM authentication failed on the client side
    #[error(transparent)]
    Sasl(#[from] SaslError),

    /// Authentication failed outside of SASL (missing password, policy)
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A reader already hit a fatal error and cannot be reused
    #[error("Connection is broken")]
    ConnectionBroken,

    /// Invalid usage (e.g., a SASL session advanced out of order)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// Unsupported feature
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

fn code_char(code: &u8) -> char {
    char::from(*code)
}

impl Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Framing(_) | Error::ConnectionBroken => ErrorKind::Framing,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::Server(_) => ErrorKind::Server,
            Error::Sasl(_) | Error::Auth(_) => ErrorKind::Auth,
            Error::Io(_) => ErrorKind::Io,
            Error::InvalidUsage(_) => ErrorKind::InvalidUsage,
            Error::Unsupported(_) => ErrorKind::Unsupported,
        }
    }

    /// Returns true if the error indicates the connection is broken and cannot be reused.
    pub fn is_connection_broken(&self) -> bool {
        match self {
            Error::Framing(_)
            | Error::Decode { .. }
            | Error::Sasl(_)
            | Error::Auth(_)
            | Error::Io(_)
            | Error::ConnectionBroken => true,
            Error::Server(fields) => {
                // FATAL and PANIC errors terminate the session
                matches!(fields.effective_severity(), Some("FATAL") | Some("PANIC"))
            }
            _ => false,
        }
    }

    /// Get the SQLSTATE code if this is a server error.
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Server(fields) => fields.code.as_deref(),
            _ => None,
        }
    }
}

/// The SASL exchange step an error was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaslPhase {
    /// Mechanism selection and client-first-message.
    Start,
    /// Processing of the server-first-message.
    ServerFirst,
    /// Processing of the server-final-message.
    ServerFinal,
}

impl std::fmt::Display for SaslPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SaslPhase::Start => "SCRAM-CLIENT-FIRST-MESSAGE",
            SaslPhase::ServerFirst => "SCRAM-SERVER-FIRST-MESSAGE",
            SaslPhase::ServerFinal => "SCRAM-SERVER-FINAL-MESSAGE",
        })
    }
}

/// SASL/SCRAM failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SASL: {phase}: {kind}")]
pub struct SaslError {
    /// Step of the exchange that failed
    pub phase: SaslPhase,
    /// Reason
    pub kind: SaslErrorKind,
}

impl SaslError {
    pub(crate) fn new(phase: SaslPhase, kind: SaslErrorKind) -> Self {
        Self { phase, kind }
    }
}

/// Reason of a [`SaslError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaslErrorKind {
    #[error("only mechanisms {supported} are supported, server offered [{offered}]")]
    UnsupportedMechanism { supported: String, offered: String },
    #[error("channel binding required but the server did not offer SCRAM-SHA-256-PLUS over TLS")]
    ChannelBindingRequired,
    #[error("session is in state {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("client password must be a non-empty string")]
    EmptyPassword,
    #[error("message is not valid UTF-8")]
    InvalidUtf8,
    #[error("invalid attribute pair entry")]
    InvalidAttributePair,
    #[error("{0} missing")]
    MissingAttribute(&'static str),
    #[error("nonce must only contain printable characters")]
    NonPrintableNonce,
    #[error("salt must be base64")]
    InvalidSalt,
    #[error("invalid iteration count")]
    InvalidIterationCount,
    #[error("server nonce does not start with client nonce")]
    NonceMismatch,
    #[error("server nonce is too short")]
    NonceTooShort,
    #[error("SCRAM-SHA-256-PLUS requires the peer certificate of a secure connection")]
    MissingPeerCertificate,
    #[error(transparent)]
    Certificate(#[from] CertificateError),
    #[error("cryptographic provider failed: {0}")]
    Crypto(String),
    #[error("server signature must be base64")]
    InvalidServerSignature,
    #[error("server signature does not match")]
    ServerSignatureMismatch,
    #[error("server reported error: {0}")]
    ServerError(String),
}

/// Failure to derive the channel-binding hash from a peer certificate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("SASL channel binding: {reason} when parsing public certificate")]
pub struct CertificateError {
    /// What the DER walker tripped on
    pub reason: String,
}

impl CertificateError {
    pub(crate) fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_names_code() {
        let err = Error::Decode {
            code: b'T',
            message: "RowDescription",
            reason: "truncated".into(),
        };
        assert_eq!(
            err.to_string(),
            "Decode error in RowDescription ('T'): truncated"
        );
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.is_connection_broken());
    }

    #[test]
    fn test_sasl_error_names_phase() {
        let err: Error =
            SaslError::new(SaslPhase::ServerFinal, SaslErrorKind::ServerSignatureMismatch).into();
        assert_eq!(
            err.to_string(),
            "SASL: SCRAM-SERVER-FINAL-MESSAGE: server signature does not match"
        );
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn test_server_error_severity() {
        let mut fields = ErrorFields {
            severity: Some("ERROR".into()),
            code: Some("42P01".into()),
            message: Some("relation \"t\" does not exist".into()),
            ..Default::default()
        };
        let err = Error::Server(fields.clone());
        assert!(!err.is_connection_broken());
        assert_eq!(err.sqlstate(), Some("42P01"));
        assert_eq!(
            err.to_string(),
            "PostgreSQL error: ERROR: relation \"t\" does not exist (SQLSTATE 42P01)"
        );

        fields.severity = Some("FATAL".into());
        assert!(Error::Server(fields).is_connection_broken());
    }
}
