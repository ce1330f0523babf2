//! SCRAM-SHA-256 / SCRAM-SHA-256-PLUS client session (RFC 5802, RFC 7677).

use std::sync::Arc;

use crate::error::{SaslError, SaslErrorKind, SaslPhase};

use super::attributes::{self, Attributes};
use super::cert;
use super::crypto::{CryptoProvider, RustCrypto};

/// SCRAM-SHA-256 mechanism name.
pub const SCRAM_SHA_256: &str = "SCRAM-SHA-256";
/// SCRAM-SHA-256 with `tls-server-end-point` channel binding.
pub const SCRAM_SHA_256_PLUS: &str = "SCRAM-SHA-256-PLUS";

/// Raw client nonce length before base64.
const NONCE_LEN: usize = 18;

const TLS_SERVER_END_POINT: &str = "p=tls-server-end-point";

/// Result of a SASL step.
pub type SaslResult<T> = std::result::Result<T, SaslError>;

/// Selected SASL mechanism.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    /// SCRAM-SHA-256
    ScramSha256,
    /// SCRAM-SHA-256-PLUS
    ScramSha256Plus,
}

impl Mechanism {
    /// Mechanism name as sent in SASLInitialResponse.
    pub fn name(self) -> &'static str {
        match self {
            Mechanism::ScramSha256 => SCRAM_SHA_256,
            Mechanism::ScramSha256Plus => SCRAM_SHA_256_PLUS,
        }
    }
}

enum State {
    /// Client-first-message sent
    InitialResponseSent,
    /// Client-final-message sent; expected server signature (base64)
    ResponseSent { server_signature: String },
    /// A step failed; the session cannot be resumed
    Failed,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::InitialResponseSent => "SASLInitialResponse",
            State::ResponseSent { .. } => "SASLResponse",
            State::Failed => "Failed",
        }
    }
}

/// Client side of one SCRAM exchange.
///
/// 1. [`start`](Self::start) selects the mechanism and produces the
///    client-first-message (SASLInitialResponse data).
/// 2. [`continue_session`](Self::continue_session) consumes the
///    server-first-message (AuthenticationSASLContinue) and produces the
///    client-final-message (SASLResponse data).
/// 3. [`finalize`](Self::finalize) verifies the server-final-message
///    (AuthenticationSASLFinal).
///
/// Any failure leaves the session unusable.
pub struct SaslSession {
    mechanism: Mechanism,
    tls: bool,
    client_nonce: String,
    state: State,
    crypto: Arc<dyn CryptoProvider>,
}

impl std::fmt::Debug for SaslSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaslSession")
            .field("mechanism", &self.mechanism)
            .field("tls", &self.tls)
            .field("state", &self.state.name())
            .finish_non_exhaustive()
    }
}

impl SaslSession {
    /// Start a session with the default [`RustCrypto`] provider.
    ///
    /// `tls` tells whether the transport is a confirmed TLS connection.
    /// Returns the session and the client-first-message.
    pub fn start<S: AsRef<str>>(mechanisms: &[S], tls: bool) -> SaslResult<(Self, String)> {
        Self::start_with_provider(mechanisms, tls, Arc::new(RustCrypto))
    }

    /// Start a session with a custom [`CryptoProvider`].
    pub fn start_with_provider<S: AsRef<str>>(
        mechanisms: &[S],
        tls: bool,
        crypto: Arc<dyn CryptoProvider>,
    ) -> SaslResult<(Self, String)> {
        let candidates: &[Mechanism] = if tls {
            &[Mechanism::ScramSha256Plus, Mechanism::ScramSha256]
        } else {
            &[Mechanism::ScramSha256]
        };

        let Some(&mechanism) = candidates
            .iter()
            .find(|c| mechanisms.iter().any(|m| m.as_ref() == c.name()))
        else {
            let supported: Vec<&str> = candidates.iter().map(|c| c.name()).collect();
            let offered: Vec<&str> = mechanisms.iter().map(|m| m.as_ref()).collect();
            return Err(SaslError::new(
                SaslPhase::Start,
                SaslErrorKind::UnsupportedMechanism {
                    supported: supported.join(" and "),
                    offered: offered.join(", "),
                },
            ));
        };

        let mut nonce = [0u8; NONCE_LEN];
        crypto.random_bytes(&mut nonce);
        let client_nonce = attributes::encode(nonce);

        let session = Self {
            mechanism,
            tls,
            client_nonce,
            state: State::InitialResponseSent,
            crypto,
        };
        tracing::debug!(
            "SASL mechanism {} selected (gs2 header '{}')",
            mechanism.name(),
            session.gs2_header()
        );

        let response = format!("{},,{}", session.gs2_header(), session.client_first_bare());
        Ok((session, response))
    }

    /// Selected mechanism.
    pub fn mechanism(&self) -> Mechanism {
        self.mechanism
    }

    /// Base64 client nonce.
    pub fn client_nonce(&self) -> &str {
        &self.client_nonce
    }

    /// Returns true if a step failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed)
    }

    /// GS2 channel-binding flag: bind (`p=`), could bind but won't (`y`), can't (`n`).
    fn gs2_header(&self) -> &'static str {
        match self.mechanism {
            Mechanism::ScramSha256Plus => TLS_SERVER_END_POINT,
            Mechanism::ScramSha256 if self.tls => "y",
            Mechanism::ScramSha256 => "n",
        }
    }

    fn client_first_bare(&self) -> String {
        // The user name is taken from the startup message
        format!("n=*,r={}", self.client_nonce)
    }

    /// Process the server-first-message and produce the client-final-message.
    ///
    /// `peer_certificate` is the server's DER certificate; it is required for
    /// SCRAM-SHA-256-PLUS and ignored otherwise.
    pub fn continue_session(
        &mut self,
        password: &str,
        server_first: &[u8],
        peer_certificate: Option<&[u8]>,
    ) -> SaslResult<String> {
        if !matches!(self.state, State::InitialResponseSent) {
            return Err(SaslError::new(
                SaslPhase::ServerFirst,
                SaslErrorKind::InvalidState {
                    expected: State::InitialResponseSent.name(),
                    actual: self.state.name(),
                },
            ));
        }

        match self.server_first(password, server_first, peer_certificate) {
            Ok((response, server_signature)) => {
                self.state = State::ResponseSent { server_signature };
                tracing::debug!("SASL client-final-message prepared");
                Ok(response)
            }
            Err(kind) => {
                self.state = State::Failed;
                Err(SaslError::new(SaslPhase::ServerFirst, kind))
            }
        }
    }

    /// Returns (client-final-message, expected server signature).
    fn server_first(
        &self,
        password: &str,
        server_first: &[u8],
        peer_certificate: Option<&[u8]>,
    ) -> Result<(String, String), SaslErrorKind> {
        if password.is_empty() {
            return Err(SaslErrorKind::EmptyPassword);
        }
        let server_first =
            simdutf8::basic::from_utf8(server_first).map_err(|_| SaslErrorKind::InvalidUtf8)?;

        let attrs = Attributes::parse(server_first)?;
        let nonce = attrs.require('r', "nonce")?;
        if !attributes::is_printable(nonce) {
            return Err(SaslErrorKind::NonPrintableNonce);
        }
        let salt = attrs.require('s', "salt")?;
        let salt = Some(salt)
            .filter(|s| attributes::is_base64(s))
            .and_then(attributes::decode)
            .filter(|s| !s.is_empty())
            .ok_or(SaslErrorKind::InvalidSalt)?;
        let iterations = attrs.require('i', "iteration")?;
        let iterations: u32 = Some(iterations)
            .filter(|i| attributes::is_positive_integer(i))
            .and_then(|i| i.parse().ok())
            .ok_or(SaslErrorKind::InvalidIterationCount)?;

        if !nonce.starts_with(&self.client_nonce) {
            return Err(SaslErrorKind::NonceMismatch);
        }
        if nonce.len() == self.client_nonce.len() {
            return Err(SaslErrorKind::NonceTooShort);
        }

        let channel_binding = self.channel_binding(peer_certificate)?;
        let client_final_without_proof = format!("c={channel_binding},r={nonce}");
        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare(),
            server_first,
            client_final_without_proof
        );

        let crypto = &*self.crypto;
        let salted_password = crypto.pbkdf2_sha256(password.as_bytes(), &salt, iterations);
        let client_key = crypto.hmac_sha256(&salted_password, b"Client Key")?;
        let stored_key = crypto.sha256(&client_key);
        let client_signature = crypto.hmac_sha256(&stored_key, auth_message.as_bytes())?;
        let client_proof = xor(&client_key, &client_signature);

        let server_key = crypto.hmac_sha256(&salted_password, b"Server Key")?;
        let server_signature = crypto.hmac_sha256(&server_key, auth_message.as_bytes())?;

        let response = format!(
            "{client_final_without_proof},p={}",
            attributes::encode(client_proof)
        );
        Ok((response, attributes::encode(server_signature)))
    }

    /// Base64 `c=` attribute value.
    fn channel_binding(&self, peer_certificate: Option<&[u8]>) -> Result<String, SaslErrorKind> {
        let mut data = format!("{},,", self.gs2_header()).into_bytes();
        if self.mechanism == Mechanism::ScramSha256Plus {
            let der = peer_certificate.ok_or(SaslErrorKind::MissingPeerCertificate)?;
            data.extend_from_slice(&cert::tls_server_end_point(der, &*self.crypto)?);
        }
        Ok(attributes::encode(data))
    }

    /// Verify the server-final-message. The session is consumed either way.
    pub fn finalize(self, server_final: &[u8]) -> SaslResult<()> {
        let State::ResponseSent { server_signature } = &self.state else {
            return Err(SaslError::new(
                SaslPhase::ServerFinal,
                SaslErrorKind::InvalidState {
                    expected: "SASLResponse",
                    actual: self.state.name(),
                },
            ));
        };

        verify_server_final(server_final, server_signature)
            .map_err(|kind| SaslError::new(SaslPhase::ServerFinal, kind))?;
        tracing::debug!("SASL server signature verified");
        Ok(())
    }
}

fn verify_server_final(server_final: &[u8], expected: &str) -> Result<(), SaslErrorKind> {
    let server_final =
        simdutf8::basic::from_utf8(server_final).map_err(|_| SaslErrorKind::InvalidUtf8)?;
    let attrs = Attributes::parse(server_final)?;

    if let Some(error) = attrs.get('e') {
        return Err(SaslErrorKind::ServerError(error.to_string()));
    }
    let signature = attrs.require('v', "server signature")?;
    if !attributes::is_base64(signature) {
        return Err(SaslErrorKind::InvalidServerSignature);
    }
    if signature != expected {
        return Err(SaslErrorKind::ServerSignatureMismatch);
    }
    Ok(())
}

fn xor(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    std::array::from_fn(|i| a[i] ^ b[i])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sasl::crypto::{CryptoError, HashAlgorithm};

    /// RustCrypto with a fixed nonce 00 01 .. 11.
    struct FixedNonce;

    impl CryptoProvider for FixedNonce {
        fn random_bytes(&self, buf: &mut [u8]) {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = i as u8;
            }
        }
        fn sha256(&self, data: &[u8]) -> [u8; 32] {
            RustCrypto.sha256(data)
        }
        fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> Result<[u8; 32], CryptoError> {
            RustCrypto.hmac_sha256(key, data)
        }
        fn pbkdf2_sha256(&self, password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
            RustCrypto.pbkdf2_sha256(password, salt, iterations)
        }
        fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
            RustCrypto.digest(algorithm, data)
        }
    }

    const CLIENT_NONCE: &str = "AAECAwQFBgcICQoLDA0ODxAR";
    const SERVER_FIRST: &str =
        "r=AAECAwQFBgcICQoLDA0ODxAR3rfcNHYJY1ZVvWVs7j,s=QSXCR+Q6sek8bf92,i=4096";

    fn start(mechanisms: &[&str], tls: bool) -> (SaslSession, String) {
        SaslSession::start_with_provider(mechanisms, tls, Arc::new(FixedNonce)).unwrap()
    }

    fn server_first_err(session: &mut SaslSession, server_first: &str) -> SaslErrorKind {
        session
            .continue_session("pencil", server_first.as_bytes(), None)
            .unwrap_err()
            .kind
    }

    #[test]
    fn test_start_plain() {
        let (session, response) = start(&[SCRAM_SHA_256], false);
        assert_eq!(session.mechanism(), Mechanism::ScramSha256);
        assert_eq!(session.client_nonce(), CLIENT_NONCE);
        assert_eq!(response, format!("n,,n=*,r={CLIENT_NONCE}"));
    }

    #[test]
    fn test_mechanism_selection() {
        let (session, response) = start(&[SCRAM_SHA_256], true);
        assert_eq!(session.mechanism(), Mechanism::ScramSha256);
        assert!(response.starts_with("y,,n=*,r="));

        let (session, response) = start(&[SCRAM_SHA_256, SCRAM_SHA_256_PLUS], true);
        assert_eq!(session.mechanism(), Mechanism::ScramSha256Plus);
        assert!(response.starts_with("p=tls-server-end-point,,n=*,r="));

        // PLUS is never chosen without TLS
        let (session, _) = start(&[SCRAM_SHA_256_PLUS, SCRAM_SHA_256], false);
        assert_eq!(session.mechanism(), Mechanism::ScramSha256);
    }

    #[test]
    fn test_unsupported_mechanism() {
        let err = SaslSession::start(&["SCRAM-SHA-1"], false).unwrap_err();
        assert_eq!(err.phase, SaslPhase::Start);
        assert_eq!(
            err.to_string(),
            "SASL: SCRAM-CLIENT-FIRST-MESSAGE: only mechanisms SCRAM-SHA-256 are supported, \
             server offered [SCRAM-SHA-1]"
        );

        let err = SaslSession::start(&[SCRAM_SHA_256_PLUS], false).unwrap_err();
        assert!(matches!(
            err.kind,
            SaslErrorKind::UnsupportedMechanism { .. }
        ));
    }

    #[test]
    fn test_random_nonce() {
        let (a, first) = SaslSession::start(&[SCRAM_SHA_256], false).unwrap();
        let (b, _) = SaslSession::start(&[SCRAM_SHA_256], false).unwrap();
        assert_eq!(a.client_nonce().len(), 24);
        assert_ne!(a.client_nonce(), b.client_nonce());
        assert!(first.ends_with(a.client_nonce()));
    }

    #[test]
    fn test_full_exchange_without_tls() {
        let (mut session, _) = start(&[SCRAM_SHA_256], false);
        let response = session
            .continue_session("pencil", SERVER_FIRST.as_bytes(), None)
            .unwrap();
        assert_eq!(
            response,
            "c=biws,r=AAECAwQFBgcICQoLDA0ODxAR3rfcNHYJY1ZVvWVs7j,\
             p=tC9h5qBtzZscYTR3JwroSdu5Orzan1JhCXZhG9duUOs="
        );
        session
            .finalize(b"v=ZtSeTZehBADIuPjNktzyCPiVP1EATZe/9YKu3MSLYWE=")
            .unwrap();
    }

    #[test]
    fn test_full_exchange_tls_without_binding() {
        let (mut session, _) = start(&[SCRAM_SHA_256], true);
        let response = session
            .continue_session("pencil", SERVER_FIRST.as_bytes(), None)
            .unwrap();
        assert_eq!(
            response,
            "c=eSws,r=AAECAwQFBgcICQoLDA0ODxAR3rfcNHYJY1ZVvWVs7j,\
             p=3Sfw7m5AL0rVZHIZBvOIjMMkEyKYzqVoflRpcnB2iUw="
        );
        session
            .finalize(b"v=1xYnzSQYgshoGxnQUlSdac/tmFpsYiElLR2M18hCUGU=")
            .unwrap();
    }

    #[test]
    fn test_server_signature_mismatch() {
        let (mut session, _) = start(&[SCRAM_SHA_256], false);
        session
            .continue_session("pencil", SERVER_FIRST.as_bytes(), None)
            .unwrap();
        let err = session
            .finalize(b"v=1xYnzSQYgshoGxnQUlSdac/tmFpsYiElLR2M18hCUGU=")
            .unwrap_err();
        assert_eq!(err.phase, SaslPhase::ServerFinal);
        assert_eq!(err.kind, SaslErrorKind::ServerSignatureMismatch);
        assert_eq!(
            err.to_string(),
            "SASL: SCRAM-SERVER-FINAL-MESSAGE: server signature does not match"
        );
    }

    #[test]
    fn test_server_final_errors() {
        let cases: [(&[u8], SaslErrorKind); 4] = [
            (b"", SaslErrorKind::InvalidAttributePair),
            (b"x=1", SaslErrorKind::MissingAttribute("server signature")),
            (b"v=not base64", SaslErrorKind::InvalidServerSignature),
            (
                b"e=invalid-proof",
                SaslErrorKind::ServerError("invalid-proof".into()),
            ),
        ];
        for (server_final, expected) in cases {
            let (mut session, _) = start(&[SCRAM_SHA_256], false);
            session
                .continue_session("pencil", SERVER_FIRST.as_bytes(), None)
                .unwrap();
            assert_eq!(session.finalize(server_final).unwrap_err().kind, expected);
        }
    }

    #[test]
    fn test_nonce_checks() {
        let (mut session, _) = start(&[SCRAM_SHA_256], false);
        assert_eq!(
            server_first_err(&mut session, "r=AAECAwQFBgcICQoLDA0ODxAR,s=QSXCR+Q6sek8bf92,i=4096"),
            SaslErrorKind::NonceTooShort
        );

        let (mut session, _) = start(&[SCRAM_SHA_256], false);
        assert_eq!(
            server_first_err(&mut session, "r=BBECAwQFBgcICQoLDA0ODxARxyz,s=QSXCR+Q6sek8bf92,i=4096"),
            SaslErrorKind::NonceMismatch
        );

        let (mut session, _) = start(&[SCRAM_SHA_256], false);
        assert_eq!(
            server_first_err(&mut session, "r=AAECAwQFBgcICQoLDA0ODxAR x,s=QSXCR+Q6sek8bf92,i=4096"),
            SaslErrorKind::NonPrintableNonce
        );
    }

    #[test]
    fn test_server_first_attribute_errors() {
        let nonce = format!("r={CLIENT_NONCE}abc");
        let cases = [
            ("s=QSXCR+Q6sek8bf92,i=4096".to_string(), SaslErrorKind::MissingAttribute("nonce")),
            (format!("{nonce},i=4096"), SaslErrorKind::MissingAttribute("salt")),
            (format!("{nonce},s=QSXCR+Q6sek8bf92"), SaslErrorKind::MissingAttribute("iteration")),
            (format!("{nonce},s=QSX!,i=4096"), SaslErrorKind::InvalidSalt),
            (format!("{nonce},s=QSXCR+Q6sek8bf92,i=0"), SaslErrorKind::InvalidIterationCount),
            (format!("{nonce},s=QSXCR+Q6sek8bf92,i=-5"), SaslErrorKind::InvalidIterationCount),
            (
                format!("{nonce},s=QSXCR+Q6sek8bf92,i=99999999999"),
                SaslErrorKind::InvalidIterationCount,
            ),
            ("garbage".to_string(), SaslErrorKind::InvalidAttributePair),
        ];
        for (server_first, expected) in cases {
            let (mut session, _) = start(&[SCRAM_SHA_256], false);
            assert_eq!(server_first_err(&mut session, &server_first), expected, "{server_first}");
        }
    }

    #[test]
    fn test_empty_password() {
        let (mut session, _) = start(&[SCRAM_SHA_256], false);
        let err = session
            .continue_session("", SERVER_FIRST.as_bytes(), None)
            .unwrap_err();
        assert_eq!(err.phase, SaslPhase::ServerFirst);
        assert_eq!(err.kind, SaslErrorKind::EmptyPassword);
    }

    #[test]
    fn test_failed_session_cannot_continue() {
        let (mut session, _) = start(&[SCRAM_SHA_256], false);
        server_first_err(&mut session, "garbage");
        assert!(session.is_failed());

        let err = session
            .continue_session("pencil", SERVER_FIRST.as_bytes(), None)
            .unwrap_err();
        assert_eq!(
            err.kind,
            SaslErrorKind::InvalidState {
                expected: "SASLInitialResponse",
                actual: "Failed",
            }
        );
        assert!(session.finalize(b"v=AAAA").is_err());
    }

    #[test]
    fn test_finalize_before_continue() {
        let (session, _) = start(&[SCRAM_SHA_256], false);
        let err = session.finalize(b"v=AAAA").unwrap_err();
        assert_eq!(
            err.kind,
            SaslErrorKind::InvalidState {
                expected: "SASLResponse",
                actual: "SASLInitialResponse",
            }
        );
    }

    #[test]
    fn test_plus_requires_certificate() {
        let (mut session, _) = start(&[SCRAM_SHA_256_PLUS], true);
        assert_eq!(
            server_first_err(&mut session, SERVER_FIRST),
            SaslErrorKind::MissingPeerCertificate
        );
    }

    #[test]
    fn test_plus_bad_certificate() {
        let (mut session, _) = start(&[SCRAM_SHA_256_PLUS], true);
        let err = session
            .continue_session("pencil", SERVER_FIRST.as_bytes(), Some(&[0x02, 0x00]))
            .unwrap_err();
        assert!(matches!(err.kind, SaslErrorKind::Certificate(_)));
    }
}
