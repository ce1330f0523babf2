//! Authentication exchange driver.
//!
//! [`Authenticator`] turns the server's Authentication messages into the
//! client's responses. It performs no I/O: feed it each decoded message and
//! write out whatever bytes it returns.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, Result, SaslError, SaslErrorKind, SaslPhase};
use crate::opts::{ChannelBinding, Opts};
use crate::protocol::backend::{Authentication, BackendMessage};
use crate::protocol::frontend::{
    md5_password, write_password, write_sasl_initial_response, write_sasl_response,
};
use crate::protocol::writer::Writer;
use crate::sasl::{CryptoProvider, Mechanism, RustCrypto, SCRAM_SHA_256_PLUS, SaslSession};

/// Transport the session runs on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Channel {
    /// Unencrypted connection
    #[default]
    Plain,
    /// TLS connection with the server's DER certificate, if known
    Tls { peer_certificate: Option<Vec<u8>> },
}

impl Channel {
    /// Returns true for a TLS transport.
    pub fn is_tls(&self) -> bool {
        matches!(self, Channel::Tls { .. })
    }

    /// Server certificate in DER form.
    pub fn peer_certificate(&self) -> Option<&[u8]> {
        match self {
            Channel::Plain => None,
            Channel::Tls { peer_certificate } => peer_certificate.as_deref(),
        }
    }
}

/// Authentication progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Waiting for the server's authentication request
    WaitingAuth,
    /// SCRAM exchange in progress
    SaslInProgress,
    /// Credentials sent, waiting for AuthenticationOk
    WaitingAuthResult,
    /// AuthenticationOk received
    Done,
    /// A step failed
    Failed,
}

/// What the caller has to do after feeding a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Write these bytes, then read the next message
    Send(Bytes),
    /// Read the next message
    Wait,
    /// Authentication succeeded
    Done,
}

/// Client side of the authentication exchange.
pub struct Authenticator {
    state: AuthState,
    user: String,
    password: Option<String>,
    channel_binding: ChannelBinding,
    channel: Channel,
    mechanism: Option<Mechanism>,
    sasl: Option<SaslSession>,
    crypto: Arc<dyn CryptoProvider>,
    writer: Writer,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("state", &self.state)
            .field("user", &self.user)
            .field("channel_binding", &self.channel_binding)
            .field("tls", &self.channel.is_tls())
            .field("mechanism", &self.mechanism)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    /// Create an authenticator for the given options and transport.
    pub fn new(opts: &Opts, channel: Channel) -> Self {
        Self {
            state: AuthState::WaitingAuth,
            user: opts.user.clone(),
            password: opts.password.clone(),
            channel_binding: opts.channel_binding,
            channel,
            mechanism: None,
            sasl: None,
            crypto: Arc::new(RustCrypto),
            writer: Writer::with_capacity(opts.write_buffer_capacity),
        }
    }

    /// Use a custom [`CryptoProvider`] for SCRAM.
    pub fn with_crypto_provider(mut self, crypto: Arc<dyn CryptoProvider>) -> Self {
        self.crypto = crypto;
        self
    }

    /// Get the current state.
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// SASL mechanism in use, once selected.
    pub fn mechanism(&self) -> Option<Mechanism> {
        self.mechanism
    }

    /// Returns true once AuthenticationOk was received.
    pub fn is_done(&self) -> bool {
        self.state == AuthState::Done
    }

    /// Feed a backend message received during authentication.
    ///
    /// ErrorResponse becomes [`Error::Server`]; any other non-Authentication
    /// message is rejected.
    pub fn handle_message(&mut self, message: &BackendMessage) -> Result<AuthStep> {
        match message {
            BackendMessage::Authentication(auth) => self.handle(auth),
            BackendMessage::ErrorResponse(fields) => {
                self.state = AuthState::Failed;
                Err(Error::Server(fields.clone()))
            }
            _ => {
                self.state = AuthState::Failed;
                Err(Error::Auth(format!(
                    "Expected Authentication message, got {message:?}"
                )))
            }
        }
    }

    /// Feed an Authentication message.
    pub fn handle(&mut self, auth: &Authentication) -> Result<AuthStep> {
        if matches!(self.state, AuthState::Done | AuthState::Failed) {
            return Err(Error::InvalidUsage(format!(
                "Authentication already finished (state {:?})",
                self.state
            )));
        }

        let result = match self.state {
            AuthState::WaitingAuth => self.handle_auth_request(auth),
            AuthState::SaslInProgress => self.handle_sasl_message(auth),
            _ => self.handle_auth_result(auth),
        };
        if result.is_err() {
            self.state = AuthState::Failed;
            self.sasl = None;
        }
        result
    }

    fn password(&self) -> Result<&str> {
        self.password
            .as_deref()
            .ok_or_else(|| Error::Auth("Password required but not provided".into()))
    }

    fn require_channel_binding(&self) -> Result<()> {
        if self.channel_binding == ChannelBinding::Require {
            return Err(Error::Auth(
                "Channel binding required, but server authenticated client without channel binding"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Whether the SASL engine may treat the transport as TLS.
    ///
    /// Under `Prefer` without a peer certificate PLUS cannot be completed. If
    /// the server offered PLUS, gs2 `y` would make it report a downgrade, so
    /// the exchange proceeds as if the transport were plain (gs2 `n`).
    fn advertise_tls(&self, mechanisms: &[String]) -> bool {
        match self.channel_binding {
            ChannelBinding::Disable => false,
            ChannelBinding::Require => self.channel.is_tls(),
            ChannelBinding::Prefer => {
                self.channel.is_tls()
                    && (self.channel.peer_certificate().is_some()
                        || !mechanisms.iter().any(|m| m == SCRAM_SHA_256_PLUS))
            }
        }
    }

    fn handle_auth_request(&mut self, auth: &Authentication) -> Result<AuthStep> {
        match auth {
            Authentication::Ok => {
                self.require_channel_binding()?;
                self.state = AuthState::Done;
                Ok(AuthStep::Done)
            }
            Authentication::CleartextPassword => {
                self.require_channel_binding()?;
                tracing::debug!("Authenticating with cleartext password");
                let password = self.password()?.to_string();
                write_password(&mut self.writer, &password);
                self.state = AuthState::WaitingAuthResult;
                Ok(AuthStep::Send(self.writer.flush()))
            }
            Authentication::Md5Password { salt } => {
                self.require_channel_binding()?;
                tracing::debug!("Authenticating with MD5 password");
                let hashed = md5_password(&self.user, self.password()?, salt);
                write_password(&mut self.writer, &hashed);
                self.state = AuthState::WaitingAuthResult;
                Ok(AuthStep::Send(self.writer.flush()))
            }
            Authentication::Sasl { mechanisms } => {
                self.password()?;
                let tls = self.advertise_tls(mechanisms);
                let (session, client_first) = SaslSession::start_with_provider(
                    mechanisms.as_slice(),
                    tls,
                    Arc::clone(&self.crypto),
                )?;

                if self.channel_binding == ChannelBinding::Require
                    && session.mechanism() != Mechanism::ScramSha256Plus
                {
                    return Err(SaslError::new(
                        SaslPhase::Start,
                        SaslErrorKind::ChannelBindingRequired,
                    )
                    .into());
                }

                tracing::debug!("Authenticating with {}", session.mechanism().name());
                write_sasl_initial_response(
                    &mut self.writer,
                    session.mechanism().name(),
                    client_first.as_bytes(),
                );
                self.mechanism = Some(session.mechanism());
                self.sasl = Some(session);
                self.state = AuthState::SaslInProgress;
                Ok(AuthStep::Send(self.writer.flush()))
            }
            Authentication::KerberosV5
            | Authentication::Gss
            | Authentication::GssContinue { .. }
            | Authentication::Sspi => Err(Error::Unsupported(format!(
                "Unsupported authentication method: {}",
                method_name(auth)
            ))),
            Authentication::SaslContinue { .. } | Authentication::SaslFinal { .. } => Err(
                Error::Auth(format!("Unexpected {} before SASL start", method_name(auth))),
            ),
        }
    }

    fn handle_sasl_message(&mut self, auth: &Authentication) -> Result<AuthStep> {
        match auth {
            Authentication::SaslContinue { data } => {
                let password = self.password()?.to_string();
                let session = self
                    .sasl
                    .as_mut()
                    .ok_or_else(|| Error::Auth("SASL session not initialized".into()))?;
                let client_final =
                    session.continue_session(&password, data, self.channel.peer_certificate())?;
                write_sasl_response(&mut self.writer, client_final.as_bytes());
                Ok(AuthStep::Send(self.writer.flush()))
            }
            Authentication::SaslFinal { data } => {
                let session = self
                    .sasl
                    .take()
                    .ok_or_else(|| Error::Auth("SASL session not initialized".into()))?;
                session.finalize(data)?;
                self.state = AuthState::WaitingAuthResult;
                Ok(AuthStep::Wait)
            }
            Authentication::Ok => Err(Error::Auth(
                "Server completed SASL authentication without proving its identity".into(),
            )),
            _ => Err(Error::Auth(format!(
                "Unexpected {} during SASL exchange",
                method_name(auth)
            ))),
        }
    }

    fn handle_auth_result(&mut self, auth: &Authentication) -> Result<AuthStep> {
        match auth {
            Authentication::Ok => {
                self.state = AuthState::Done;
                Ok(AuthStep::Done)
            }
            _ => Err(Error::Auth(format!(
                "Unexpected auth result: {}",
                method_name(auth)
            ))),
        }
    }
}

fn method_name(auth: &Authentication) -> &'static str {
    match auth {
        Authentication::Ok => "AuthenticationOk",
        Authentication::KerberosV5 => "AuthenticationKerberosV5",
        Authentication::CleartextPassword => "AuthenticationCleartextPassword",
        Authentication::Md5Password { .. } => "AuthenticationMD5Password",
        Authentication::Gss => "AuthenticationGSS",
        Authentication::GssContinue { .. } => "AuthenticationGSSContinue",
        Authentication::Sspi => "AuthenticationSSPI",
        Authentication::Sasl { .. } => "AuthenticationSASL",
        Authentication::SaslContinue { .. } => "AuthenticationSASLContinue",
        Authentication::SaslFinal { .. } => "AuthenticationSASLFinal",
    }
}
