//! Session options.

use std::str::FromStr;

use crate::error::Error;

/// SCRAM channel binding policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelBinding {
    /// Never bind; the SASL engine is told the transport is not TLS
    Disable,
    /// Bind when the server offers SCRAM-SHA-256-PLUS over TLS
    #[default]
    Prefer,
    /// Fail authentication unless SCRAM-SHA-256-PLUS over TLS is used
    Require,
}

impl FromStr for ChannelBinding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disable" => Ok(ChannelBinding::Disable),
            "prefer" => Ok(ChannelBinding::Prefer),
            "require" => Ok(ChannelBinding::Require),
            _ => Err(Error::InvalidUsage(format!(
                "Invalid channel_binding: expected one of ['disable', 'prefer', 'require'], got {s}"
            ))),
        }
    }
}

/// Options for one protocol session.
#[derive(Debug, Clone)]
pub struct Opts {
    /// Username for authentication.
    ///
    /// Default: `""`
    pub user: String,

    /// Password for authentication.
    ///
    /// Default: `None`
    pub password: Option<String>,

    /// Database name to use.
    ///
    /// Default: `None`
    pub database: Option<String>,

    /// Application name to report to the server.
    ///
    /// Default: `None`
    pub application_name: Option<String>,

    /// Additional startup parameters, sent in order.
    ///
    /// Default: `[]`
    pub params: Vec<(String, String)>,

    /// SCRAM channel binding policy.
    ///
    /// Default: `ChannelBinding::Prefer`
    pub channel_binding: ChannelBinding,

    /// Initial capacity of the inbound frame buffer.
    ///
    /// Default: `8192`
    pub read_buffer_capacity: usize,

    /// Initial capacity of the outbound message buffer.
    ///
    /// Default: `256`
    pub write_buffer_capacity: usize,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            user: String::new(),
            password: None,
            database: None,
            application_name: None,
            params: Vec::new(),
            channel_binding: ChannelBinding::Prefer,
            read_buffer_capacity: 8192,
            write_buffer_capacity: crate::protocol::writer::DEFAULT_CAPACITY,
        }
    }
}

impl Opts {
    /// StartupMessage parameters in wire order.
    ///
    /// `client_encoding=UTF8` is always sent last; the decoders assume UTF-8.
    pub fn startup_params(&self) -> Vec<(&str, &str)> {
        let mut params = vec![("user", self.user.as_str())];
        if let Some(database) = &self.database {
            params.push(("database", database.as_str()));
        }
        if let Some(application_name) = &self.application_name {
            params.push(("application_name", application_name.as_str()));
        }
        params.extend(
            self.params
                .iter()
                .filter(|(name, _)| name != "client_encoding")
                .map(|(name, value)| (name.as_str(), value.as_str())),
        );
        params.push(("client_encoding", "UTF8"));
        params
    }
}
