//! SASL authentication: SCRAM-SHA-256 and SCRAM-SHA-256-PLUS.
//!
//! The engine produces and consumes SASL message *bodies*; framing them as
//! SASLInitialResponse / SASLResponse is done by [`crate::auth::Authenticator`]
//! or by the caller through [`crate::protocol::frontend`].

mod attributes;
pub mod cert;
pub mod crypto;
mod session;

pub use cert::{signature_hash_algorithm, tls_server_end_point};
pub use crypto::{CryptoError, CryptoProvider, HashAlgorithm, RustCrypto};
pub use session::{Mechanism, SCRAM_SHA_256, SCRAM_SHA_256_PLUS, SaslResult, SaslSession};
