//! Cryptographic primitives used by the SCRAM exchange.
//!
//! [`SaslSession`](super::SaslSession) never calls a hash or RNG directly; it
//! goes through a [`CryptoProvider`]. [`RustCrypto`] is the default provider.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512, Sha512_224, Sha512_256};

/// Hash algorithm named by a certificate signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Sha512_224,
    Sha512_256,
}

impl HashAlgorithm {
    /// Conventional name (e.g. "SHA-256").
    pub fn name(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "MD5",
            HashAlgorithm::Sha1 => "SHA-1",
            HashAlgorithm::Sha224 => "SHA-224",
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha384 => "SHA-384",
            HashAlgorithm::Sha512 => "SHA-512",
            HashAlgorithm::Sha512_224 => "SHA512-224",
            HashAlgorithm::Sha512_256 => "SHA512-256",
        }
    }

    /// MD5 and SHA-1 are too weak to bind a channel on.
    pub fn is_weak(self) -> bool {
        matches!(self, HashAlgorithm::Md5 | HashAlgorithm::Sha1)
    }

    /// Algorithm used for `tls-server-end-point` channel binding.
    ///
    /// Weak algorithms are replaced by SHA-256 (RFC 5929 section 4.1).
    pub fn for_channel_binding(self) -> Self {
        if self.is_weak() {
            HashAlgorithm::Sha256
        } else {
            self
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure inside a [`CryptoProvider`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct CryptoError(pub String);

impl From<CryptoError> for crate::error::SaslErrorKind {
    fn from(err: CryptoError) -> Self {
        crate::error::SaslErrorKind::Crypto(err.0)
    }
}

/// Primitive set required by SCRAM-SHA-256(-PLUS).
pub trait CryptoProvider: Send + Sync {
    /// Fill `buf` with cryptographically secure random bytes.
    fn random_bytes(&self, buf: &mut [u8]);

    /// SHA-256 digest.
    fn sha256(&self, data: &[u8]) -> [u8; 32];

    /// HMAC-SHA-256.
    fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> Result<[u8; 32], CryptoError>;

    /// PBKDF2-HMAC-SHA-256 with a 32-byte output.
    fn pbkdf2_sha256(&self, password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32];

    /// Digest with an arbitrary supported algorithm.
    fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8>;
}

/// [`CryptoProvider`] backed by the RustCrypto crates and `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustCrypto;

impl CryptoProvider for RustCrypto {
    fn random_bytes(&self, buf: &mut [u8]) {
        use rand::Rng;
        rand::rng().fill(buf);
    }

    fn sha256(&self, data: &[u8]) -> [u8; 32] {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(data));
        out
    }

    fn hmac_sha256(&self, key: &[u8], data: &[u8]) -> Result<[u8; 32], CryptoError> {
        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
            .map_err(|e| CryptoError(format!("HMAC error: {e}")))?;
        mac.update(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(&mac.finalize().into_bytes());
        Ok(out)
    }

    fn pbkdf2_sha256(&self, password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
        pbkdf2::pbkdf2_hmac_array::<Sha256, 32>(password, salt, iterations)
    }

    fn digest(&self, algorithm: HashAlgorithm, data: &[u8]) -> Vec<u8> {
        match algorithm {
            HashAlgorithm::Md5 => md5::Md5::digest(data).to_vec(),
            HashAlgorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
            HashAlgorithm::Sha224 => Sha224::digest(data).to_vec(),
            HashAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha384 => Sha384::digest(data).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
            HashAlgorithm::Sha512_224 => Sha512_224::digest(data).to_vec(),
            HashAlgorithm::Sha512_256 => Sha512_256::digest(data).to_vec(),
        }
    }
}
