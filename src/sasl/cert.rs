//! Signature algorithm extraction from a DER-encoded X.509 certificate.
//!
//! `tls-server-end-point` channel binding hashes the server certificate with
//! the hash of its signature algorithm. Only the few DER elements on the path
//! to `Certificate.signatureAlgorithm` are walked:
//!
//! ```text
//! Certificate ::= SEQUENCE {
//!     tbsCertificate       TBSCertificate,        -- skipped
//!     signatureAlgorithm   AlgorithmIdentifier,   -- SEQUENCE { OID, params }
//!     signatureValue       BIT STRING }
//! ```

use crate::error::CertificateError;

use super::crypto::{CryptoProvider, HashAlgorithm};

const TAG_SEQUENCE: u8 = 0x30;
const TAG_OID: u8 = 0x06;
const TAG_CONTEXT_0: u8 = 0xa0;

/// Bounds-checked reader over DER bytes.
struct Der<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Der<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn byte(&mut self) -> Result<u8, CertificateError> {
        let b = *self
            .data
            .get(self.pos)
            .ok_or_else(|| CertificateError::new("truncated data"))?;
        self.pos += 1;
        Ok(b)
    }

    fn expect(&mut self, tag: u8, what: &str) -> Result<usize, CertificateError> {
        if self.byte()? != tag {
            return Err(CertificateError::new(what));
        }
        self.length()
    }

    fn length(&mut self) -> Result<usize, CertificateError> {
        let first = self.byte()?;
        if first < 0x80 {
            return Ok(first as usize);
        }

        let num_bytes = first & 0x7f;
        if num_bytes == 0 || num_bytes > 4 {
            return Err(CertificateError::new("bad length"));
        }
        let mut length = 0usize;
        for _ in 0..num_bytes {
            length = (length << 8) | self.byte()? as usize;
        }
        Ok(length)
    }

    fn skip(&mut self, len: usize) -> Result<(), CertificateError> {
        match self.pos.checked_add(len) {
            Some(end) if end <= self.data.len() => {
                self.pos = end;
                Ok(())
            }
            _ => Err(CertificateError::new("truncated data")),
        }
    }

    /// Read an OBJECT IDENTIFIER in dotted form.
    fn oid(&mut self) -> Result<String, CertificateError> {
        let len = self.expect(TAG_OID, "non-OID data")?;
        let start = self.pos;
        self.skip(len)?;
        let bytes = &self.data[start..self.pos];

        let Some((&first, rest)) = bytes.split_first() else {
            return Err(CertificateError::new("empty OID"));
        };
        let mut oid = format!("{}.{}", first / 40, first % 40);

        let mut value: u64 = 0;
        for &b in rest {
            if value > u64::MAX >> 7 {
                return Err(CertificateError::new("OID component overflow"));
            }
            value = (value << 7) | u64::from(b & 0x7f);
            if b < 0x80 {
                oid.push('.');
                oid.push_str(&value.to_string());
                value = 0;
            }
        }
        Ok(oid)
    }
}

/// Hash algorithm of the certificate's signature algorithm.
pub fn signature_hash_algorithm(der: &[u8]) -> Result<HashAlgorithm, CertificateError> {
    let mut r = Der::new(der);

    r.expect(TAG_SEQUENCE, "non-sequence data")?;
    let tbs_len = r.expect(TAG_SEQUENCE, "non-sequence data")?;
    r.skip(tbs_len)?;
    r.expect(TAG_SEQUENCE, "non-sequence data")?;

    let oid = r.oid()?;
    let hash = match oid.as_str() {
        // RSA PKCS#1 v1.5
        "1.2.840.113549.1.1.4" => HashAlgorithm::Md5,
        "1.2.840.113549.1.1.5" => HashAlgorithm::Sha1,
        "1.2.840.113549.1.1.11" => HashAlgorithm::Sha256,
        "1.2.840.113549.1.1.12" => HashAlgorithm::Sha384,
        "1.2.840.113549.1.1.13" => HashAlgorithm::Sha512,
        "1.2.840.113549.1.1.14" => HashAlgorithm::Sha224,
        "1.2.840.113549.1.1.15" => HashAlgorithm::Sha512_224,
        "1.2.840.113549.1.1.16" => HashAlgorithm::Sha512_256,
        // ECDSA
        "1.2.840.10045.4.1" => HashAlgorithm::Sha1,
        "1.2.840.10045.4.3.1" => HashAlgorithm::Sha224,
        "1.2.840.10045.4.3.2" => HashAlgorithm::Sha256,
        "1.2.840.10045.4.3.3" => HashAlgorithm::Sha384,
        "1.2.840.10045.4.3.4" => HashAlgorithm::Sha512,
        // RSASSA-PSS
        "1.2.840.113549.1.1.10" => pss_hash_algorithm(&mut r)?,
        // Ed25519
        "1.3.101.110" | "1.3.101.112" => HashAlgorithm::Sha512,
        // Ed448
        "1.3.101.111" | "1.3.101.113" => {
            return Err(CertificateError::new(
                "Ed448 certificate channel binding is not currently supported by Postgres",
            ));
        }
        _ => return Err(CertificateError::new(format!("unknown OID {oid}"))),
    };
    Ok(hash)
}

/// RSASSA-PSS-params ::= SEQUENCE { hashAlgorithm [0] AlgorithmIdentifier, ... }
fn pss_hash_algorithm(r: &mut Der<'_>) -> Result<HashAlgorithm, CertificateError> {
    r.expect(TAG_SEQUENCE, "non-sequence data")?;
    r.expect(TAG_CONTEXT_0, "non-tag data")?;
    r.expect(TAG_SEQUENCE, "non-sequence data")?;

    let oid = r.oid()?;
    match oid.as_str() {
        "1.2.840.113549.2.5" => Ok(HashAlgorithm::Md5),
        "1.3.14.3.2.26" => Ok(HashAlgorithm::Sha1),
        "2.16.840.1.101.3.4.2.1" => Ok(HashAlgorithm::Sha256),
        "2.16.840.1.101.3.4.2.2" => Ok(HashAlgorithm::Sha384),
        "2.16.840.1.101.3.4.2.3" => Ok(HashAlgorithm::Sha512),
        _ => Err(CertificateError::new(format!("unknown hash OID {oid}"))),
    }
}

/// `tls-server-end-point` channel binding data: the certificate hashed with
/// its signature hash algorithm, SHA-256 for MD5/SHA-1.
pub fn tls_server_end_point(
    der: &[u8],
    crypto: &dyn CryptoProvider,
) -> Result<Vec<u8>, CertificateError> {
    let signature_hash = signature_hash_algorithm(der)?;
    let hash = signature_hash.for_channel_binding();
    if hash != signature_hash {
        tracing::warn!(
            "Certificate is signed with {}, hashing with {} for channel binding",
            signature_hash,
            hash
        );
    }
    Ok(crypto.digest(hash, der))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sasl::crypto::RustCrypto;

    fn tlv(tag: u8, content: &[u8]) -> Vec<u8> {
        let mut out = vec![tag];
        let len = content.len();
        if len < 0x80 {
            out.push(len as u8);
        } else if len <= 0xff {
            out.extend_from_slice(&[0x81, len as u8]);
        } else {
            out.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]);
        }
        out.extend_from_slice(content);
        out
    }

    fn oid(dotted: &str) -> Vec<u8> {
        let arcs: Vec<u64> = dotted.split('.').map(|a| a.parse().unwrap()).collect();
        let mut content = vec![(arcs[0] * 40 + arcs[1]) as u8];
        for &arc in &arcs[2..] {
            let mut groups = vec![(arc & 0x7f) as u8];
            let mut rest = arc >> 7;
            while rest > 0 {
                groups.push((rest & 0x7f) as u8 | 0x80);
                rest >>= 7;
            }
            groups.reverse();
            content.extend_from_slice(&groups);
        }
        tlv(TAG_OID, &content)
    }

    fn certificate(signature_algorithm: &[u8], tbs_len: usize) -> Vec<u8> {
        let tbs = tlv(TAG_SEQUENCE, &vec![0x02; tbs_len]);
        let signature = tlv(0x03, &[0, 1, 2, 3]);
        tlv(
            TAG_SEQUENCE,
            &[tbs, tlv(TAG_SEQUENCE, signature_algorithm), signature].concat(),
        )
    }

    fn with_oid(dotted: &str) -> Vec<u8> {
        certificate(&[oid(dotted), vec![0x05, 0x00]].concat(), 40)
    }

    #[test]
    fn test_oid_encoding_matches_der() {
        // sha256WithRSAEncryption as it appears in real certificates
        assert_eq!(
            oid("1.2.840.113549.1.1.11"),
            [0x06, 0x09, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x01, 0x0b]
        );
    }

    #[test]
    fn test_rsa_and_ecdsa() {
        let cases = [
            ("1.2.840.113549.1.1.4", HashAlgorithm::Md5),
            ("1.2.840.113549.1.1.5", HashAlgorithm::Sha1),
            ("1.2.840.113549.1.1.11", HashAlgorithm::Sha256),
            ("1.2.840.113549.1.1.12", HashAlgorithm::Sha384),
            ("1.2.840.113549.1.1.13", HashAlgorithm::Sha512),
            ("1.2.840.113549.1.1.14", HashAlgorithm::Sha224),
            ("1.2.840.113549.1.1.15", HashAlgorithm::Sha512_224),
            ("1.2.840.113549.1.1.16", HashAlgorithm::Sha512_256),
            ("1.2.840.10045.4.1", HashAlgorithm::Sha1),
            ("1.2.840.10045.4.3.1", HashAlgorithm::Sha224),
            ("1.2.840.10045.4.3.2", HashAlgorithm::Sha256),
            ("1.2.840.10045.4.3.3", HashAlgorithm::Sha384),
            ("1.2.840.10045.4.3.4", HashAlgorithm::Sha512),
            ("1.3.101.110", HashAlgorithm::Sha512),
            ("1.3.101.112", HashAlgorithm::Sha512),
        ];
        for (dotted, expected) in cases {
            assert_eq!(
                signature_hash_algorithm(&with_oid(dotted)),
                Ok(expected),
                "{dotted}"
            );
        }
    }

    #[test]
    fn test_long_form_tbs_length() {
        // 300-byte TBS needs a two-byte length
        let der = certificate(&oid("1.2.840.10045.4.3.3"), 300);
        assert_eq!(signature_hash_algorithm(&der), Ok(HashAlgorithm::Sha384));
    }

    #[test]
    fn test_rsassa_pss() {
        let params = tlv(
            TAG_SEQUENCE,
            &tlv(
                TAG_CONTEXT_0,
                &tlv(
                    TAG_SEQUENCE,
                    &[oid("2.16.840.1.101.3.4.2.2"), vec![0x05, 0x00]].concat(),
                ),
            ),
        );
        let der = certificate(&[oid("1.2.840.113549.1.1.10"), params].concat(), 10);
        assert_eq!(signature_hash_algorithm(&der), Ok(HashAlgorithm::Sha384));

        let params = tlv(
            TAG_SEQUENCE,
            &tlv(TAG_CONTEXT_0, &tlv(TAG_SEQUENCE, &oid("1.2.3.4"))),
        );
        let der = certificate(&[oid("1.2.840.113549.1.1.10"), params].concat(), 10);
        let err = signature_hash_algorithm(&der).unwrap_err();
        assert_eq!(err.reason, "unknown hash OID 1.2.3.4");
    }

    #[test]
    fn test_rsassa_pss_missing_tag() {
        let params = tlv(TAG_SEQUENCE, &tlv(TAG_SEQUENCE, &oid("2.16.840.1.101.3.4.2.1")));
        let der = certificate(&[oid("1.2.840.113549.1.1.10"), params].concat(), 10);
        assert_eq!(signature_hash_algorithm(&der).unwrap_err().reason, "non-tag data");
    }

    #[test]
    fn test_ed448_unsupported() {
        let err = signature_hash_algorithm(&with_oid("1.3.101.113")).unwrap_err();
        assert!(err.reason.contains("Ed448"));
        assert!(err.to_string().starts_with("SASL channel binding: Ed448"));
    }

    #[test]
    fn test_unknown_oid() {
        let err = signature_hash_algorithm(&with_oid("1.2.3.4.5")).unwrap_err();
        assert_eq!(err.reason, "unknown OID 1.2.3.4.5");
    }

    #[test]
    fn test_malformed() {
        assert_eq!(
            signature_hash_algorithm(&[]).unwrap_err().reason,
            "truncated data"
        );
        assert_eq!(
            signature_hash_algorithm(&[0x02, 0x01, 0x00]).unwrap_err().reason,
            "non-sequence data"
        );
        assert_eq!(
            signature_hash_algorithm(&[0x30, 0x85, 1, 2, 3, 4, 5]).unwrap_err().reason,
            "bad length"
        );

        // TBS length runs past the end
        let mut der = with_oid("1.2.840.113549.1.1.11");
        der.truncate(20);
        assert_eq!(signature_hash_algorithm(&der).unwrap_err().reason, "truncated data");

        // Algorithm identifier without an OID
        let der = certificate(&[0x05, 0x00], 4);
        assert_eq!(signature_hash_algorithm(&der).unwrap_err().reason, "non-OID data");
    }

    #[test]
    fn test_end_point_substitutes_weak_hash() {
        let der = with_oid("1.2.840.113549.1.1.5");
        let data = tls_server_end_point(&der, &RustCrypto).unwrap();
        assert_eq!(data, RustCrypto.digest(HashAlgorithm::Sha256, &der));

        let der = with_oid("1.2.840.113549.1.1.12");
        let data = tls_server_end_point(&der, &RustCrypto).unwrap();
        assert_eq!(data.len(), 48);
    }
}
