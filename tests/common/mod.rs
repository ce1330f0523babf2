//! SCRAM-SHA-256(-PLUS) server side for exchange tests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

pub const PASSWORD: &str = "pencil";

fn hmac(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key).unwrap();
    mac.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

fn attribute<'a>(message: &'a str, key: char) -> Option<&'a str> {
    message.split(',').find_map(|part| {
        let (k, value) = part.split_once('=')?;
        (k.len() == 1 && k.starts_with(key)).then_some(value)
    })
}

/// Server side of one SCRAM-SHA-256(-PLUS) exchange.
pub struct ScramServer {
    salt: Vec<u8>,
    iterations: u32,
    stored_key: [u8; 32],
    server_key: [u8; 32],
    /// Expected channel binding data following the gs2 header
    pub binding_data: Vec<u8>,
    /// Gs2 header the client sent
    pub gs2_header: String,
    client_first_bare: String,
    server_first: String,
    nonce: String,
}

impl ScramServer {
    pub fn new(password: &str) -> Self {
        let salt = b"0123456789abcdef".to_vec();
        let iterations = 4096;
        let salted = pbkdf2::pbkdf2_hmac_array::<Sha256, 32>(password.as_bytes(), &salt, iterations);
        let client_key = hmac(&salted, b"Client Key");
        let mut stored_key = [0u8; 32];
        stored_key.copy_from_slice(&Sha256::digest(client_key));
        Self {
            salt,
            iterations,
            stored_key,
            server_key: hmac(&salted, b"Server Key"),
            binding_data: Vec::new(),
            gs2_header: String::new(),
            client_first_bare: String::new(),
            server_first: String::new(),
            nonce: String::new(),
        }
    }

    /// Consume client-first-message, produce server-first-message.
    pub fn server_first(&mut self, client_first: &[u8]) -> String {
        let client_first = std::str::from_utf8(client_first).unwrap();
        let (gs2_header, bare) = client_first.split_once(",,").unwrap();
        let client_nonce = attribute(bare, 'r').unwrap();

        self.gs2_header = gs2_header.to_string();
        self.client_first_bare = bare.to_string();
        self.nonce = format!("{client_nonce}3rfcNHYJY1ZVvWVs7j");
        self.server_first = format!(
            "r={},s={},i={}",
            self.nonce,
            STANDARD.encode(&self.salt),
            self.iterations
        );
        self.server_first.clone()
    }

    /// Verify client-final-message, produce server-final-message.
    pub fn server_final(&self, client_final: &[u8]) -> Result<String, &'static str> {
        let client_final = std::str::from_utf8(client_final).unwrap();
        let (without_proof, proof) = client_final
            .rsplit_once(",p=")
            .ok_or("missing proof")?;

        let binding = attribute(without_proof, 'c').ok_or("missing channel binding")?;
        let binding = STANDARD.decode(binding).map_err(|_| "binding is not base64")?;
        let mut expected_binding = format!("{},,", self.gs2_header).into_bytes();
        if self.gs2_header.starts_with("p=") {
            expected_binding.extend_from_slice(&self.binding_data);
        }
        if binding != expected_binding {
            return Err("channel binding mismatch");
        }
        if attribute(without_proof, 'r') != Some(self.nonce.as_str()) {
            return Err("nonce mismatch");
        }

        let auth_message = format!(
            "{},{},{}",
            self.client_first_bare, self.server_first, without_proof
        );
        let proof = STANDARD.decode(proof).map_err(|_| "proof is not base64")?;
        if proof.len() != 32 {
            return Err("proof has invalid length");
        }
        let client_signature = hmac(&self.stored_key, auth_message.as_bytes());
        let client_key: Vec<u8> = proof
            .iter()
            .zip(client_signature.iter())
            .map(|(a, b)| a ^ b)
            .collect();
        if Sha256::digest(&client_key).as_slice() != self.stored_key {
            return Err("proof verification failed");
        }

        let signature = hmac(&self.server_key, auth_message.as_bytes());
        Ok(format!("v={}", STANDARD.encode(signature)))
    }
}
