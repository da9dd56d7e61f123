//! Ed25519 verification of inbound webhook signatures.
//!
//! Discord signs every interaction delivery with the application's key pair.
//! The signed message is the `X-Signature-Timestamp` header concatenated with
//! the raw request body; a request that fails verification must be answered
//! with 401 or Discord disables the endpoint.

use ed25519_dalek::{Signature, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyError {
    #[error("invalid ed25519 public key: {0}")]
    InvalidPublicKey(String),
    #[error("malformed signature header")]
    MalformedSignature,
    #[error("signature verification failed")]
    Invalid,
}

/// Seam between the HTTP layer and the cryptography, so route tests can
/// substitute a permissive verifier.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> Result<(), VerifyError>;
}

pub struct Ed25519Verifier {
    key: VerifyingKey,
}

impl Ed25519Verifier {
    /// Builds a verifier from the hex-encoded public key shown in the Discord
    /// developer portal.
    pub fn from_hex(public_key_hex: &str) -> Result<Self, VerifyError> {
        let bytes = hex::decode(public_key_hex.trim())
            .map_err(|error| VerifyError::InvalidPublicKey(error.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| VerifyError::InvalidPublicKey("expected 32 bytes".to_owned()))?;
        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|error| VerifyError::InvalidPublicKey(error.to_string()))?;
        Ok(Self { key })
    }
}

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> Result<(), VerifyError> {
        let signature_bytes =
            hex::decode(signature_hex).map_err(|_| VerifyError::MalformedSignature)?;
        let signature_bytes: [u8; 64] =
            signature_bytes.try_into().map_err(|_| VerifyError::MalformedSignature)?;
        let signature = Signature::from_bytes(&signature_bytes);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify_strict(&message, &signature).map_err(|_| VerifyError::Invalid)
    }
}
