//! Ed25519 request signature verification.
//!
//! The platform signs `timestamp || raw_body` and sends the hex signature in
//! `X-Signature-Ed25519` next to `X-Signature-Timestamp`.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::error::Result;

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    /// Validated hex public key. `None` means verification is disabled.
    public_key_hex: Option<String>,
}

impl SignatureVerifier {
    /// Rejects a malformed key at startup instead of failing every request.
    pub fn new(public_key_hex: &str) -> Result<Self> {
        parse_public_key(public_key_hex)?;
        Ok(Self {
            public_key_hex: Some(public_key_hex.trim().to_string()),
        })
    }

    pub fn disabled() -> Self {
        Self { public_key_hex: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.public_key_hex.is_some()
    }

    /// Missing headers count as a failed verification.
    pub fn verify(&self, timestamp: Option<&str>, body: &[u8], signature_hex: Option<&str>) -> bool {
        let Some(public_key_hex) = &self.public_key_hex else {
            return true;
        };
        let (Some(timestamp), Some(signature_hex)) = (timestamp, signature_hex) else {
            return false;
        };
        verify(timestamp, body, signature_hex, public_key_hex)
    }
}

fn parse_public_key(public_key_hex: &str) -> Result<VerifyingKey> {
    let bytes: [u8; 32] = hex::decode(public_key_hex.trim())?
        .try_into()
        .map_err(|_| crate::error::BotError::new("invalid_public_key").push_str("expected 32 bytes"))?;
    Ok(VerifyingKey::from_bytes(&bytes)?)
}

fn verify_with_key(key: &VerifyingKey, timestamp: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(sig_bytes) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };

    let mut message = Vec::with_capacity(timestamp.len() + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(body);

    key.verify(&message, &signature).is_ok()
}

/// One-shot check straight from hex inputs. Never fails loudly: any malformed
/// input is simply "not authentic".
pub fn verify(timestamp: &str, body: &[u8], signature_hex: &str, public_key_hex: &str) -> bool {
    match parse_public_key(public_key_hex) {
        Ok(key) => verify_with_key(&key, timestamp, body, signature_hex),
        Err(_) => false,
    }
}
