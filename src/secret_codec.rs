//! AES-256-GCM encryption for gateway credentials at rest.

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::error::{ReconcileError, ReconcileResult};

const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct SecretCodec {
    key: [u8; 32],
}

impl SecretCodec {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Build a codec from a 64 character hex key.
    pub fn from_hex(encoded_key: &str) -> ReconcileResult<Self> {
        let bytes = hex::decode(encoded_key.trim())
            .map_err(|e| ReconcileError::Crypto(format!("encryption key is not hex: {e}")))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ReconcileError::Crypto("encryption key must be 32 bytes".into()))?;
        Ok(Self::new(key))
    }

    /// Returns `hex(nonce || ciphertext || tag)`.
    pub fn encrypt(&self, plaintext: &str) -> ReconcileResult<String> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| ReconcileError::Crypto(format!("AES-GCM encrypt: {e}")))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(hex::encode(combined))
    }

    pub fn decrypt(&self, encoded: &str) -> ReconcileResult<String> {
        let combined = hex::decode(encoded)
            .map_err(|e| ReconcileError::Crypto(format!("hex decode: {e}")))?;

        if combined.len() <= NONCE_LEN {
            return Err(ReconcileError::Crypto("ciphertext too short".into()));
        }

        let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|e| ReconcileError::Crypto(format!("AES-GCM decrypt: {e}")))?;

        String::from_utf8(plaintext)
            .map_err(|_| ReconcileError::Crypto("decrypted secret is not UTF-8".into()))
    }
}

impl std::fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCodec")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
