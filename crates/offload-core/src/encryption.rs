//! Encryption service for stored provider credentials (S3 secret key, GCS service account JSON)

use crate::AppError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use std::env;

/// Placeholder rendered instead of a secret value.
pub const MASKED_SECRET: &str = "********";

/// Encryption service for credentials at rest.
/// Uses AES-256-GCM for authenticated encryption
#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").finish_non_exhaustive()
    }
}

impl EncryptionService {
    /// Create a new encryption service from raw 32-byte key (e.g. for tests; avoids env mutation).
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, AppError> {
        if key_bytes.len() != 32 {
            return Err(AppError::Configuration(
                "Encryption key must be 32 bytes (256 bits)".to_string(),
            ));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Create from a base64-encoded 32-byte key.
    pub fn from_base64_key(key_str: &str) -> Result<Self, AppError> {
        let key_bytes = general_purpose::STANDARD
            .decode(key_str.trim())
            .map_err(|e| {
                AppError::Configuration(format!("Failed to decode encryption key: {}", e))
            })?;

        Self::from_key_bytes(&key_bytes)
    }

    /// Create from the `ENCRYPTION_KEY` environment variable, if set.
    ///
    /// Returns `Ok(None)` when the variable is absent so plaintext deployments keep working.
    pub fn from_env() -> Result<Option<Self>, AppError> {
        match env::var("ENCRYPTION_KEY") {
            Ok(key_str) if !key_str.trim().is_empty() => Self::from_base64_key(&key_str).map(Some),
            _ => Ok(None),
        }
    }

    /// Encrypt a plaintext string
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Internal(format!("Encryption failed: {}", e)))?;

        // nonce || ciphertext, base64 encoded
        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(&combined))
    }

    /// Decrypt an encrypted string
    pub fn decrypt(&self, encrypted: &str) -> Result<String, AppError> {
        let combined = general_purpose::STANDARD
            .decode(encrypted.trim())
            .map_err(|e| AppError::Internal(format!("Failed to decode encrypted data: {}", e)))?;

        if combined.len() < 12 {
            return Err(AppError::Internal("Encrypted data too short".to_string()));
        }

        let nonce = Nonce::from_slice(&combined[..12]);
        let ciphertext = &combined[12..];

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| AppError::Internal(format!("Decryption failed: {}", e)))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::Internal(format!("Invalid UTF-8 in decrypted data: {}", e)))
    }
}

/// Resolve a stored secret to its plaintext.
///
/// When a cipher is available the value is decrypted; a value that does not decrypt is
/// assumed to be stored in plaintext and returned as-is.
pub fn resolve_secret(cipher: Option<&EncryptionService>, raw: &str) -> String {
    match cipher {
        Some(cipher) => match cipher.decrypt(raw) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                tracing::debug!(error = %e, "Secret is not encrypted, using stored value");
                raw.to_string()
            }
        },
        None => raw.to_string(),
    }
}

/// Mask an optional secret for display.
pub fn mask_secret(secret: Option<&str>) -> Option<String> {
    secret
        .filter(|s| !s.trim().is_empty())
        .map(|_| MASKED_SECRET.to_string())
}
