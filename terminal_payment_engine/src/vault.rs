//! The credential vault.
//!
//! Two unrelated credential concerns live here:
//! * provider access tokens, which must be recoverable, are encrypted at rest with
//!   ChaCha20-Poly1305 under a process-wide key;
//! * device API keys, which must never be recoverable, are hashed with argon2id and a
//!   per-call random salt.
//!
//! A missing or malformed vault key is a configuration error and the process must refuse to
//! start rather than run with weak or absent encryption.
use std::fmt::Debug;

use argon2::{
    password_hash::{rand_core::OsRng as SaltRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305,
    Key,
    Nonce,
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tps_common::Secret;

/// Environment variable holding the 64-hex-character (32 byte) vault key.
pub const VAULT_KEY_ENV: &str = "TPS_VAULT_KEY";

const NONCE_SIZE: usize = 12;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Invalid vault configuration. {0}")]
    Config(String),
    #[error("Could not encrypt token")]
    Encryption,
    #[error("Could not decrypt token. The ciphertext is malformed or has been tampered with")]
    Decryption,
    #[error("Could not hash API key. {0}")]
    Hashing(String),
}

/// Symmetric encryption of provider access tokens, keyed by a process-wide secret.
#[derive(Clone)]
pub struct Vault {
    cipher: ChaCha20Poly1305,
}

impl Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Vault(****)")
    }
}

impl Vault {
    /// Creates a vault from a 64-hex-character key.
    pub fn new(key: &Secret<String>) -> Result<Self, VaultError> {
        let bytes = from_hex(key.reveal())
            .ok_or_else(|| VaultError::Config(format!("{VAULT_KEY_ENV} must be a hex string")))?;
        if bytes.len() != 32 {
            return Err(VaultError::Config(format!(
                "{VAULT_KEY_ENV} must decode to 32 bytes, got {}",
                bytes.len()
            )));
        }
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&bytes));
        Ok(Self { cipher })
    }

    /// Encrypts a provider access token. The random nonce is prepended to the ciphertext and
    /// the whole payload is base64-encoded for storage in a text column.
    pub fn encrypt_token(&self, plaintext: &Secret<String>) -> Result<String, VaultError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext =
            self.cipher.encrypt(&nonce, plaintext.reveal().as_bytes()).map_err(|_| VaultError::Encryption)?;
        let mut payload = nonce.to_vec();
        payload.extend_from_slice(&ciphertext);
        Ok(base64::encode(payload))
    }

    /// Decrypts a stored token. Callers must treat a failure here as "skip this merchant this
    /// cycle", never as fatal.
    pub fn decrypt_token(&self, ciphertext: &str) -> Result<Secret<String>, VaultError> {
        let payload = base64::decode(ciphertext).map_err(|_| VaultError::Decryption)?;
        if payload.len() <= NONCE_SIZE {
            return Err(VaultError::Decryption);
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_SIZE);
        let plaintext = self.cipher.decrypt(Nonce::from_slice(nonce), ciphertext).map_err(|_| VaultError::Decryption)?;
        String::from_utf8(plaintext).map(Secret::new).map_err(|_| VaultError::Decryption)
    }
}

/// Hashes a device API key with argon2id and a fresh random salt.
pub fn hash_api_key(api_key: &str) -> Result<String, VaultError> {
    let salt = SaltString::generate(&mut SaltRng);
    let hash = Argon2::default()
        .hash_password(api_key.as_bytes(), &salt)
        .map_err(|e| VaultError::Hashing(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verifies a device API key against a stored hash.
///
/// Returns `false` for malformed or foreign hashes rather than erroring, so an attacker
/// cannot distinguish "bad key" from "bad hash" at the call site.
pub fn verify_api_key(api_key: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default().verify_password(api_key.as_bytes(), &parsed).is_ok(),
        Err(_) => false,
    }
}

/// A deterministic one-way digest of a provider token, used only to recognise an
/// already-registered token during the direct-token registration flow. Equal tokens always
/// produce equal fingerprints, which the randomized AEAD ciphertexts cannot.
pub fn token_fingerprint(token: &Secret<String>) -> String {
    let digest = Sha256::digest(token.reveal().as_bytes());
    to_hex(&digest)
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok()).collect()
}
