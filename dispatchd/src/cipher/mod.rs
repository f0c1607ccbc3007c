//! Cryptographic primitives
//!
//! HMAC-SHA-256 for token signing, AES-256-GCM for payload encryption, and
//! argon2 for password hashing. All failures surface as
//! [`EngineError::Cipher`].

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::password_hash::rand_core::OsRng as PasswordRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::encoding::base64_encode;
use crate::error::EngineError;

/// Symmetric key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// AES-GCM nonce length in bytes.
pub const NONCE_LENGTH: usize = 12;

/// AES-GCM authentication tag length in bytes, appended to the ciphertext.
pub const TAG_LENGTH: usize = 16;

type HmacSha256 = Hmac<Sha256>;

/// Compute the HMAC-SHA-256 digest of `input` under `key`.
pub fn hmac_sha256(input: &[u8], key: &[u8]) -> Result<Vec<u8>, EngineError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|err| EngineError::Cipher(format!("invalid hmac key: {err}")))?;
    mac.update(input);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Generate a random 32-byte secret, base64-encoded.
#[must_use]
pub fn generate_secret() -> String {
    let mut bytes = [0_u8; KEY_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    base64_encode(bytes)
}

/// Generate a random AES-256-GCM key and nonce pair.
#[must_use]
pub fn generate_key_nonce() -> ([u8; KEY_LENGTH], [u8; NONCE_LENGTH]) {
    let mut key = [0_u8; KEY_LENGTH];
    let mut nonce = [0_u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut key);
    OsRng.fill_bytes(&mut nonce);
    (key, nonce)
}

/// Encrypt `plaintext` with AES-256-GCM.
///
/// Returns `ciphertext || tag`; the trailing [`TAG_LENGTH`] bytes are the
/// authentication tag, so any tampering fails [`decrypt`].
pub fn encrypt(plaintext: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, EngineError> {
    if key.len() != KEY_LENGTH || nonce.len() != NONCE_LENGTH {
        return Err(EngineError::Cipher("invalid key or nonce length".into()));
    }
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|err| EngineError::Cipher(format!("invalid aes key: {err}")))?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| EngineError::Cipher("encryption failed".into()))
}

/// Decrypt a `ciphertext || tag` buffer produced by [`encrypt`].
pub fn decrypt(input: &[u8], key: &[u8], nonce: &[u8]) -> Result<Vec<u8>, EngineError> {
    if key.len() != KEY_LENGTH || nonce.len() != NONCE_LENGTH {
        return Err(EngineError::Cipher("invalid key or nonce length".into()));
    }
    if input.len() < TAG_LENGTH {
        return Err(EngineError::Cipher("ciphertext too short".into()));
    }
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|err| EngineError::Cipher(format!("invalid aes key: {err}")))?;
    cipher
        .decrypt(Nonce::from_slice(nonce), input)
        .map_err(|_| EngineError::Cipher("decryption failed".into()))
}

/// Hash a password with argon2 and a random salt.
pub fn password_hash(password: &str) -> Result<String, EngineError> {
    let salt = SaltString::generate(&mut PasswordRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| EngineError::Cipher(format!("password hashing failed: {err}")))
}

/// Check a password against a stored argon2 hash.
///
/// Malformed hashes count as a mismatch rather than an error; the attempt
/// controller treats both the same way.
#[must_use]
pub fn password_verify(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}
