//! AES-256-GCM note encryption.
//!
//! Payload layout: `[version = 1][nonce: 12 bytes][ciphertext + 16-byte tag]`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use crate::crypto::key::DerivedKey;
use crate::error::{NotePadError, Result};

/// Current payload format version.
pub const FORMAT_VERSION: u8 = 1;

pub const NONCE_LENGTH: usize = 12;
pub const TAG_LENGTH: usize = 16;

const HEADER_LENGTH: usize = 1 + NONCE_LENGTH;

/// Fill a fresh array from the OS-seeded thread RNG.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
}

fn cipher_for(key: &DerivedKey) -> Result<Aes256Gcm> {
    Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| NotePadError::Security(format!("Invalid key: {}", e)))
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(key: &DerivedKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let nonce = random_bytes::<NONCE_LENGTH>();
    let sealed = cipher_for(key)?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| NotePadError::Security("AES-GCM encryption failed".to_string()))?;

    let mut payload = Vec::with_capacity(HEADER_LENGTH + sealed.len());
    payload.push(FORMAT_VERSION);
    payload.extend_from_slice(&nonce);
    payload.extend_from_slice(&sealed);
    Ok(payload)
}

/// Decrypt a payload produced by [`encrypt`].
pub fn decrypt(key: &DerivedKey, payload: &[u8]) -> Result<Vec<u8>> {
    if payload.len() < HEADER_LENGTH + TAG_LENGTH {
        return Err(NotePadError::Security(format!(
            "Encrypted payload truncated ({} bytes)",
            payload.len()
        )));
    }
    if payload[0] != FORMAT_VERSION {
        return Err(NotePadError::Security(format!(
            "Unsupported payload version {}",
            payload[0]
        )));
    }

    let (nonce, sealed) = payload[1..].split_at(NONCE_LENGTH);
    cipher_for(key)?
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| NotePadError::Security("AES-GCM authentication failed".to_string()))
}

/// Encrypt a UTF-8 string.
pub fn encrypt_str(key: &DerivedKey, plaintext: &str) -> Result<Vec<u8>> {
    encrypt(key, plaintext.as_bytes())
}

/// Decrypt a payload that holds a UTF-8 string.
pub fn decrypt_str(key: &DerivedKey, payload: &[u8]) -> Result<String> {
    String::from_utf8(decrypt(key, payload)?)
        .map_err(|_| NotePadError::Security("Decrypted text is not valid UTF-8".to_string()))
}
