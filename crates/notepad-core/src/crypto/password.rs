//! Stored password record.
//!
//! The record lets the app check a password without storing it or the key:
//! `[version = 1][salt: 32 bytes][SHA-256("notepad-verify" || key)]`.

use sha2::{Digest, Sha256};

use crate::crypto::cipher::random_bytes;
use crate::crypto::key::{derive_key, DerivedKey, KdfParams};
use crate::error::{NotePadError, Result};

/// Metadata name the record is stored under.
pub const PASSWORD_METADATA: &str = "password_hash";

const RECORD_VERSION: u8 = 1;
const SALT_LENGTH: usize = 32;
const VERIFIER_LENGTH: usize = 32;
const VERIFY_CONTEXT: &[u8] = b"notepad-verify";

/// Salt and key verifier of the current password.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordRecord {
    salt: [u8; SALT_LENGTH],
    verifier: [u8; VERIFIER_LENGTH],
}

impl std::fmt::Debug for PasswordRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordRecord")
            .field("version", &RECORD_VERSION)
            .finish_non_exhaustive()
    }
}

fn verifier_for(key: &DerivedKey) -> [u8; VERIFIER_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(VERIFY_CONTEXT);
    hasher.update(key.as_bytes());
    hasher.finalize().into()
}

impl PasswordRecord {
    /// A record for `password` with a fresh salt, plus the key it protects.
    pub fn create(password: &str, params: &KdfParams) -> Result<(Self, DerivedKey)> {
        let salt = random_bytes::<SALT_LENGTH>();
        let key = derive_key(password, &salt, params)?;
        let record = Self {
            salt,
            verifier: verifier_for(&key),
        };
        Ok((record, key))
    }

    /// Derive the key for `candidate` and check it against the record.
    ///
    /// Fails with `InvalidPassword` on mismatch.
    pub fn verify(&self, candidate: &str, params: &KdfParams) -> Result<DerivedKey> {
        if candidate.is_empty() {
            return Err(NotePadError::InvalidPassword);
        }
        let key = derive_key(candidate, &self.salt, params)?;
        let expected = verifier_for(&key);
        let diff = expected
            .iter()
            .zip(self.verifier.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        if diff != 0 {
            return Err(NotePadError::InvalidPassword);
        }
        Ok(key)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + SALT_LENGTH + VERIFIER_LENGTH);
        bytes.push(RECORD_VERSION);
        bytes.extend_from_slice(&self.salt);
        bytes.extend_from_slice(&self.verifier);
        bytes
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 1 + SALT_LENGTH + VERIFIER_LENGTH {
            return Err(NotePadError::Security(format!(
                "Password record has {} bytes",
                bytes.len()
            )));
        }
        if bytes[0] != RECORD_VERSION {
            return Err(NotePadError::Security(format!(
                "Unsupported password record version {}",
                bytes[0]
            )));
        }

        let mut salt = [0u8; SALT_LENGTH];
        let mut verifier = [0u8; VERIFIER_LENGTH];
        salt.copy_from_slice(&bytes[1..1 + SALT_LENGTH]);
        verifier.copy_from_slice(&bytes[1 + SALT_LENGTH..]);
        Ok(Self { salt, verifier })
    }
}
