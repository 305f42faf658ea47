//! Cryptographic primitives for encrypted notes.
//!
//! - **Argon2id** derives the note key from the user's password
//! - **AES-256-GCM** encrypts note content, with a fresh nonce per payload
//! - **SHA-256** turns the key into a stored verifier, so the password itself
//!   is never persisted
//!
//! Key material is zeroized on drop.

pub mod cipher;
pub mod key;
pub mod password;
pub mod session;

pub use cipher::{decrypt, decrypt_str, encrypt, encrypt_str};
pub use key::{derive_key, DerivedKey, KdfParams, KEY_LENGTH};
pub use password::{PasswordRecord, PASSWORD_METADATA};
pub use session::KeySession;
