//! Password management and note encryption on top of a repository.
//!
//! The password record lives in the repository's metadata; the derived key
//! lives in a [`KeySession`] owned by the application context. Nothing here
//! stores the password or the key.
//!
//! A service that unlocks counts as one holder of its session until it
//! calls [`EncryptionService::release`] or [`EncryptionService::lock`], or
//! is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::crypto::{self, DerivedKey, KdfParams, KeySession, PasswordRecord, PASSWORD_METADATA};
use crate::error::{NotePadError, Result};
use crate::storage::traits::{transaction, NoteRepository};
use crate::storage::types::{CategoryFilter, NoteContent, NoteItem, PrivacyLevel};
use crate::storage::SortOrder;

/// Encryption service for one repository.
pub struct EncryptionService {
    repository: Arc<dyn NoteRepository>,
    session: Arc<KeySession>,
    params: KdfParams,
    // This service has a hold on the session
    holding: AtomicBool,
}

impl EncryptionService {
    pub fn new(repository: Arc<dyn NoteRepository>, session: Arc<KeySession>) -> Self {
        Self {
            repository,
            session,
            params: KdfParams::default(),
            holding: AtomicBool::new(false),
        }
    }

    /// Override the Argon2 cost parameters.
    pub fn with_params(mut self, params: KdfParams) -> Self {
        self.params = params;
        self
    }

    pub fn session(&self) -> &Arc<KeySession> {
        &self.session
    }

    fn record(&self) -> Result<Option<PasswordRecord>> {
        self.repository
            .get_metadata(PASSWORD_METADATA)?
            .map(|metadata| PasswordRecord::parse(&metadata.value))
            .transpose()
    }

    fn require_record(&self) -> Result<PasswordRecord> {
        self.record()?
            .ok_or_else(|| NotePadError::Security("No password is set".to_string()))
    }

    /// Hold the session (once per service) and install `key`.
    fn hold_key(&self, key: DerivedKey) {
        if !self.holding.swap(true, Ordering::SeqCst) {
            self.session.hold();
        }
        self.session.install(key);
    }

    fn held_key(&self) -> Result<DerivedKey> {
        self.session.with_key(|key| Ok(key.clone()))
    }

    /// Every encrypted note, in id order.
    fn encrypted_notes(&self) -> Result<Vec<NoteItem>> {
        let cursor =
            self.repository
                .get_notes(CategoryFilter::All, true, true, &SortOrder::default())?;
        Ok(cursor
            .into_rows()
            .into_iter()
            .filter(|note| note.privacy.is_encrypted())
            .collect())
    }

    /// Whether a password record exists.
    pub fn has_password(&self) -> Result<bool> {
        Ok(self.repository.get_metadata(PASSWORD_METADATA)?.is_some())
    }

    /// Set the first password and unlock with it.
    ///
    /// Fails with `InvalidArgument` when a password already exists; use
    /// [`change_password`](Self::change_password) instead.
    pub fn set_password(&self, password: &str) -> Result<()> {
        if self.has_password()? {
            return Err(NotePadError::InvalidArgument(
                "A password is already set".to_string(),
            ));
        }
        let (record, key) = PasswordRecord::create(password, &self.params)?;
        self.repository
            .upsert_metadata(PASSWORD_METADATA, &record.encode())?;
        self.hold_key(key);
        info!("password set");
        Ok(())
    }

    /// `Ok(true)` when `candidate` is the password, `InvalidPassword` when
    /// it is not.
    pub fn check_password(&self, candidate: &str) -> Result<bool> {
        self.require_record()?.verify(candidate, &self.params)?;
        Ok(true)
    }

    /// Check `password` and hold its key in the session.
    pub fn unlock(&self, password: &str) -> Result<()> {
        let key = self.require_record()?.verify(password, &self.params)?;
        self.hold_key(key);
        debug!(holders = self.session.holders(), "key session unlocked");
        Ok(())
    }

    /// Give up this service's hold on the session.
    ///
    /// The key stays while other holders remain. Returns whether a hold was
    /// released.
    pub fn release(&self) -> bool {
        if !self.holding.swap(false, Ordering::SeqCst) {
            return false;
        }
        let remaining = self.session.release();
        debug!(holders = remaining, "key session released");
        true
    }

    /// Drop the key for every holder and give up this service's hold.
    pub fn lock(&self) -> bool {
        let forgotten = self.session.forget();
        self.release();
        forgotten
    }

    pub fn is_unlocked(&self) -> bool {
        self.session.is_unlocked()
    }

    /// Replace the password, re-encrypting every encrypted note.
    ///
    /// All notes and the new record are written in one transaction.
    pub fn change_password(&self, old: &str, new: &str) -> Result<()> {
        let old_key = self.require_record()?.verify(old, &self.params)?;
        let (record, new_key) = PasswordRecord::create(new, &self.params)?;

        let changed = transaction(self.repository.as_ref(), || {
            let notes = self.encrypted_notes()?;
            for note in &notes {
                let plaintext = crypto::decrypt(&old_key, cipher_of(note)?)?;
                let resealed = NoteItem {
                    content: Some(NoteContent::Cipher(crypto::encrypt(&new_key, &plaintext)?)),
                    ..note.clone()
                };
                self.repository.update_note(&resealed)?;
            }
            self.repository
                .upsert_metadata(PASSWORD_METADATA, &record.encode())?;
            Ok(notes.len())
        })?;

        self.hold_key(new_key);
        info!(notes = changed, "password changed");
        Ok(())
    }

    /// Remove the password.
    ///
    /// Encrypted notes are decrypted to private notes with the held key
    /// (`Locked` if none is held), all in one transaction. Returns whether
    /// a record was removed.
    pub fn remove_password(&self) -> Result<bool> {
        if !self.has_password()? {
            self.lock();
            return Ok(false);
        }

        let key = if self.repository.count_encrypted_notes() > 0 {
            Some(self.held_key()?)
        } else {
            None
        };

        let decrypted = transaction(self.repository.as_ref(), || {
            let mut decrypted = 0usize;
            if let Some(key) = &key {
                for note in self.encrypted_notes()? {
                    let text = crypto::decrypt_str(key, cipher_of(&note)?)?;
                    let opened = NoteItem {
                        privacy: PrivacyLevel::Private,
                        content: Some(NoteContent::Text(text)),
                        ..note
                    };
                    self.repository.update_note(&opened)?;
                    decrypted += 1;
                }
            }
            self.repository.delete_metadata(PASSWORD_METADATA)?;
            Ok(decrypted)
        })?;

        self.lock();
        info!(notes = decrypted, "password removed");
        Ok(true)
    }

    pub fn encrypt_bytes(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.session.with_key(|key| crypto::encrypt(key, plaintext))
    }

    pub fn decrypt_bytes(&self, payload: &[u8]) -> Result<Vec<u8>> {
        self.session.with_key(|key| crypto::decrypt(key, payload))
    }

    pub fn encrypt_string(&self, plaintext: &str) -> Result<Vec<u8>> {
        self.session.with_key(|key| crypto::encrypt_str(key, plaintext))
    }

    pub fn decrypt_string(&self, payload: &[u8]) -> Result<String> {
        self.session.with_key(|key| crypto::decrypt_str(key, payload))
    }

    /// Turn a text note into an encrypted one in place.
    pub fn seal_note(&self, note: &mut NoteItem) -> Result<()> {
        let text = match &note.content {
            Some(NoteContent::Text(text)) if text.is_empty() => {
                return Err(NotePadError::InvalidArgument(
                    "Note text cannot be empty".to_string(),
                ))
            }
            Some(NoteContent::Text(text)) => text,
            Some(NoteContent::Cipher(_)) if note.privacy.is_encrypted() => return Ok(()),
            _ => {
                return Err(NotePadError::InvalidArgument(
                    "Only text notes can be encrypted".to_string(),
                ))
            }
        };
        let cipher = self.encrypt_string(text)?;
        note.privacy = PrivacyLevel::Encrypted;
        note.content = Some(NoteContent::Cipher(cipher));
        Ok(())
    }

    /// Turn an encrypted note into a private text note in place.
    pub fn unseal_note(&self, note: &mut NoteItem) -> Result<()> {
        if !note.privacy.is_encrypted() {
            return Ok(());
        }
        let text = self.decrypt_string(cipher_of(note)?)?;
        note.privacy = PrivacyLevel::Private;
        note.content = Some(NoteContent::Text(text));
        Ok(())
    }

    /// The plain text of any note, decrypting encrypted content.
    pub fn open_note(&self, note: &NoteItem) -> Result<String> {
        match &note.content {
            Some(NoteContent::Text(text)) => Ok(text.clone()),
            Some(NoteContent::Cipher(payload)) => self.decrypt_string(payload),
            None => Err(NotePadError::InvalidArgument(
                "Note has no content".to_string(),
            )),
        }
    }
}

impl Drop for EncryptionService {
    fn drop(&mut self) {
        self.release();
    }
}

fn cipher_of(note: &NoteItem) -> Result<&[u8]> {
    note.cipher().ok_or_else(|| {
        NotePadError::Security(format!(
            "Encrypted note {:?} carries no ciphertext",
            note.id
        ))
    })
}
