//! Core data types for the storage layer.
//!
//! These types mirror the three persisted tables: `category`, `misc` and
//! `notes`. Values handed out by a repository are always owned copies.

use serde::{Deserialize, Serialize};

use crate::error::{NotePadError, Result};

/// Id of the reserved "Unfiled" category.
pub const UNFILED_CATEGORY_ID: i64 = 0;

/// Per-note privacy tier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    /// Visible to anyone using the app
    #[default]
    Public = 0,
    /// Hidden unless private notes are shown; stored as plain text
    Private = 1,
    /// Hidden and stored as ciphertext
    Encrypted = 2,
}

impl PrivacyLevel {
    /// Integer stored in the `private` column.
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    /// Whether notes at this level carry ciphertext.
    pub fn is_encrypted(self) -> bool {
        matches!(self, PrivacyLevel::Encrypted)
    }
}

impl TryFrom<i64> for PrivacyLevel {
    type Error = NotePadError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(PrivacyLevel::Public),
            1 => Ok(PrivacyLevel::Private),
            2 => Ok(PrivacyLevel::Encrypted),
            other => Err(NotePadError::InvalidArgument(format!(
                "Privacy level must be 0, 1 or 2 (got {})",
                other
            ))),
        }
    }
}

/// The body of a note: plain text for levels 0-1, ciphertext for level 2.
///
/// The derived ordering is the content sort order: text sorts before
/// ciphertext, text compares by its UTF-8 bytes and ciphertext compares
/// unsigned byte-by-byte with the shorter prefix first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteContent {
    Text(String),
    Cipher(Vec<u8>),
}

impl NoteContent {
    /// The plain text, if this content is not encrypted.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NoteContent::Text(text) => Some(text),
            NoteContent::Cipher(_) => None,
        }
    }

    /// The ciphertext, if this content is encrypted.
    pub fn as_cipher(&self) -> Option<&[u8]> {
        match self {
            NoteContent::Text(_) => None,
            NoteContent::Cipher(bytes) => Some(bytes),
        }
    }
}

/// A note row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteItem {
    /// Row id; `None` until the note is first stored
    pub id: Option<i64>,

    /// Creation time in epoch milliseconds
    pub created: Option<i64>,

    /// Last modification time in epoch milliseconds
    pub modified: Option<i64>,

    /// Privacy tier
    pub privacy: PrivacyLevel,

    /// Owning category (Unfiled when never set)
    pub category_id: i64,

    /// Category name joined in on read; never stored
    pub category_name: Option<String>,

    /// Text or ciphertext, matching `privacy`
    pub content: Option<NoteContent>,
}

impl NoteItem {
    /// A new, unsaved plain-text note in the Unfiled category.
    pub fn new(privacy: PrivacyLevel, text: impl Into<String>) -> Self {
        Self {
            id: None,
            created: None,
            modified: None,
            privacy,
            category_id: UNFILED_CATEGORY_ID,
            category_name: None,
            content: Some(NoteContent::Text(text.into())),
        }
    }

    /// A new, unsaved encrypted note holding `cipher`.
    pub fn encrypted(cipher: Vec<u8>) -> Self {
        Self {
            privacy: PrivacyLevel::Encrypted,
            content: Some(NoteContent::Cipher(cipher)),
            ..Self::new(PrivacyLevel::Encrypted, String::new())
        }
    }

    /// Builder-style category assignment.
    pub fn in_category(mut self, category_id: i64) -> Self {
        self.category_id = category_id;
        self
    }

    /// Plain text of a non-encrypted note.
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().and_then(NoteContent::as_text)
    }

    /// Ciphertext of an encrypted note.
    pub fn cipher(&self) -> Option<&[u8]> {
        self.content.as_ref().and_then(NoteContent::as_cipher)
    }
}

/// A note category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteCategory {
    pub id: i64,
    pub name: String,
}

impl NoteCategory {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Whether this is the reserved Unfiled category.
    pub fn is_unfiled(&self) -> bool {
        self.id == UNFILED_CATEGORY_ID
    }
}

/// A generic name/value metadata record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub id: Option<i64>,
    pub name: String,
    pub value: Vec<u8>,
}

/// Which categories `get_notes` should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(i64),
}

impl CategoryFilter {
    pub fn matches(self, category_id: i64) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(id) => id == category_id,
        }
    }
}

/// Row selection handed to a storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteFilter {
    pub category: CategoryFilter,
    pub min_privacy: PrivacyLevel,
    pub max_privacy: PrivacyLevel,
}

impl NoteFilter {
    /// Every note in every category.
    pub fn all() -> Self {
        Self {
            category: CategoryFilter::All,
            min_privacy: PrivacyLevel::Public,
            max_privacy: PrivacyLevel::Encrypted,
        }
    }

    /// Visibility rules of `get_notes`: encrypted notes only show up when
    /// private notes do.
    pub fn visible(category: CategoryFilter, include_private: bool, include_encrypted: bool) -> Self {
        let max_privacy = match (include_private, include_encrypted) {
            (false, _) => PrivacyLevel::Public,
            (true, false) => PrivacyLevel::Private,
            (true, true) => PrivacyLevel::Encrypted,
        };
        Self {
            category,
            min_privacy: PrivacyLevel::Public,
            max_privacy,
        }
    }

    pub fn with_min_privacy(mut self, min_privacy: PrivacyLevel) -> Self {
        self.min_privacy = min_privacy;
        self
    }

    pub fn matches(&self, note: &NoteItem) -> bool {
        self.category.matches(note.category_id)
            && note.privacy >= self.min_privacy
            && note.privacy <= self.max_privacy
    }
}
