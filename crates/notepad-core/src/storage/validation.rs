//! Input validation shared by every engine.
//!
//! All checks run before any write reaches the engine.

use crate::error::{NotePadError, Result};
use crate::storage::types::{NoteContent, NoteItem, PrivacyLevel};

/// Reject blank names.
pub fn validate_name<'a>(name: &'a str, what: &str) -> Result<&'a str> {
    if name.trim().is_empty() {
        return Err(NotePadError::InvalidArgument(format!(
            "{} name cannot be empty",
            what
        )));
    }
    Ok(name)
}

/// Check that the populated content field matches the privacy level.
///
/// - `Public` / `Private` carry non-empty `NoteContent::Text`
/// - `Encrypted` carries non-empty `NoteContent::Cipher`
///
/// Empty content is rejected at every level.
pub fn validate_content(note: &NoteItem) -> Result<()> {
    match (&note.content, note.privacy) {
        (None, _) => Err(NotePadError::InvalidArgument(
            "Note content is missing".to_string(),
        )),
        (Some(NoteContent::Text(text)), PrivacyLevel::Public | PrivacyLevel::Private)
            if !text.is_empty() =>
        {
            Ok(())
        }
        (Some(NoteContent::Text(_)), PrivacyLevel::Public | PrivacyLevel::Private) => Err(
            NotePadError::InvalidArgument("Note text cannot be empty".to_string()),
        ),
        (Some(NoteContent::Cipher(bytes)), PrivacyLevel::Encrypted) if !bytes.is_empty() => Ok(()),
        (Some(NoteContent::Cipher(_)), PrivacyLevel::Encrypted) => Err(
            NotePadError::InvalidArgument("Encrypted note has empty ciphertext".to_string()),
        ),
        (Some(NoteContent::Text(_)), PrivacyLevel::Encrypted) => {
            Err(NotePadError::InvalidArgument(
                "Encrypted note must carry ciphertext, not text".to_string(),
            ))
        }
        (Some(NoteContent::Cipher(_)), level) => Err(NotePadError::InvalidArgument(format!(
            "{:?} note must carry text, not ciphertext",
            level
        ))),
    }
}

/// Resolve timestamps for a new note.
///
/// A missing creation time becomes `now`; a missing modification time
/// becomes the creation time.
pub fn stamp_new(note: &NoteItem, now: i64) -> Result<NoteItem> {
    let created = note.created.unwrap_or(now);
    let modified = note.modified.unwrap_or(created);
    check_order(created, modified)?;
    Ok(NoteItem {
        created: Some(created),
        modified: Some(modified),
        category_name: None,
        ..note.clone()
    })
}

/// Resolve timestamps for an edit of `stored`.
///
/// A missing creation time keeps the stored one; a missing modification
/// time becomes `now`.
pub fn stamp_update(note: &NoteItem, stored: &NoteItem, now: i64) -> Result<NoteItem> {
    let created = note.created.or(stored.created);
    let modified = note.modified.unwrap_or(now);
    if let Some(created) = created {
        check_order(created, modified)?;
    }
    Ok(NoteItem {
        created,
        modified: Some(modified),
        category_name: None,
        ..note.clone()
    })
}

fn check_order(created: i64, modified: i64) -> Result<()> {
    if modified < created {
        return Err(NotePadError::InvalidArgument(format!(
            "Modification time {} precedes creation time {}",
            modified, created
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_names_rejected() {
        assert!(validate_name("Work", "Category").is_ok());
        assert!(matches!(
            validate_name("", "Category"),
            Err(NotePadError::InvalidArgument(_))
        ));
        assert!(validate_name("  \t", "Metadata").is_err());
    }

    #[test]
    fn test_content_pairs() {
        assert!(validate_content(&NoteItem::new(PrivacyLevel::Public, "a")).is_ok());
        assert!(validate_content(&NoteItem::new(PrivacyLevel::Private, " ")).is_ok());
        assert!(validate_content(&NoteItem::encrypted(vec![1])).is_ok());

        let text_as_encrypted = NoteItem::new(PrivacyLevel::Encrypted, "oops");
        assert!(validate_content(&text_as_encrypted).is_err());

        let mut cipher_as_public = NoteItem::encrypted(vec![1, 2]);
        cipher_as_public.privacy = PrivacyLevel::Public;
        assert!(validate_content(&cipher_as_public).is_err());

        assert!(validate_content(&NoteItem::encrypted(Vec::new())).is_err());

        let mut missing = NoteItem::new(PrivacyLevel::Public, "x");
        missing.content = None;
        assert!(validate_content(&missing).is_err());
    }

    #[test]
    fn test_empty_content_rejected_at_every_level() {
        for note in [
            NoteItem::new(PrivacyLevel::Public, ""),
            NoteItem::new(PrivacyLevel::Private, ""),
            NoteItem::encrypted(Vec::new()),
        ] {
            assert!(
                matches!(validate_content(&note), Err(NotePadError::InvalidArgument(_))),
                "{:?} with empty content",
                note.privacy
            );
        }
    }

    #[test]
    fn test_stamp_new_defaults() {
        let stamped = stamp_new(&NoteItem::new(PrivacyLevel::Public, "a"), 1_000).unwrap();
        assert_eq!(stamped.created, Some(1_000));
        assert_eq!(stamped.modified, Some(1_000));

        let mut dated = NoteItem::new(PrivacyLevel::Public, "a");
        dated.created = Some(500);
        let stamped = stamp_new(&dated, 1_000).unwrap();
        assert_eq!(stamped.modified, Some(500));

        dated.modified = Some(100);
        assert!(stamp_new(&dated, 1_000).is_err());
    }

    #[test]
    fn test_stamp_update_keeps_created() {
        let mut stored = NoteItem::new(PrivacyLevel::Public, "a");
        stored.created = Some(10);
        stored.modified = Some(10);

        let edit = NoteItem::new(PrivacyLevel::Public, "b");
        let stamped = stamp_update(&edit, &stored, 99).unwrap();
        assert_eq!(stamped.created, Some(10));
        assert_eq!(stamped.modified, Some(99));
    }
}
