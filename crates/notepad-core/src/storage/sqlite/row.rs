//! Note row type for database queries.

use rusqlite::types::Value;
use rusqlite::Row;

use crate::error::{NotePadError, Result};
use crate::storage::types::{NoteContent, NoteItem, PrivacyLevel};

/// Columns selected by every note query, in `NoteRow::from_row` order.
pub const NOTE_COLUMNS: &str =
    "n._id, n.created, n.modified, n.private, n.category_id, c.name, n.note";

/// Raw row data from the notes table, before parsing into domain types.
#[derive(Debug)]
pub struct NoteRow {
    pub id: i64,
    pub created: Option<i64>,
    pub modified: Option<i64>,
    pub privacy: i64,
    pub category_id: i64,
    pub category_name: Option<String>,
    pub note: Value,
}

impl NoteRow {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created: row.get(1)?,
            modified: row.get(2)?,
            privacy: row.get(3)?,
            category_id: row.get(4)?,
            category_name: row.get(5)?,
            note: row.get(6)?,
        })
    }
}

impl TryFrom<NoteRow> for NoteItem {
    type Error = NotePadError;

    fn try_from(row: NoteRow) -> Result<Self> {
        let privacy = PrivacyLevel::try_from(row.privacy)
            .map_err(|e| NotePadError::Storage(format!("Note {}: {}", row.id, e)))?;

        let content = match (privacy, row.note) {
            (_, Value::Null) => None,
            (PrivacyLevel::Encrypted, Value::Blob(bytes)) => Some(NoteContent::Cipher(bytes)),
            (PrivacyLevel::Encrypted, _) => {
                return Err(NotePadError::Storage(format!(
                    "Encrypted note {} is not stored as a blob",
                    row.id
                )))
            }
            (_, Value::Text(text)) => Some(NoteContent::Text(text)),
            (_, Value::Blob(bytes)) => {
                let text = String::from_utf8(bytes).map_err(|e| {
                    NotePadError::Storage(format!("Note {} is not valid UTF-8: {}", row.id, e))
                })?;
                Some(NoteContent::Text(text))
            }
            (_, other) => {
                return Err(NotePadError::Storage(format!(
                    "Note {} has unexpected content type {:?}",
                    row.id,
                    other.data_type()
                )))
            }
        };

        Ok(NoteItem {
            id: Some(row.id),
            created: row.created,
            modified: row.modified,
            privacy,
            category_id: row.category_id,
            category_name: row.category_name,
            content,
        })
    }
}

/// The value bound to the `note` column.
pub fn content_value(note: &NoteItem) -> Value {
    match &note.content {
        None => Value::Null,
        Some(NoteContent::Text(text)) => Value::Text(text.clone()),
        Some(NoteContent::Cipher(bytes)) => Value::Blob(bytes.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(privacy: i64, note: Value) -> NoteRow {
        NoteRow {
            id: 7,
            created: Some(1),
            modified: Some(2),
            privacy,
            category_id: 0,
            category_name: Some("Unfiled".into()),
            note,
        }
    }

    #[test]
    fn test_text_row() {
        let item = NoteItem::try_from(row(1, Value::Text("hi".into()))).unwrap();
        assert_eq!(item.id, Some(7));
        assert_eq!(item.privacy, PrivacyLevel::Private);
        assert_eq!(item.text(), Some("hi"));
        assert_eq!(item.category_name.as_deref(), Some("Unfiled"));
    }

    #[test]
    fn test_cipher_row() {
        let item = NoteItem::try_from(row(2, Value::Blob(vec![1, 2]))).unwrap();
        assert_eq!(item.cipher(), Some(&[1u8, 2][..]));
    }

    #[test]
    fn test_rejects_mismatched_rows() {
        assert!(NoteItem::try_from(row(2, Value::Text("plain".into()))).is_err());
        assert!(NoteItem::try_from(row(5, Value::Text("x".into()))).is_err());
        assert!(NoteItem::try_from(row(0, Value::Blob(vec![0xff, 0xfe]))).is_err());
        assert!(NoteItem::try_from(row(0, Value::Integer(3))).is_err());
    }
}
