//! Cursor over a materialized note listing.

use tracing::debug;

use crate::error::{NotePadError, Result};
use crate::storage::types::NoteItem;

/// Forward and random-access cursor over the rows of a `get_notes` call.
///
/// The cursor owns its rows. It starts positioned before the first row and
/// must be closed with [`NoteCursor::close`]; row access after closing fails
/// with `NotePadError::Closed`.
#[derive(Debug)]
pub struct NoteCursor {
    rows: Vec<NoteItem>,
    // -1 is "before first", rows.len() is "after last"
    position: isize,
    closed: bool,
}

impl NoteCursor {
    pub(crate) fn new(rows: Vec<NoteItem>) -> Self {
        Self {
            rows,
            position: -1,
            closed: false,
        }
    }

    /// Number of rows in the result set.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Current position; -1 before the first row.
    pub fn position(&self) -> isize {
        self.position
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Move to `position`; returns whether a row is there.
    pub fn move_to_position(&mut self, position: isize) -> bool {
        if self.closed {
            return false;
        }
        let len = self.rows.len() as isize;
        self.position = position.clamp(-1, len);
        self.position >= 0 && self.position < len
    }

    pub fn move_to_first(&mut self) -> bool {
        self.move_to_position(0)
    }

    pub fn move_to_last(&mut self) -> bool {
        self.move_to_position(self.rows.len() as isize - 1)
    }

    pub fn move_to_next(&mut self) -> bool {
        self.move_to_position(self.position + 1)
    }

    pub fn move_to_previous(&mut self) -> bool {
        self.move_to_position(self.position - 1)
    }

    /// The row under the cursor.
    pub fn current(&self) -> Result<&NoteItem> {
        if self.closed {
            return Err(NotePadError::Closed);
        }
        usize::try_from(self.position)
            .ok()
            .and_then(|index| self.rows.get(index))
            .ok_or_else(|| {
                NotePadError::InvalidArgument(format!(
                    "Cursor is not on a row (position {})",
                    self.position
                ))
            })
    }

    /// Random access without moving the cursor.
    pub fn get(&self, index: usize) -> Result<&NoteItem> {
        if self.closed {
            return Err(NotePadError::Closed);
        }
        self.rows.get(index).ok_or_else(|| {
            NotePadError::InvalidArgument(format!(
                "Row {} is out of range (count {})",
                index,
                self.rows.len()
            ))
        })
    }

    /// Release the result set.
    pub fn close(&mut self) {
        self.rows = Vec::new();
        self.position = -1;
        self.closed = true;
    }

    /// Close the cursor and hand back its rows.
    pub fn into_rows(mut self) -> Vec<NoteItem> {
        let rows = std::mem::take(&mut self.rows);
        self.closed = true;
        rows
    }
}

impl Iterator for NoteCursor {
    type Item = NoteItem;

    fn next(&mut self) -> Option<NoteItem> {
        if self.move_to_next() {
            self.current().ok().cloned()
        } else {
            None
        }
    }
}

impl Drop for NoteCursor {
    fn drop(&mut self) {
        if !self.closed {
            debug!(rows = self.rows.len(), "note cursor dropped without close");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::PrivacyLevel;

    fn cursor(count: i64) -> NoteCursor {
        NoteCursor::new(
            (1..=count)
                .map(|id| NoteItem {
                    id: Some(id),
                    ..NoteItem::new(PrivacyLevel::Public, format!("note {}", id))
                })
                .collect(),
        )
    }

    #[test]
    fn test_forward_iteration() {
        let mut rows = cursor(3);
        assert_eq!(rows.position(), -1);
        let mut seen = Vec::new();
        while rows.move_to_next() {
            seen.push(rows.current().unwrap().id.unwrap());
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert!(!rows.move_to_next());
        assert!(rows.current().is_err());
        rows.close();
    }

    #[test]
    fn test_random_access() {
        let mut rows = cursor(4);
        assert!(rows.move_to_last());
        assert_eq!(rows.current().unwrap().id, Some(4));
        assert!(rows.move_to_previous());
        assert_eq!(rows.current().unwrap().id, Some(3));
        assert!(rows.move_to_position(0));
        assert_eq!(rows.current().unwrap().id, Some(1));
        assert!(!rows.move_to_position(10));
        assert_eq!(rows.position(), 4);
        assert_eq!(rows.get(1).unwrap().id, Some(2));
        assert!(rows.get(9).is_err());
        rows.close();
    }

    #[test]
    fn test_closed_cursor_rejects_access() {
        let mut rows = cursor(2);
        rows.close();
        assert!(rows.is_closed());
        assert!(!rows.move_to_first());
        assert!(matches!(rows.get(0), Err(NotePadError::Closed)));
        assert!(matches!(rows.current(), Err(NotePadError::Closed)));
    }

    #[test]
    fn test_iterator_and_into_rows() {
        let collected: Vec<i64> = cursor(3).filter_map(|note| note.id).collect();
        assert_eq!(collected, vec![1, 2, 3]);

        let rows = cursor(2).into_rows();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_empty_cursor() {
        let mut rows = cursor(0);
        assert!(rows.is_empty());
        assert!(!rows.move_to_first());
        assert!(!rows.move_to_last());
        rows.close();
    }
}
