//! Storage traits.
//!
//! Two layers:
//!
//! - [`StorageEngine`] is the raw backend seam: row access plus
//!   begin/commit/rollback. It knows nothing about validation, the Unfiled
//!   category or observers. SQLite and an in-memory map implement it.
//! - [`NoteRepository`] is the contract collaborators program against. It is
//!   implemented once, by [`crate::storage::Repository`], over any engine, so
//!   both backends share every rule above the rows.

use std::sync::Arc;

use crate::error::{NotePadError, Result};
use crate::storage::cursor::NoteCursor;
use crate::storage::notify::{Dispatcher, NotePadObserver};
use crate::storage::sort::SortOrder;
use crate::storage::types::{
    CategoryFilter, NoteCategory, NoteFilter, NoteItem, NoteMetadata,
};

/// Raw storage backend.
///
/// Engines assume validated input. A disconnected engine fails every row
/// operation with `NotePadError::Closed`.
pub trait StorageEngine: Send {
    /// Open the backing store; a no-op when already connected.
    fn connect(&mut self) -> Result<()>;

    /// Close the backing store.
    fn disconnect(&mut self) -> Result<()>;

    fn is_connected(&self) -> bool;

    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;

    // --- Categories ---

    fn count_categories(&mut self) -> Result<u64>;

    /// All categories ordered by name.
    fn list_categories(&mut self) -> Result<Vec<NoteCategory>>;

    fn find_category(&mut self, id: i64) -> Result<Option<NoteCategory>>;
    fn find_category_by_name(&mut self, name: &str) -> Result<Option<NoteCategory>>;

    /// Insert a category, allocating an id when `id` is `None`.
    fn insert_category(&mut self, id: Option<i64>, name: &str) -> Result<i64>;

    fn rename_category(&mut self, id: i64, name: &str) -> Result<bool>;
    fn delete_category(&mut self, id: i64) -> Result<bool>;

    /// Move every note of category `from` to category `to`.
    fn reassign_notes(&mut self, from: i64, to: i64) -> Result<u64>;

    // --- Metadata ---

    fn count_metadata(&mut self) -> Result<u64>;
    fn find_metadata(&mut self, name: &str) -> Result<Option<NoteMetadata>>;

    /// All metadata names in ascending order.
    fn metadata_names(&mut self) -> Result<Vec<String>>;

    /// Insert or replace by name, keeping the id of an existing record.
    fn upsert_metadata(&mut self, name: &str, value: &[u8]) -> Result<i64>;

    fn delete_metadata(&mut self, name: &str) -> Result<bool>;
    fn delete_metadata_by_id(&mut self, id: i64) -> Result<bool>;
    fn delete_all_metadata(&mut self) -> Result<u64>;

    // --- Notes ---

    fn count_notes(&mut self, filter: &NoteFilter) -> Result<u64>;

    /// Matching notes in row-id order with category names joined in.
    fn list_notes(&mut self, filter: &NoteFilter) -> Result<Vec<NoteItem>>;

    fn find_note(&mut self, id: i64) -> Result<Option<NoteItem>>;

    /// Insert a note, allocating an id when `note.id` is `None`.
    fn insert_note(&mut self, note: &NoteItem) -> Result<i64>;

    fn update_note(&mut self, note: &NoteItem) -> Result<bool>;
    fn delete_note(&mut self, id: i64) -> Result<bool>;
    fn delete_all_notes(&mut self) -> Result<u64>;
}

/// Id for a new row given the largest id in its table: one past the
/// largest, or 1 for an empty table.
pub fn next_row_id(max: Option<i64>) -> Result<i64> {
    match max {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| NotePadError::Storage("id space exhausted".to_string())),
    }
}

/// The note repository contract.
///
/// Every method takes `&self` and implementations are shareable across
/// threads. Mutations that are not nested in [`run_in_transaction`] notify
/// observers right after they commit.
///
/// [`run_in_transaction`]: NoteRepository::run_in_transaction
pub trait NoteRepository: Send + Sync {
    // --- Sessions ---

    /// Acquire a session for `owner`; the first session connects the store.
    fn open(&self, owner: &str) -> Result<()>;

    /// Release one session of `owner`; the last release disconnects the
    /// store. Returns `false` when `owner` held no session.
    fn release(&self, owner: &str) -> Result<bool>;

    fn is_open(&self) -> bool;

    // --- Counts (never fail) ---

    fn count_categories(&self) -> u64;
    fn count_metadata(&self) -> u64;
    fn count_notes(&self) -> u64;
    fn count_notes_in_category(&self, category_id: i64) -> u64;
    fn count_private_notes(&self) -> u64;
    fn count_encrypted_notes(&self) -> u64;

    // --- Categories ---

    /// All categories ordered by name, Unfiled included.
    fn get_categories(&self) -> Result<Vec<NoteCategory>>;
    fn get_category_by_id(&self, id: i64) -> Result<Option<NoteCategory>>;
    fn get_category_by_name(&self, name: &str) -> Result<Option<NoteCategory>>;
    fn insert_category(&self, name: &str) -> Result<NoteCategory>;
    fn insert_category_with_id(&self, category: &NoteCategory) -> Result<NoteCategory>;
    fn update_category(&self, id: i64, name: &str) -> Result<NoteCategory>;

    /// Delete a category, moving its notes to Unfiled.
    fn delete_category(&self, id: i64) -> Result<bool>;

    /// Delete every category except Unfiled, moving their notes to Unfiled.
    fn delete_all_categories(&self) -> Result<bool>;

    // --- Metadata ---

    fn get_metadata(&self, name: &str) -> Result<Option<NoteMetadata>>;
    fn get_metadata_names(&self) -> Result<Vec<String>>;
    fn upsert_metadata(&self, name: &str, value: &[u8]) -> Result<NoteMetadata>;
    fn delete_metadata(&self, name: &str) -> Result<bool>;
    fn delete_metadata_by_id(&self, id: i64) -> Result<bool>;
    fn delete_all_metadata(&self) -> Result<bool>;

    // --- Notes ---

    fn get_notes(
        &self,
        category: CategoryFilter,
        include_private: bool,
        include_encrypted: bool,
        order: &SortOrder,
    ) -> Result<NoteCursor>;

    /// Ids of all private and encrypted notes, ascending.
    fn get_private_note_ids(&self) -> Result<Vec<i64>>;

    fn get_note_by_id(&self, id: i64) -> Result<Option<NoteItem>>;
    fn insert_note(&self, note: &NoteItem) -> Result<NoteItem>;
    fn update_note(&self, note: &NoteItem) -> Result<NoteItem>;
    fn delete_note(&self, id: i64) -> Result<bool>;
    fn delete_all_notes(&self) -> Result<bool>;

    // --- Transactions ---

    /// Run `work` atomically.
    ///
    /// Nested calls join the outermost unit of work. An error or panic
    /// inside `work` rolls every change back; observers hear about the
    /// changes once, after the outermost commit.
    fn run_in_transaction(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()>;

    // --- Observers ---

    fn register_observer(&self, observer: Arc<dyn NotePadObserver>);
    fn unregister_observer(&self, observer: &Arc<dyn NotePadObserver>) -> bool;

    /// Deliver notifications through `dispatcher` (the UI context).
    fn attach_dispatcher(&self, dispatcher: Arc<dyn Dispatcher>);

    /// Fall back to the default coordination thread.
    fn detach_dispatcher(&self) -> bool;
}

/// Run `work` in a transaction and return its value.
pub fn transaction<R, T, F>(repository: &R, work: F) -> Result<T>
where
    R: NoteRepository + ?Sized,
    F: FnOnce() -> Result<T>,
{
    let mut work = Some(work);
    let mut output = None;
    repository.run_in_transaction(&mut || {
        let work = work.take().ok_or_else(|| {
            NotePadError::TransactionFailure("unit of work already ran".to_string())
        })?;
        output = Some(work()?);
        Ok(())
    })?;
    output.ok_or_else(|| {
        NotePadError::TransactionFailure("unit of work produced no value".to_string())
    })
}
