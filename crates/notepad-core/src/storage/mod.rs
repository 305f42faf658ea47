//! Storage layer: the note repository contract and its engines.

pub mod cursor;
pub mod invariants;
pub mod memory;
pub mod notify;
pub mod repository;
pub mod sort;
pub mod sqlite;
pub mod traits;
mod transaction;
pub mod types;
pub mod validation;

pub use cursor::NoteCursor;
pub use invariants::{DefaultStrings, FixedStrings, LocalizedStrings};
pub use memory::MemoryEngine;
pub use notify::{CoordinatorThread, Dispatcher, ImmediateDispatcher, NotePadObserver, Task};
pub use repository::{MemoryRepository, Repository, SqliteRepository};
pub use sort::{NoteComparator, SortDirection, SortField, SortKey, SortOrder};
pub use sqlite::SqliteEngine;
pub use traits::{transaction, NoteRepository, StorageEngine};
pub use types::{
    CategoryFilter, NoteCategory, NoteContent, NoteFilter, NoteItem, NoteMetadata, PrivacyLevel,
    UNFILED_CATEGORY_ID,
};
