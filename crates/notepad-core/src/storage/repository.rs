//! The note repository.
//!
//! [`Repository`] implements [`NoteRepository`] once, over any
//! [`StorageEngine`]. Validation, the Unfiled rules, transaction nesting,
//! session counting and observer notification all live here, so the SQLite
//! and in-memory backends cannot drift apart.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, warn};

use crate::error::{NotePadError, Result};
use crate::storage::cursor::NoteCursor;
use crate::storage::invariants::{self, DefaultStrings, LocalizedStrings};
use crate::storage::memory::MemoryEngine;
use crate::storage::notify::{Dispatcher, Event, NotePadObserver, Notifier};
use crate::storage::sort::SortOrder;
use crate::storage::sqlite::SqliteEngine;
use crate::storage::traits::{NoteRepository, StorageEngine};
use crate::storage::transaction::TransactionGate;
use crate::storage::types::{
    CategoryFilter, NoteCategory, NoteFilter, NoteItem, NoteMetadata, PrivacyLevel,
};
use crate::storage::validation::{stamp_new, stamp_update, validate_content, validate_name};

/// Repository backed by SQLite.
pub type SqliteRepository = Repository<SqliteEngine>;

/// Repository backed by in-memory tables.
pub type MemoryRepository = Repository<MemoryEngine>;

/// Note repository over a storage engine.
pub struct Repository<E: StorageEngine> {
    engine: Mutex<E>,
    gate: TransactionGate,
    sessions: Mutex<HashMap<String, usize>>,
    notifier: Notifier,
    strings: Box<dyn LocalizedStrings>,
}

impl<E: StorageEngine> Repository<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Mutex::new(engine),
            gate: TransactionGate::default(),
            sessions: Mutex::new(HashMap::new()),
            notifier: Notifier::default(),
            strings: Box::new(DefaultStrings),
        }
    }

    /// Use `strings` for the localized Unfiled name.
    pub fn with_strings(mut self, strings: impl LocalizedStrings + 'static) -> Self {
        self.strings = Box::new(strings);
        self
    }

    /// The localized name of the Unfiled category.
    pub fn unfiled_name(&self) -> String {
        self.strings.unfiled_category()
    }

    /// Total sessions currently open across all owners.
    pub fn session_count(&self) -> usize {
        self.sessions().values().sum()
    }

    /// Lock the engine, returning an error if the mutex is poisoned.
    fn lock_engine(&self) -> Result<MutexGuard<'_, E>> {
        self.engine
            .lock()
            .map_err(|_| NotePadError::Storage("Storage engine lock poisoned".to_string()))
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a read against the engine, waiting out other threads' units of work.
    fn read<T>(&self, op: impl FnOnce(&mut E) -> Result<T>) -> Result<T> {
        let _scope = self.gate.enter();
        let mut engine = self.lock_engine()?;
        op(&mut *engine)
    }

    /// Run `work` as a unit of work.
    ///
    /// The outermost scope begins and commits (or rolls back) the engine
    /// transaction and, after releasing the gate, notifies observers when
    /// anything changed. Nested, a failed caller unit makes the enclosing
    /// transaction rollback-only; a failed operation does so only on a
    /// backend fault, since every other error is raised before it writes.
    fn transact<T>(&self, unit: Unit, work: impl FnOnce() -> Result<T>) -> Result<T> {
        let scope = self.gate.enter();

        if !scope.is_outermost() {
            let mut guard = UnitGuard::new(self, false);
            let result = work();
            match &result {
                Ok(_) => guard.finish(),
                Err(err) if unit == Unit::Operation && !err.is_backend_fault() => guard.finish(),
                Err(_) => {}
            }
            return result;
        }

        self.lock_engine()?.begin().map_err(|err| match err {
            NotePadError::Closed => NotePadError::Closed,
            other => NotePadError::TransactionFailure(format!("begin failed: {}", other)),
        })?;

        let mut guard = UnitGuard::new(self, true);
        let result = work();
        guard.finish();

        let (dirty, rollback_only) = self.gate.flags();
        let outcome = match result {
            Ok(value) if !rollback_only => match self.lock_engine().and_then(|mut e| e.commit()) {
                Ok(()) => Ok(value),
                Err(err) => {
                    self.rollback_quietly();
                    Err(NotePadError::TransactionFailure(format!(
                        "commit failed: {}",
                        err
                    )))
                }
            },
            Ok(_) => {
                self.rollback_quietly();
                Err(NotePadError::TransactionFailure(
                    "a nested unit of work failed".to_string(),
                ))
            }
            Err(err) => {
                self.rollback_quietly();
                Err(err)
            }
        };
        drop(scope);

        if outcome.is_ok() && dirty {
            self.notifier.post(Event::DataChanged);
        }
        outcome
    }

    fn rollback_quietly(&self) {
        debug!("rolling back unit of work");
        if let Err(err) = self.lock_engine().and_then(|mut e| e.rollback()) {
            error!(error = %err, "rollback failed");
        }
    }

    /// Run a mutation on the engine; `changed` reports whether it did anything.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut E) -> Result<T>,
        changed: impl FnOnce(&T) -> bool,
    ) -> Result<T> {
        self.transact(Unit::Operation, || {
            let mut engine = self.lock_engine()?;
            let value = op(&mut *engine)?;
            if changed(&value) {
                self.gate.mark_dirty();
            }
            Ok(value)
        })
    }

    fn count_or(&self, what: &str, fallback: u64, op: impl FnOnce(&mut E) -> Result<u64>) -> u64 {
        self.read(op).unwrap_or_else(|err| {
            error!(error = %err, count = what, fallback, "count failed");
            fallback
        })
    }

    fn count_note_rows(&self, filter: NoteFilter) -> u64 {
        self.count_or("notes", 0, |engine| engine.count_notes(&filter))
    }

    fn now_millis() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn require_category(engine: &mut E, id: i64) -> Result<()> {
        if engine.find_category(id)?.is_none() {
            return Err(NotePadError::InvalidArgument(format!(
                "Category {} does not exist",
                id
            )));
        }
        Ok(())
    }

    fn stored_note(engine: &mut E, id: i64) -> Result<NoteItem> {
        engine
            .find_note(id)?
            .ok_or_else(|| NotePadError::Storage(format!("Note {} vanished after write", id)))
    }

    fn insert_category_row(&self, id: Option<i64>, name: &str) -> Result<NoteCategory> {
        validate_name(name, "Category")?;
        self.mutate(
            |engine| {
                if let Some(id) = id {
                    if engine.find_category(id)?.is_some() {
                        return Err(NotePadError::DuplicateKey(format!("category id {}", id)));
                    }
                }
                if engine.find_category_by_name(name)?.is_some() {
                    return Err(NotePadError::DuplicateKey(format!("category name {}", name)));
                }
                let id = engine.insert_category(id, name)?;
                Ok(NoteCategory::new(id, name))
            },
            |_| true,
        )
    }
}

/// What a unit of work wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    /// A caller's `run_in_transaction` body
    Caller,
    /// One repository operation
    Operation,
}

/// Rolls back (outermost) or poisons (nested) a unit of work that did not
/// finish, including one unwinding from a panic.
struct UnitGuard<'a, E: StorageEngine> {
    repository: &'a Repository<E>,
    outermost: bool,
    finished: bool,
}

impl<'a, E: StorageEngine> UnitGuard<'a, E> {
    fn new(repository: &'a Repository<E>, outermost: bool) -> Self {
        Self {
            repository,
            outermost,
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

impl<E: StorageEngine> Drop for UnitGuard<'_, E> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if self.outermost {
            self.repository.rollback_quietly();
        } else {
            self.repository.gate.mark_rollback_only();
        }
    }
}

impl<E: StorageEngine> NoteRepository for Repository<E> {
    fn open(&self, owner: &str) -> Result<()> {
        let _scope = self.gate.enter();
        let mut sessions = self.sessions();
        if sessions.is_empty() {
            let mut engine = self.lock_engine()?;
            engine.connect()?;
            invariants::seed_unfiled(&mut *engine, &self.unfiled_name())?;
            debug!(owner, "repository connected");
        }
        *sessions.entry(owner.to_string()).or_insert(0) += 1;
        Ok(())
    }

    fn release(&self, owner: &str) -> Result<bool> {
        let closed = {
            let _scope = self.gate.enter();
            let mut sessions = self.sessions();
            match sessions.get_mut(owner) {
                None => {
                    warn!(owner, "release without a matching open");
                    return Ok(false);
                }
                Some(count) if *count > 1 => {
                    *count -= 1;
                    false
                }
                Some(_) => {
                    sessions.remove(owner);
                    if sessions.is_empty() {
                        self.lock_engine()?.disconnect()?;
                        debug!(owner, "repository disconnected");
                        true
                    } else {
                        false
                    }
                }
            }
        };
        if closed {
            self.notifier.post(Event::RepositoryClosed);
        }
        Ok(true)
    }

    fn is_open(&self) -> bool {
        !self.sessions().is_empty()
    }

    fn count_categories(&self) -> u64 {
        // Legacy contract: a failed category count reports "non-empty".
        self.count_or("categories", 1, |engine| engine.count_categories())
    }

    fn count_metadata(&self) -> u64 {
        self.count_or("metadata", 1, |engine| engine.count_metadata())
    }

    fn count_notes(&self) -> u64 {
        self.count_note_rows(NoteFilter::all())
    }

    fn count_notes_in_category(&self, category_id: i64) -> u64 {
        self.count_note_rows(NoteFilter {
            category: CategoryFilter::Only(category_id),
            ..NoteFilter::all()
        })
    }

    fn count_private_notes(&self) -> u64 {
        self.count_note_rows(NoteFilter::all().with_min_privacy(PrivacyLevel::Private))
    }

    fn count_encrypted_notes(&self) -> u64 {
        self.count_note_rows(NoteFilter::all().with_min_privacy(PrivacyLevel::Encrypted))
    }

    fn get_categories(&self) -> Result<Vec<NoteCategory>> {
        self.read(|engine| engine.list_categories())
    }

    fn get_category_by_id(&self, id: i64) -> Result<Option<NoteCategory>> {
        self.read(|engine| engine.find_category(id))
    }

    fn get_category_by_name(&self, name: &str) -> Result<Option<NoteCategory>> {
        self.read(|engine| engine.find_category_by_name(name))
    }

    fn insert_category(&self, name: &str) -> Result<NoteCategory> {
        self.insert_category_row(None, name)
    }

    fn insert_category_with_id(&self, category: &NoteCategory) -> Result<NoteCategory> {
        self.insert_category_row(Some(category.id), &category.name)
    }

    fn update_category(&self, id: i64, name: &str) -> Result<NoteCategory> {
        validate_name(name, "Category")?;
        let target = invariants::rename_target(id, name, self.unfiled_name());
        self.mutate(
            |engine| {
                let existing = engine
                    .find_category(id)?
                    .ok_or_else(|| NotePadError::NotFound(format!("category {}", id)))?;
                if existing.name == target {
                    return Ok((existing, false));
                }
                if let Some(other) = engine.find_category_by_name(&target)? {
                    if other.id != id {
                        return Err(NotePadError::DuplicateKey(format!(
                            "category name {}",
                            target
                        )));
                    }
                }
                engine.rename_category(id, &target)?;
                Ok((NoteCategory::new(id, target.clone()), true))
            },
            |(_, changed)| *changed,
        )
        .map(|(category, _)| category)
    }

    fn delete_category(&self, id: i64) -> Result<bool> {
        invariants::ensure_deletable(id)?;
        self.mutate(
            |engine| invariants::reassign_and_delete(engine, id),
            |deleted| *deleted,
        )
    }

    fn delete_all_categories(&self) -> Result<bool> {
        self.mutate(
            |engine| {
                let mut deleted = false;
                for category in engine.list_categories()? {
                    if category.is_unfiled() {
                        continue;
                    }
                    deleted |= invariants::reassign_and_delete(engine, category.id)?;
                }
                Ok(deleted)
            },
            |deleted| *deleted,
        )
    }

    fn get_metadata(&self, name: &str) -> Result<Option<NoteMetadata>> {
        self.read(|engine| engine.find_metadata(name))
    }

    fn get_metadata_names(&self) -> Result<Vec<String>> {
        self.read(|engine| engine.metadata_names())
    }

    fn upsert_metadata(&self, name: &str, value: &[u8]) -> Result<NoteMetadata> {
        validate_name(name, "Metadata")?;
        self.mutate(
            |engine| {
                let id = engine.upsert_metadata(name, value)?;
                Ok(NoteMetadata {
                    id: Some(id),
                    name: name.to_string(),
                    value: value.to_vec(),
                })
            },
            |_| true,
        )
    }

    fn delete_metadata(&self, name: &str) -> Result<bool> {
        self.mutate(|engine| engine.delete_metadata(name), |deleted| *deleted)
    }

    fn delete_metadata_by_id(&self, id: i64) -> Result<bool> {
        self.mutate(|engine| engine.delete_metadata_by_id(id), |deleted| *deleted)
    }

    fn delete_all_metadata(&self) -> Result<bool> {
        self.mutate(|engine| engine.delete_all_metadata(), |count| *count > 0)
            .map(|count| count > 0)
    }

    fn get_notes(
        &self,
        category: CategoryFilter,
        include_private: bool,
        include_encrypted: bool,
        order: &SortOrder,
    ) -> Result<NoteCursor> {
        let filter = NoteFilter::visible(category, include_private, include_encrypted);
        let mut rows = self.read(|engine| engine.list_notes(&filter))?;
        order.sort(&mut rows);
        Ok(NoteCursor::new(rows))
    }

    fn get_private_note_ids(&self) -> Result<Vec<i64>> {
        let filter = NoteFilter::all().with_min_privacy(PrivacyLevel::Private);
        let rows = self.read(|engine| engine.list_notes(&filter))?;
        let mut ids: Vec<i64> = rows.into_iter().filter_map(|note| note.id).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn get_note_by_id(&self, id: i64) -> Result<Option<NoteItem>> {
        self.read(|engine| engine.find_note(id))
    }

    fn insert_note(&self, note: &NoteItem) -> Result<NoteItem> {
        validate_content(note)?;
        let stamped = stamp_new(note, Self::now_millis())?;
        self.mutate(
            |engine| {
                if let Some(id) = stamped.id {
                    if engine.find_note(id)?.is_some() {
                        return Err(NotePadError::DuplicateKey(format!("note id {}", id)));
                    }
                }
                Self::require_category(engine, stamped.category_id)?;
                let id = engine.insert_note(&stamped)?;
                Self::stored_note(engine, id)
            },
            |_| true,
        )
    }

    fn update_note(&self, note: &NoteItem) -> Result<NoteItem> {
        let id = note.id.ok_or_else(|| {
            NotePadError::InvalidArgument("Cannot update a note without an id".to_string())
        })?;
        validate_content(note)?;
        let now = Self::now_millis();
        self.mutate(
            |engine| {
                let stored = engine
                    .find_note(id)?
                    .ok_or_else(|| NotePadError::NotFound(format!("note {}", id)))?;
                let stamped = stamp_update(note, &stored, now)?;
                Self::require_category(engine, stamped.category_id)?;
                engine.update_note(&stamped)?;
                Self::stored_note(engine, id)
            },
            |_| true,
        )
    }

    fn delete_note(&self, id: i64) -> Result<bool> {
        self.mutate(|engine| engine.delete_note(id), |deleted| *deleted)
    }

    fn delete_all_notes(&self) -> Result<bool> {
        self.mutate(|engine| engine.delete_all_notes(), |count| *count > 0)
            .map(|count| count > 0)
    }

    fn run_in_transaction(&self, work: &mut dyn FnMut() -> Result<()>) -> Result<()> {
        self.transact(Unit::Caller, work)
    }

    fn register_observer(&self, observer: Arc<dyn NotePadObserver>) {
        self.notifier.register(observer);
    }

    fn unregister_observer(&self, observer: &Arc<dyn NotePadObserver>) -> bool {
        self.notifier.unregister(observer)
    }

    fn attach_dispatcher(&self, dispatcher: Arc<dyn Dispatcher>) {
        self.notifier.attach(dispatcher);
    }

    fn detach_dispatcher(&self) -> bool {
        self.notifier.detach()
    }
}

impl<E: StorageEngine> Drop for Repository<E> {
    fn drop(&mut self) {
        let open = self.session_count();
        if open > 0 {
            warn!(open, "repository dropped with open sessions");
        }
    }
}
