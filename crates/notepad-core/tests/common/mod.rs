//! Shared fixtures and the repository contract suite.
//!
//! Every `check_*` function takes a freshly opened repository and is run
//! against each engine by the `contract_suite!` macro.

#![allow(dead_code, unused_macros)]

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use notepad_core::storage::{
    transaction, CategoryFilter, ImmediateDispatcher, MemoryEngine, NoteCategory, NoteItem,
    NotePadObserver, NoteRepository, PrivacyLevel, Repository, SortOrder, SqliteEngine,
};
use notepad_core::NotePadError;
use tempfile::TempDir;

pub const OWNER: &str = "contract";

/// An opened repository plus whatever keeps its backing store alive.
pub struct Fixture {
    pub repository: Arc<dyn NoteRepository>,
    _dir: Option<TempDir>,
}

impl Drop for Fixture {
    fn drop(&mut self) {
        let _ = self.repository.release(OWNER);
    }
}

fn open(repository: Arc<dyn NoteRepository>, dir: Option<TempDir>) -> Fixture {
    repository.attach_dispatcher(Arc::new(ImmediateDispatcher));
    repository.open(OWNER).expect("open should succeed");
    Fixture {
        repository,
        _dir: dir,
    }
}

pub fn memory() -> Fixture {
    open(Arc::new(Repository::new(MemoryEngine::new())), None)
}

pub fn sqlite() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let engine = SqliteEngine::new(dir.path().join("notes.db"));
    open(Arc::new(Repository::new(engine)), Some(dir))
}

/// Counts change notifications.
#[derive(Default)]
pub struct Counter {
    pub changed: AtomicUsize,
    pub closed: AtomicUsize,
}

impl Counter {
    pub fn changes(&self) -> usize {
        self.changed.load(Ordering::SeqCst)
    }
}

impl NotePadObserver for Counter {
    fn on_data_changed(&self) {
        self.changed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_repository_closed(&self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn dated(privacy: PrivacyLevel, text: &str, created: i64, modified: i64) -> NoteItem {
    let mut note = NoteItem::new(privacy, text);
    note.created = Some(created);
    note.modified = Some(modified);
    note
}

pub fn list(repository: &dyn NoteRepository, order: &str) -> Vec<NoteItem> {
    let order: SortOrder = order.parse().expect("sort spec should parse");
    repository
        .get_notes(CategoryFilter::All, true, true, &order)
        .expect("get_notes should succeed")
        .into_rows()
}

pub fn ids(notes: &[NoteItem]) -> Vec<i64> {
    notes.iter().filter_map(|note| note.id).collect()
}

/// Everything a repository holds, for before/after comparisons.
#[derive(Debug, PartialEq)]
pub struct Snapshot {
    pub categories: Vec<NoteCategory>,
    pub metadata: Vec<(String, Vec<u8>)>,
    pub notes: Vec<NoteItem>,
}

pub fn snapshot(repository: &dyn NoteRepository) -> Snapshot {
    let metadata = repository
        .get_metadata_names()
        .expect("metadata names should load")
        .into_iter()
        .map(|name| {
            let value = repository
                .get_metadata(&name)
                .expect("metadata should load")
                .map(|m| m.value)
                .unwrap_or_default();
            (name, value)
        })
        .collect();
    Snapshot {
        categories: repository.get_categories().expect("categories should load"),
        metadata,
        notes: list(repository, ""),
    }
}

// --- Contract checks ---

pub fn check_unfiled_seeded(repository: &dyn NoteRepository) {
    assert_eq!(repository.count_categories(), 1);
    let unfiled = repository
        .get_category_by_id(0)
        .expect("lookup should succeed")
        .expect("Unfiled should exist");
    assert_eq!(unfiled.name, "Unfiled");
    assert!(unfiled.is_unfiled());
}

pub fn check_category_crud(repository: &dyn NoteRepository) {
    let work = repository.insert_category("Work").expect("insert Work");
    let home = repository.insert_category("Home").expect("insert Home");
    assert_eq!(work.id, 1);
    assert_eq!(home.id, 2);

    let names: Vec<String> = repository
        .get_categories()
        .expect("categories should load")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Home", "Unfiled", "Work"]);

    assert!(matches!(
        repository.insert_category("Work"),
        Err(NotePadError::DuplicateKey(_))
    ));
    assert!(matches!(
        repository.insert_category_with_id(&NoteCategory::new(1, "Other")),
        Err(NotePadError::DuplicateKey(_))
    ));
    assert!(matches!(
        repository.insert_category("   "),
        Err(NotePadError::InvalidArgument(_))
    ));

    let explicit = repository
        .insert_category_with_id(&NoteCategory::new(40, "Travel"))
        .expect("explicit id insert");
    assert_eq!(explicit.id, 40);
    assert_eq!(repository.insert_category("Next").expect("insert").id, 41);

    let renamed = repository.update_category(work.id, "Job").expect("rename");
    assert_eq!(renamed.name, "Job");
    assert!(matches!(
        repository.update_category(work.id, "Home"),
        Err(NotePadError::DuplicateKey(_))
    ));
    assert!(matches!(
        repository.update_category(999, "Ghost"),
        Err(NotePadError::NotFound(_))
    ));

    let unfiled = repository.update_category(0, "Misc").expect("rename Unfiled");
    assert_eq!(unfiled.name, "Unfiled");
    assert_eq!(
        repository
            .get_category_by_name("Job")
            .expect("lookup")
            .map(|c| c.id),
        Some(work.id)
    );
}

pub fn check_delete_category_reassigns(repository: &dyn NoteRepository) {
    let work = repository.insert_category("Work").expect("insert Work");
    let note = repository
        .insert_note(&NoteItem::new(PrivacyLevel::Public, "standup").in_category(work.id))
        .expect("insert note");
    assert_eq!(note.category_name.as_deref(), Some("Work"));
    assert_eq!(repository.count_notes_in_category(work.id), 1);

    assert!(repository.delete_category(work.id).expect("delete Work"));
    let moved = repository
        .get_note_by_id(note.id.expect("id"))
        .expect("lookup")
        .expect("note survives");
    assert_eq!(moved.category_id, 0);
    assert_eq!(moved.category_name.as_deref(), Some("Unfiled"));
    assert!(!repository.delete_category(work.id).expect("second delete"));

    assert!(matches!(
        repository.delete_category(0),
        Err(NotePadError::InvalidArgument(_))
    ));

    let a = repository.insert_category("A").expect("insert A");
    let b = repository.insert_category("B").expect("insert B");
    for (category, text) in [(a.id, "a1"), (a.id, "a2"), (b.id, "b1")] {
        repository
            .insert_note(&NoteItem::new(PrivacyLevel::Private, text).in_category(category))
            .expect("insert note");
    }
    assert!(repository.delete_all_categories().expect("delete all"));
    assert_eq!(repository.count_categories(), 1);
    assert_eq!(repository.count_notes_in_category(0), 4);
    assert!(!repository.delete_all_categories().expect("nothing left"));
}

pub fn check_metadata(repository: &dyn NoteRepository) {
    assert_eq!(repository.count_metadata(), 0);
    let first = repository.upsert_metadata("zeta", b"1").expect("upsert");
    let again = repository.upsert_metadata("zeta", b"2").expect("upsert again");
    assert_eq!(first.id, again.id);
    repository.upsert_metadata("alpha", &[]).expect("upsert alpha");

    assert_eq!(
        repository.get_metadata_names().expect("names"),
        vec!["alpha", "zeta"]
    );
    assert_eq!(
        repository.get_metadata("zeta").expect("get").map(|m| m.value),
        Some(b"2".to_vec())
    );
    assert!(matches!(
        repository.upsert_metadata("", b"x"),
        Err(NotePadError::InvalidArgument(_))
    ));

    assert!(repository.delete_metadata("alpha").expect("delete"));
    assert!(!repository.delete_metadata("alpha").expect("delete again"));
    let id = again.id.expect("id");
    assert!(repository.delete_metadata_by_id(id).expect("delete by id"));
    assert!(!repository.delete_all_metadata().expect("already empty"));

    repository.upsert_metadata("x", b"1").expect("upsert");
    assert!(repository.delete_all_metadata().expect("delete all"));
    assert_eq!(repository.count_metadata(), 0);
}

pub fn check_note_insert_and_update(repository: &dyn NoteRepository) {
    let stored = repository
        .insert_note(&NoteItem::new(PrivacyLevel::Public, "first"))
        .expect("insert");
    let created = stored.created.expect("created stamped");
    assert_eq!(stored.modified, Some(created));
    assert_eq!(stored.id, Some(1));

    let explicit = repository
        .insert_note(&dated(PrivacyLevel::Private, "dated", 100, 200))
        .expect("insert dated");
    assert_eq!(explicit.created, Some(100));
    assert_eq!(explicit.modified, Some(200));

    let mut with_id = NoteItem::new(PrivacyLevel::Public, "pinned");
    with_id.id = Some(50);
    assert_eq!(repository.insert_note(&with_id).expect("insert").id, Some(50));
    assert!(matches!(
        repository.insert_note(&with_id),
        Err(NotePadError::DuplicateKey(_))
    ));

    assert!(matches!(
        repository.insert_note(&NoteItem::new(PrivacyLevel::Public, "x").in_category(77)),
        Err(NotePadError::InvalidArgument(_))
    ));
    assert!(matches!(
        repository.insert_note(&NoteItem::new(PrivacyLevel::Encrypted, "plain")),
        Err(NotePadError::InvalidArgument(_))
    ));
    assert!(matches!(
        repository.insert_note(&dated(PrivacyLevel::Public, "x", 10, 5)),
        Err(NotePadError::InvalidArgument(_))
    ));

    let mut edit = explicit.clone();
    edit.content = Some(notepad_core::storage::NoteContent::Text("edited".into()));
    edit.created = None;
    edit.modified = None;
    let updated = repository.update_note(&edit).expect("update");
    assert_eq!(updated.text(), Some("edited"));
    assert_eq!(updated.created, Some(100));
    assert!(updated.modified.expect("modified") >= 200);

    let mut ghost = NoteItem::new(PrivacyLevel::Public, "ghost");
    ghost.id = Some(9_999);
    assert!(matches!(
        repository.update_note(&ghost),
        Err(NotePadError::NotFound(_))
    ));
    assert!(matches!(
        repository.update_note(&NoteItem::new(PrivacyLevel::Public, "no id")),
        Err(NotePadError::InvalidArgument(_))
    ));

    assert!(repository.delete_note(50).expect("delete"));
    assert!(!repository.delete_note(50).expect("delete again"));
    assert!(repository.delete_all_notes().expect("delete all"));
    assert!(!repository.delete_all_notes().expect("nothing left"));
    assert_eq!(repository.count_notes(), 0);
}

pub fn check_visibility(repository: &dyn NoteRepository) {
    let work = repository.insert_category("Work").expect("insert Work");
    repository
        .insert_note(&NoteItem::new(PrivacyLevel::Public, "public"))
        .expect("insert");
    repository
        .insert_note(&NoteItem::new(PrivacyLevel::Private, "private").in_category(work.id))
        .expect("insert");
    repository
        .insert_note(&NoteItem::encrypted(vec![1, 2, 3]).in_category(work.id))
        .expect("insert");

    let order = SortOrder::default();
    let count = |category, private, encrypted| {
        repository
            .get_notes(category, private, encrypted, &order)
            .expect("get_notes")
            .len()
    };
    assert_eq!(count(CategoryFilter::All, false, false), 1);
    assert_eq!(count(CategoryFilter::All, false, true), 1);
    assert_eq!(count(CategoryFilter::All, true, false), 2);
    assert_eq!(count(CategoryFilter::All, true, true), 3);
    assert_eq!(count(CategoryFilter::Only(work.id), true, true), 2);
    assert_eq!(count(CategoryFilter::Only(0), true, true), 1);

    assert_eq!(repository.count_notes(), 3);
    assert_eq!(repository.count_private_notes(), 2);
    assert_eq!(repository.count_encrypted_notes(), 1);
    assert_eq!(repository.get_private_note_ids().expect("ids"), vec![2, 3]);
}

pub fn check_sorting(repository: &dyn NoteRepository) {
    let b = repository.insert_category("beta").expect("insert");
    let a = repository.insert_category("Alpha").expect("insert");
    repository
        .insert_note(&dated(PrivacyLevel::Public, "n1", 30, 30).in_category(b.id))
        .expect("insert");
    repository
        .insert_note(&dated(PrivacyLevel::Private, "n2", 10, 50).in_category(a.id))
        .expect("insert");
    repository
        .insert_note(&dated(PrivacyLevel::Public, "n3", 30, 40).in_category(a.id))
        .expect("insert");
    repository
        .insert_note(&dated(PrivacyLevel::Public, "n4", 20, 20))
        .expect("insert");

    assert_eq!(ids(&list(repository, "")), vec![1, 2, 3, 4]);
    assert_eq!(ids(&list(repository, "created")), vec![2, 4, 1, 3]);
    assert_eq!(ids(&list(repository, "created desc")), vec![1, 3, 4, 2]);
    assert_eq!(
        ids(&list(repository, "created DESC, modified descending")),
        vec![3, 1, 4, 2]
    );
    assert_eq!(ids(&list(repository, "modified desc")), vec![2, 3, 1, 4]);
    // "Alpha" < "Unfiled" < "beta" by bytes; lowercased it is alpha, beta, unfiled
    assert_eq!(ids(&list(repository, "category, _id desc")), vec![3, 2, 4, 1]);
    assert_eq!(ids(&list(repository, "lower(category)")), vec![2, 3, 1, 4]);
    assert_eq!(ids(&list(repository, "private desc, note")), vec![2, 1, 3, 4]);

    assert!(matches!(
        "colour".parse::<SortOrder>(),
        Err(NotePadError::InvalidSortField(_))
    ));
    assert!(matches!(
        "created sideways".parse::<SortOrder>(),
        Err(NotePadError::InvalidSortDirection(_))
    ));
}

pub fn check_cursor(repository: &dyn NoteRepository) {
    for text in ["a", "b", "c"] {
        repository
            .insert_note(&NoteItem::new(PrivacyLevel::Public, text))
            .expect("insert");
    }
    let order: SortOrder = "note desc".parse().expect("parse");
    let mut cursor = repository
        .get_notes(CategoryFilter::All, false, false, &order)
        .expect("get_notes");
    assert_eq!(cursor.len(), 3);
    assert!(cursor.current().is_err());
    assert!(cursor.move_to_first());
    assert_eq!(cursor.current().expect("row").text(), Some("c"));
    assert!(cursor.move_to_last());
    assert_eq!(cursor.current().expect("row").text(), Some("a"));
    assert!(!cursor.move_to_next());
    assert!(cursor.move_to_previous());
    assert_eq!(cursor.get(0).expect("row").text(), Some("c"));
    cursor.close();
    assert!(matches!(cursor.get(0), Err(NotePadError::Closed)));
}

pub fn check_rollback_identity(repository: &dyn NoteRepository) {
    let work = repository.insert_category("Work").expect("insert");
    repository.upsert_metadata("k", b"v").expect("upsert");
    repository
        .insert_note(&NoteItem::new(PrivacyLevel::Private, "keep").in_category(work.id))
        .expect("insert");
    let before = snapshot(repository);

    let counter = Arc::new(Counter::default());
    repository.register_observer(counter.clone());

    let result = repository.run_in_transaction(&mut || {
        repository.insert_category("Temp")?;
        repository.upsert_metadata("k", b"changed")?;
        repository.delete_category(work.id)?;
        repository.insert_note(&NoteItem::new(PrivacyLevel::Public, "gone"))?;
        repository.delete_all_metadata()?;
        Err(NotePadError::InvalidArgument("abort".into()))
    });
    assert!(matches!(result, Err(NotePadError::InvalidArgument(_))));
    assert_eq!(snapshot(repository), before);

    let panicked = catch_unwind(AssertUnwindSafe(|| {
        let _ = repository.run_in_transaction(&mut || {
            repository.delete_all_notes()?;
            panic!("unit of work blew up");
        });
    }));
    assert!(panicked.is_err());
    assert_eq!(snapshot(repository), before);
    assert_eq!(counter.changes(), 0);
}

pub fn check_caught_error_keeps_transaction(repository: &dyn NoteRepository) {
    repository.insert_category("Work").expect("insert");
    let counter = Arc::new(Counter::default());
    repository.register_observer(counter.clone());

    let result = repository.run_in_transaction(&mut || {
        repository.insert_note(&NoteItem::new(PrivacyLevel::Public, "kept"))?;
        match repository.insert_category("Work") {
            Err(NotePadError::DuplicateKey(_)) => {}
            other => panic!("expected a duplicate key, got {:?}", other),
        }
        match repository.update_note(&NoteItem {
            id: Some(404),
            ..NoteItem::new(PrivacyLevel::Public, "missing")
        }) {
            Err(NotePadError::NotFound(_)) => {}
            other => panic!("expected not found, got {:?}", other),
        }
        Ok(())
    });

    result.expect("transaction should commit after a handled error");
    let texts: Vec<_> = list(repository, "")
        .iter()
        .filter_map(|note| note.text().map(str::to_string))
        .collect();
    assert_eq!(texts, vec!["kept".to_string()]);
    assert_eq!(counter.changes(), 1);
}

pub fn check_id_space_exhausted(repository: &dyn NoteRepository) {
    let max = repository
        .insert_category_with_id(&NoteCategory::new(i64::MAX, "Max"))
        .expect("insert at the largest id");
    assert_eq!(max.id, i64::MAX);
    assert!(matches!(
        repository.insert_category("Next"),
        Err(NotePadError::Storage(_))
    ));

    let mut last = NoteItem::new(PrivacyLevel::Public, "last");
    last.id = Some(i64::MAX);
    repository.insert_note(&last).expect("insert at the largest id");
    assert!(matches!(
        repository.insert_note(&NoteItem::new(PrivacyLevel::Public, "overflow")),
        Err(NotePadError::Storage(_))
    ));

    assert_eq!(repository.count_categories(), 2);
    assert_eq!(ids(&list(repository, "")), vec![i64::MAX]);
}

pub fn check_notification_once(repository: &dyn NoteRepository) {
    let counter = Arc::new(Counter::default());
    repository.register_observer(counter.clone());

    let created = transaction(repository, || {
        let work = repository.insert_category("Work")?;
        repository.run_in_transaction(&mut || {
            repository.insert_note(&NoteItem::new(PrivacyLevel::Public, "a").in_category(work.id))?;
            repository.insert_note(&NoteItem::new(PrivacyLevel::Public, "b"))?;
            Ok(())
        })?;
        Ok(work)
    })
    .expect("transaction should commit");
    assert_eq!(created.name, "Work");
    assert_eq!(counter.changes(), 1);

    repository.upsert_metadata("m", b"1").expect("upsert");
    assert_eq!(counter.changes(), 2);

    repository
        .run_in_transaction(&mut || Ok(()))
        .expect("empty unit");
    assert_eq!(counter.changes(), 2);

    let observer: Arc<dyn NotePadObserver> = counter.clone();
    assert!(repository.unregister_observer(&observer));
    repository.insert_category("Quiet").expect("insert");
    assert_eq!(counter.changes(), 2);
}

pub fn check_closed_after_release(repository: &dyn NoteRepository) {
    repository.open("second").expect("second session");
    assert!(repository.release("second").expect("release"));
    assert!(repository.is_open());
    assert!(!repository.release("stranger").expect("unknown owner"));
    repository.insert_category("Still open").expect("insert");
}

/// Instantiate every contract check for one fixture constructor.
macro_rules! contract_suite {
    ($engine:ident, $fixture:path) => {
        mod $engine {
            use super::common;

            fn run(check: fn(&dyn notepad_core::NoteRepository)) {
                let fixture = $fixture();
                check(fixture.repository.as_ref());
            }

            #[test]
            fn unfiled_seeded() {
                run(common::check_unfiled_seeded);
            }

            #[test]
            fn category_crud() {
                run(common::check_category_crud);
            }

            #[test]
            fn delete_category_reassigns() {
                run(common::check_delete_category_reassigns);
            }

            #[test]
            fn metadata() {
                run(common::check_metadata);
            }

            #[test]
            fn note_insert_and_update() {
                run(common::check_note_insert_and_update);
            }

            #[test]
            fn visibility() {
                run(common::check_visibility);
            }

            #[test]
            fn sorting() {
                run(common::check_sorting);
            }

            #[test]
            fn cursor() {
                run(common::check_cursor);
            }

            #[test]
            fn rollback_identity() {
                run(common::check_rollback_identity);
            }

            #[test]
            fn notification_once() {
                run(common::check_notification_once);
            }

            #[test]
            fn caught_error_keeps_transaction() {
                run(common::check_caught_error_keeps_transaction);
            }

            #[test]
            fn id_space_exhausted() {
                run(common::check_id_space_exhausted);
            }

            #[test]
            fn closed_after_release() {
                run(common::check_closed_after_release);
            }
        }
    };
}
