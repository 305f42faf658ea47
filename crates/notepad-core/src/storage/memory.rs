//! In-memory storage engine.
//!
//! Mirrors the SQLite engine row for row: same id allocation (largest id
//! plus one, starting at 1), same unique-name rules, same ordering of
//! listings. Tables survive disconnect/connect cycles for the lifetime of
//! the engine value.

use std::collections::BTreeMap;

use crate::error::{NotePadError, Result};
use crate::storage::traits::{next_row_id, StorageEngine};
use crate::storage::types::{NoteCategory, NoteFilter, NoteItem, NoteMetadata};

#[derive(Debug, Clone, Default)]
struct Tables {
    categories: BTreeMap<i64, String>,
    metadata: BTreeMap<i64, (String, Vec<u8>)>,
    notes: BTreeMap<i64, NoteItem>,
}

/// Storage engine keeping every table in memory.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    tables: Tables,
    // Copy of the tables taken at `begin`, restored on rollback
    snapshot: Option<Tables>,
    connected: bool,
}

fn next_id<V>(table: &BTreeMap<i64, V>) -> Result<i64> {
    next_row_id(table.keys().next_back().copied())
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&mut self) -> Result<&mut Tables> {
        if !self.connected {
            return Err(NotePadError::Closed);
        }
        Ok(&mut self.tables)
    }

    fn joined(tables: &Tables, id: i64, note: &NoteItem) -> NoteItem {
        NoteItem {
            id: Some(id),
            category_name: tables.categories.get(&note.category_id).cloned(),
            ..note.clone()
        }
    }

    fn metadata_id(tables: &Tables, name: &str) -> Option<i64> {
        tables
            .metadata
            .iter()
            .find(|(_, (key, _))| key == name)
            .map(|(id, _)| *id)
    }
}

impl StorageEngine for MemoryEngine {
    fn connect(&mut self) -> Result<()> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(snapshot) = self.snapshot.take() {
            self.tables = snapshot;
        }
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn begin(&mut self) -> Result<()> {
        let snapshot = self.tables()?.clone();
        if self.snapshot.is_some() {
            return Err(NotePadError::Storage(
                "cannot start a transaction within a transaction".to_string(),
            ));
        }
        self.snapshot = Some(snapshot);
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.tables()?;
        self.snapshot
            .take()
            .map(|_| ())
            .ok_or_else(|| NotePadError::Storage("no transaction is active".to_string()))
    }

    fn rollback(&mut self) -> Result<()> {
        self.tables()?;
        if let Some(snapshot) = self.snapshot.take() {
            self.tables = snapshot;
        }
        Ok(())
    }

    fn count_categories(&mut self) -> Result<u64> {
        Ok(self.tables()?.categories.len() as u64)
    }

    fn list_categories(&mut self) -> Result<Vec<NoteCategory>> {
        let mut categories: Vec<NoteCategory> = self
            .tables()?
            .categories
            .iter()
            .map(|(id, name)| NoteCategory::new(*id, name.clone()))
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    fn find_category(&mut self, id: i64) -> Result<Option<NoteCategory>> {
        Ok(self
            .tables()?
            .categories
            .get(&id)
            .map(|name| NoteCategory::new(id, name.clone())))
    }

    fn find_category_by_name(&mut self, name: &str) -> Result<Option<NoteCategory>> {
        Ok(self
            .tables()?
            .categories
            .iter()
            .find(|(_, existing)| existing.as_str() == name)
            .map(|(id, existing)| NoteCategory::new(*id, existing.clone())))
    }

    fn insert_category(&mut self, id: Option<i64>, name: &str) -> Result<i64> {
        let tables = self.tables()?;
        let id = match id {
            Some(id) => id,
            None => next_id(&tables.categories)?,
        };
        if tables.categories.contains_key(&id) || tables.categories.values().any(|n| n == name) {
            return Err(NotePadError::DuplicateKey(format!("category {}", name)));
        }
        tables.categories.insert(id, name.to_string());
        Ok(id)
    }

    fn rename_category(&mut self, id: i64, name: &str) -> Result<bool> {
        let tables = self.tables()?;
        if tables
            .categories
            .iter()
            .any(|(other, existing)| *other != id && existing == name)
        {
            return Err(NotePadError::DuplicateKey(format!("category name {}", name)));
        }
        match tables.categories.get_mut(&id) {
            Some(existing) => {
                *existing = name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_category(&mut self, id: i64) -> Result<bool> {
        Ok(self.tables()?.categories.remove(&id).is_some())
    }

    fn reassign_notes(&mut self, from: i64, to: i64) -> Result<u64> {
        let mut moved = 0;
        for note in self.tables()?.notes.values_mut() {
            if note.category_id == from {
                note.category_id = to;
                moved += 1;
            }
        }
        Ok(moved)
    }

    fn count_metadata(&mut self) -> Result<u64> {
        Ok(self.tables()?.metadata.len() as u64)
    }

    fn find_metadata(&mut self, name: &str) -> Result<Option<NoteMetadata>> {
        let tables = &*self.tables()?;
        Ok(Self::metadata_id(tables, name).and_then(|id| {
            tables.metadata.get(&id).map(|(name, value)| NoteMetadata {
                id: Some(id),
                name: name.clone(),
                value: value.clone(),
            })
        }))
    }

    fn metadata_names(&mut self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self
            .tables()?
            .metadata
            .values()
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn upsert_metadata(&mut self, name: &str, value: &[u8]) -> Result<i64> {
        let tables = self.tables()?;
        let id = match Self::metadata_id(tables, name) {
            Some(id) => id,
            None => next_id(&tables.metadata)?,
        };
        tables
            .metadata
            .insert(id, (name.to_string(), value.to_vec()));
        Ok(id)
    }

    fn delete_metadata(&mut self, name: &str) -> Result<bool> {
        let tables = self.tables()?;
        Ok(match Self::metadata_id(tables, name) {
            Some(id) => tables.metadata.remove(&id).is_some(),
            None => false,
        })
    }

    fn delete_metadata_by_id(&mut self, id: i64) -> Result<bool> {
        Ok(self.tables()?.metadata.remove(&id).is_some())
    }

    fn delete_all_metadata(&mut self) -> Result<u64> {
        let tables = self.tables()?;
        let count = tables.metadata.len() as u64;
        tables.metadata.clear();
        Ok(count)
    }

    fn count_notes(&mut self, filter: &NoteFilter) -> Result<u64> {
        Ok(self
            .tables()?
            .notes
            .values()
            .filter(|note| filter.matches(note))
            .count() as u64)
    }

    fn list_notes(&mut self, filter: &NoteFilter) -> Result<Vec<NoteItem>> {
        let tables = &*self.tables()?;
        Ok(tables
            .notes
            .iter()
            .filter(|(_, note)| filter.matches(note))
            .map(|(id, note)| Self::joined(tables, *id, note))
            .collect())
    }

    fn find_note(&mut self, id: i64) -> Result<Option<NoteItem>> {
        let tables = &*self.tables()?;
        Ok(tables
            .notes
            .get(&id)
            .map(|note| Self::joined(tables, id, note)))
    }

    fn insert_note(&mut self, note: &NoteItem) -> Result<i64> {
        let tables = self.tables()?;
        let id = match note.id {
            Some(id) => id,
            None => next_id(&tables.notes)?,
        };
        if tables.notes.contains_key(&id) {
            return Err(NotePadError::DuplicateKey("note id".to_string()));
        }
        tables.notes.insert(
            id,
            NoteItem {
                id: Some(id),
                category_name: None,
                ..note.clone()
            },
        );
        Ok(id)
    }

    fn update_note(&mut self, note: &NoteItem) -> Result<bool> {
        let Some(id) = note.id else {
            return Ok(false);
        };
        let tables = self.tables()?;
        match tables.notes.get_mut(&id) {
            Some(stored) => {
                *stored = NoteItem {
                    category_name: None,
                    ..note.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_note(&mut self, id: i64) -> Result<bool> {
        Ok(self.tables()?.notes.remove(&id).is_some())
    }

    fn delete_all_notes(&mut self) -> Result<u64> {
        let tables = self.tables()?;
        let count = tables.notes.len() as u64;
        tables.notes.clear();
        Ok(count)
    }
}
