//! SQLite storage engine.
//!
//! Three tables (`category`, `misc`, `notes`) in one database file. The
//! engine opens the connection on [`StorageEngine::connect`] and closes it on
//! disconnect; the repository decides when that happens.

mod row;

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};

use crate::error::{NotePadError, Result};
use crate::storage::traits::{next_row_id, StorageEngine};
use crate::storage::types::{CategoryFilter, NoteCategory, NoteFilter, NoteItem, NoteMetadata};

use row::{content_value, NoteRow, NOTE_COLUMNS};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS category (
        _id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS misc (
        _id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        value BLOB
    );
    CREATE TABLE IF NOT EXISTS notes (
        _id INTEGER PRIMARY KEY,
        created INTEGER,
        modified INTEGER,
        private INTEGER NOT NULL DEFAULT 0,
        category_id INTEGER NOT NULL DEFAULT 0,
        note
    );
"#;

/// Where the database lives.
#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    /// Private in-memory database; its contents end with the connection
    Memory,
}

/// SQLite storage engine.
pub struct SqliteEngine {
    location: Location,
    conn: Option<Connection>,
}

impl SqliteEngine {
    /// An engine for the database file at `path`, created on first connect.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: None,
        }
    }

    /// An engine for a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: None,
        }
    }

    /// Path of the database file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            Location::File(path) => Some(path),
            Location::Memory => None,
        }
    }

    fn conn(&self) -> Result<&Connection> {
        self.conn.as_ref().ok_or(NotePadError::Closed)
    }

    /// Explicit id, or the next one for `table`.
    ///
    /// Allocated here rather than left to SQLite, which falls back to a
    /// random free rowid once the largest rowid is taken.
    fn row_id(conn: &Connection, table: &str, id: Option<i64>) -> Result<i64> {
        if let Some(id) = id {
            return Ok(id);
        }
        let max: Option<i64> =
            conn.query_row(&format!("SELECT MAX(_id) FROM {}", table), [], |row| row.get(0))?;
        next_row_id(max)
    }

    fn category_filter(filter: &NoteFilter) -> Option<i64> {
        match filter.category {
            CategoryFilter::All => None,
            CategoryFilter::Only(id) => Some(id),
        }
    }
}

impl StorageEngine for SqliteEngine {
    fn connect(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Ok(());
        }

        let conn = match &self.location {
            Location::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                Connection::open(path)?
            }
            Location::Memory => Connection::open_in_memory()?,
        };
        conn.execute_batch(SCHEMA)?;
        debug!(location = ?self.location, "sqlite connected");

        self.conn = Some(conn);
        Ok(())
    }

    fn disconnect(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().map_err(|(_, err)| NotePadError::from(err))?;
            debug!(location = ?self.location, "sqlite disconnected");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    fn begin(&mut self) -> Result<()> {
        self.conn()?.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn()?.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        let conn = self.conn()?;
        if !conn.is_autocommit() {
            conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    fn count_categories(&mut self) -> Result<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM category", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn list_categories(&mut self) -> Result<Vec<NoteCategory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT _id, name FROM category ORDER BY name")?;
        let rows = stmt.query_map([], |row| Ok(NoteCategory::new(row.get(0)?, row.get::<_, String>(1)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn find_category(&mut self, id: i64) -> Result<Option<NoteCategory>> {
        let category = self
            .conn()?
            .query_row(
                "SELECT _id, name FROM category WHERE _id = ?1",
                [id],
                |row| Ok(NoteCategory::new(row.get(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(category)
    }

    fn find_category_by_name(&mut self, name: &str) -> Result<Option<NoteCategory>> {
        let category = self
            .conn()?
            .query_row(
                "SELECT _id, name FROM category WHERE name = ?1",
                [name],
                |row| Ok(NoteCategory::new(row.get(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(category)
    }

    fn insert_category(&mut self, id: Option<i64>, name: &str) -> Result<i64> {
        let conn = self.conn()?;
        let id = Self::row_id(conn, "category", id)?;
        conn.execute(
            "INSERT INTO category (_id, name) VALUES (?1, ?2)",
            params![id, name],
        )
        .map_err(|e| NotePadError::from_constraint(e, &format!("category {}", name)))?;
        Ok(id)
    }

    fn rename_category(&mut self, id: i64, name: &str) -> Result<bool> {
        let changed = self
            .conn()?
            .execute(
                "UPDATE category SET name = ?2 WHERE _id = ?1",
                params![id, name],
            )
            .map_err(|e| NotePadError::from_constraint(e, &format!("category name {}", name)))?;
        Ok(changed > 0)
    }

    fn delete_category(&mut self, id: i64) -> Result<bool> {
        let changed = self
            .conn()?
            .execute("DELETE FROM category WHERE _id = ?1", [id])?;
        Ok(changed > 0)
    }

    fn reassign_notes(&mut self, from: i64, to: i64) -> Result<u64> {
        let changed = self.conn()?.execute(
            "UPDATE notes SET category_id = ?2 WHERE category_id = ?1",
            params![from, to],
        )?;
        Ok(changed as u64)
    }

    fn count_metadata(&mut self) -> Result<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM misc", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn find_metadata(&mut self, name: &str) -> Result<Option<NoteMetadata>> {
        let metadata = self
            .conn()?
            .query_row(
                "SELECT _id, name, value FROM misc WHERE name = ?1",
                [name],
                |row| {
                    Ok(NoteMetadata {
                        id: Some(row.get(0)?),
                        name: row.get(1)?,
                        value: row.get::<_, Option<Vec<u8>>>(2)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(metadata)
    }

    fn metadata_names(&mut self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT name FROM misc ORDER BY name")?;
        let names = stmt.query_map([], |row| row.get(0))?;
        Ok(names.collect::<rusqlite::Result<Vec<String>>>()?)
    }

    fn upsert_metadata(&mut self, name: &str, value: &[u8]) -> Result<i64> {
        let conn = self.conn()?;
        let existing: Option<i64> = conn
            .query_row("SELECT _id FROM misc WHERE name = ?1", [name], |row| row.get(0))
            .optional()?;
        if let Some(id) = existing {
            conn.execute("UPDATE misc SET value = ?1 WHERE _id = ?2", params![value, id])?;
            return Ok(id);
        }
        let id = Self::row_id(conn, "misc", None)?;
        conn.execute(
            "INSERT INTO misc (_id, name, value) VALUES (?1, ?2, ?3)",
            params![id, name, value],
        )?;
        Ok(id)
    }

    fn delete_metadata(&mut self, name: &str) -> Result<bool> {
        let changed = self
            .conn()?
            .execute("DELETE FROM misc WHERE name = ?1", [name])?;
        Ok(changed > 0)
    }

    fn delete_metadata_by_id(&mut self, id: i64) -> Result<bool> {
        let changed = self.conn()?.execute("DELETE FROM misc WHERE _id = ?1", [id])?;
        Ok(changed > 0)
    }

    fn delete_all_metadata(&mut self) -> Result<u64> {
        let changed = self.conn()?.execute("DELETE FROM misc", [])?;
        Ok(changed as u64)
    }

    fn count_notes(&mut self, filter: &NoteFilter) -> Result<u64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM notes n
             WHERE n.private BETWEEN ?1 AND ?2 AND (?3 IS NULL OR n.category_id = ?3)",
            params![
                filter.min_privacy.as_i64(),
                filter.max_privacy.as_i64(),
                Self::category_filter(filter)
            ],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn list_notes(&mut self, filter: &NoteFilter) -> Result<Vec<NoteItem>> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {} FROM notes n LEFT JOIN category c ON c._id = n.category_id
             WHERE n.private BETWEEN ?1 AND ?2 AND (?3 IS NULL OR n.category_id = ?3)
             ORDER BY n._id",
            NOTE_COLUMNS
        );
        let mut stmt = conn.prepare(&query)?;
        let rows = stmt.query_map(
            params![
                filter.min_privacy.as_i64(),
                filter.max_privacy.as_i64(),
                Self::category_filter(filter)
            ],
            NoteRow::from_row,
        )?;

        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?.try_into()?);
        }
        Ok(notes)
    }

    fn find_note(&mut self, id: i64) -> Result<Option<NoteItem>> {
        let query = format!(
            "SELECT {} FROM notes n LEFT JOIN category c ON c._id = n.category_id
             WHERE n._id = ?1",
            NOTE_COLUMNS
        );
        let row = self
            .conn()?
            .query_row(&query, [id], NoteRow::from_row)
            .optional()?;
        row.map(NoteItem::try_from).transpose()
    }

    fn insert_note(&mut self, note: &NoteItem) -> Result<i64> {
        let conn = self.conn()?;
        let id = Self::row_id(conn, "notes", note.id)?;
        conn.execute(
            "INSERT INTO notes (_id, created, modified, private, category_id, note)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                note.created,
                note.modified,
                note.privacy.as_i64(),
                note.category_id,
                content_value(note)
            ],
        )
        .map_err(|e| NotePadError::from_constraint(e, "note id"))?;
        Ok(id)
    }

    fn update_note(&mut self, note: &NoteItem) -> Result<bool> {
        let changed = self.conn()?.execute(
            "UPDATE notes
             SET created = ?2, modified = ?3, private = ?4, category_id = ?5, note = ?6
             WHERE _id = ?1",
            params![
                note.id,
                note.created,
                note.modified,
                note.privacy.as_i64(),
                note.category_id,
                content_value(note)
            ],
        )?;
        Ok(changed > 0)
    }

    fn delete_note(&mut self, id: i64) -> Result<bool> {
        let changed = self.conn()?.execute("DELETE FROM notes WHERE _id = ?1", [id])?;
        Ok(changed > 0)
    }

    fn delete_all_notes(&mut self) -> Result<u64> {
        let changed = self.conn()?.execute("DELETE FROM notes", [])?;
        Ok(changed as u64)
    }
}

impl Drop for SqliteEngine {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            warn!(error = %err, "failed to close sqlite connection");
        }
    }
}
