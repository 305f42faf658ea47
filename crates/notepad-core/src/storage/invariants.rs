//! Rules of the reserved Unfiled category.
//!
//! Unfiled (id 0) always exists, always carries the localized name, cannot
//! be deleted, and receives the notes of every deleted category. These
//! helpers sit between the repository and its engine so the rules hold for
//! every backend.

use tracing::warn;

use crate::error::{NotePadError, Result};
use crate::storage::traits::StorageEngine;
use crate::storage::types::UNFILED_CATEGORY_ID;

/// Source of user-visible strings the repository stores.
pub trait LocalizedStrings: Send + Sync {
    /// Name of the reserved Unfiled category.
    fn unfiled_category(&self) -> String;
}

/// English defaults.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultStrings;

impl LocalizedStrings for DefaultStrings {
    fn unfiled_category(&self) -> String {
        "Unfiled".to_string()
    }
}

/// Strings fixed at construction, e.g. loaded from configuration.
#[derive(Debug, Clone)]
pub struct FixedStrings {
    pub unfiled: String,
}

impl LocalizedStrings for FixedStrings {
    fn unfiled_category(&self) -> String {
        self.unfiled.clone()
    }
}

/// Make sure Unfiled exists under its current localized name.
pub fn seed_unfiled<E: StorageEngine + ?Sized>(engine: &mut E, name: &str) -> Result<()> {
    match engine.find_category(UNFILED_CATEGORY_ID)? {
        None => {
            engine.insert_category(Some(UNFILED_CATEGORY_ID), name)?;
        }
        Some(existing) if existing.name != name => {
            if let Err(err) = engine.rename_category(UNFILED_CATEGORY_ID, name) {
                // A user category already holds the new name; keep the old one.
                warn!(error = %err, from = %existing.name, to = %name, "could not rename Unfiled category");
            }
        }
        Some(_) => {}
    }
    Ok(())
}

/// Fail for the reserved category.
pub fn ensure_deletable(id: i64) -> Result<()> {
    if id == UNFILED_CATEGORY_ID {
        return Err(NotePadError::InvalidArgument(
            "The Unfiled category cannot be deleted".to_string(),
        ));
    }
    Ok(())
}

/// The name a rename of `id` actually stores.
pub fn rename_target(id: i64, requested: &str, unfiled_name: String) -> String {
    if id == UNFILED_CATEGORY_ID {
        unfiled_name
    } else {
        requested.to_string()
    }
}

/// Move the notes of `id` to Unfiled, then delete it.
///
/// Callers run this inside a transaction.
pub fn reassign_and_delete<E: StorageEngine + ?Sized>(engine: &mut E, id: i64) -> Result<bool> {
    ensure_deletable(id)?;
    if engine.find_category(id)?.is_none() {
        return Ok(false);
    }
    engine.reassign_notes(id, UNFILED_CATEGORY_ID)?;
    engine.delete_category(id)
}
