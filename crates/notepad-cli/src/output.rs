//! Output formatting helpers for the CLI.
//!
//! Three modes, resolved the same way for every command:
//! - `--json`: machine-readable JSON only
//! - TTY stdout: bordered tables
//! - otherwise: plain tab-separated lines, stable for scripts

use std::io::IsTerminal;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};

use notepad_core::storage::{NoteCategory, NoteItem};

use crate::helpers::{format_timestamp, summary_line};

const SUMMARY_WIDTH: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Json,
    Plain,
    Pretty,
}

impl OutputMode {
    pub fn resolve(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        let term_is_dumb = std::env::var("TERM").map(|t| t == "dumb").unwrap_or(false);
        if std::io::stdout().is_terminal() && !term_is_dumb {
            Self::Pretty
        } else {
            Self::Plain
        }
    }
}

pub fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Render rows as a table (pretty) or tab-separated lines (plain).
pub fn render_rows(mode: OutputMode, headers: &[&str], rows: &[Vec<String>]) -> String {
    if mode == OutputMode::Pretty {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(headers.to_vec());
        for row in rows {
            table.add_row(row);
        }
        table.to_string()
    } else {
        rows.iter()
            .map(|row| row.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn category_json(category: &NoteCategory, notes: u64) -> serde_json::Value {
    serde_json::json!({
        "id": category.id,
        "name": category.name,
        "notes": notes,
    })
}

/// Display text for a note: its text, the decrypted text when given, or a
/// placeholder for ciphertext.
pub fn note_body(note: &NoteItem, decrypted: Option<&str>) -> String {
    match (note.text(), decrypted) {
        (Some(text), _) => text.to_string(),
        (None, Some(text)) => text.to_string(),
        (None, None) if note.cipher().is_some() => "<encrypted>".to_string(),
        (None, None) => String::new(),
    }
}

pub fn note_json(note: &NoteItem, decrypted: Option<&str>) -> serde_json::Value {
    let readable = note.text().is_some() || decrypted.is_some();
    let text = readable.then(|| note_body(note, decrypted));
    serde_json::json!({
        "id": note.id,
        "created": note.created,
        "modified": note.modified,
        "privacy": note.privacy,
        "category_id": note.category_id,
        "category": note.category_name,
        "text": text,
        "encrypted": note.privacy.is_encrypted(),
    })
}

pub fn note_row(note: &NoteItem, decrypted: Option<&str>) -> Vec<String> {
    vec![
        note.id.map(|id| id.to_string()).unwrap_or_default(),
        format_timestamp(note.modified),
        privacy_label(note),
        note.category_name
            .clone()
            .unwrap_or_else(|| note.category_id.to_string()),
        summary_line(&note_body(note, decrypted), SUMMARY_WIDTH),
    ]
}

pub const NOTE_HEADERS: [&str; 5] = ["ID", "Modified", "Privacy", "Category", "Note"];

fn privacy_label(note: &NoteItem) -> String {
    format!("{:?}", note.privacy).to_lowercase()
}

/// Print one note with a short header block.
pub fn print_note(note: &NoteItem, decrypted: Option<&str>, quiet: bool) {
    if !quiet {
        println!("ID: {}", note.id.map(|id| id.to_string()).unwrap_or_default());
        println!(
            "Category: {}",
            note.category_name
                .clone()
                .unwrap_or_else(|| note.category_id.to_string())
        );
        println!("Privacy: {}", privacy_label(note));
        println!("Created: {}", format_timestamp(note.created));
        println!("Modified: {}", format_timestamp(note.modified));
        println!();
    }
    println!("{}", note_body(note, decrypted));
}
