use tracing::info;

use notepad_core::storage::{CategoryFilter, NoteContent, NoteItem, PrivacyLevel};

use crate::app::AppContext;
use crate::cli::{NoteAddArgs, NoteCommand, NoteEditArgs, NoteListArgs};
use crate::errors::CliError;
use crate::helpers::{confirm, require_category};
use crate::output::{
    note_json, note_row, print_json, print_note, render_rows, OutputMode, NOTE_HEADERS,
};

pub fn handle(ctx: &AppContext, command: &NoteCommand) -> anyhow::Result<()> {
    match command {
        NoteCommand::List(args) => handle_list(ctx, args),
        NoteCommand::Show { id, json } => handle_show(ctx, *id, *json),
        NoteCommand::Add(args) => handle_add(ctx, args),
        NoteCommand::Edit(args) => handle_edit(ctx, args),
        NoteCommand::Delete { id } => handle_delete(ctx, *id),
        NoteCommand::DeleteAll(args) => handle_delete_all(ctx, args.yes),
    }
}

fn require_note(ctx: &AppContext, id: i64) -> anyhow::Result<NoteItem> {
    ctx.repository()
        .get_note_by_id(id)?
        .ok_or_else(|| CliError::not_found(format!("Note not found: {}", id)).into())
}

/// Decrypted text of an encrypted note, unlocking first.
fn decrypted_text(ctx: &AppContext, note: &NoteItem) -> anyhow::Result<Option<String>> {
    if !note.privacy.is_encrypted() {
        return Ok(None);
    }
    ctx.unlock()?;
    Ok(Some(ctx.encryption().open_note(note)?))
}

fn handle_list(ctx: &AppContext, args: &NoteListArgs) -> anyhow::Result<()> {
    let category = match args.category.as_deref() {
        Some(value) => CategoryFilter::Only(require_category(ctx.repository(), value)?.id),
        None => CategoryFilter::All,
    };
    let show_private = args.private || ctx.config().display.show_private;
    let order = ctx.sort_order(args.sort.as_deref())?;

    let notes = ctx
        .repository()
        .get_notes(category, show_private, show_private, &order)?
        .into_rows();

    let mut texts = Vec::with_capacity(notes.len());
    for note in &notes {
        if args.decrypt {
            texts.push(decrypted_text(ctx, note)?);
        } else {
            texts.push(None);
        }
    }

    let mode = OutputMode::resolve(args.json);
    if mode == OutputMode::Json {
        let values: Vec<_> = notes
            .iter()
            .zip(&texts)
            .map(|(note, text)| note_json(note, text.as_deref()))
            .collect();
        return print_json(&serde_json::Value::Array(values));
    }

    if notes.is_empty() {
        if !ctx.quiet() {
            eprintln!("No notes found.");
        }
        return Ok(());
    }
    let rows: Vec<Vec<String>> = notes
        .iter()
        .zip(&texts)
        .map(|(note, text)| note_row(note, text.as_deref()))
        .collect();
    println!("{}", render_rows(mode, &NOTE_HEADERS, &rows));
    Ok(())
}

fn handle_show(ctx: &AppContext, id: i64, json: bool) -> anyhow::Result<()> {
    let note = require_note(ctx, id)?;
    let text = decrypted_text(ctx, &note)?;
    if json {
        return print_json(&note_json(&note, text.as_deref()));
    }
    print_note(&note, text.as_deref(), ctx.quiet());
    Ok(())
}

fn handle_add(ctx: &AppContext, args: &NoteAddArgs) -> anyhow::Result<()> {
    let privacy = if args.private || args.encrypt {
        PrivacyLevel::Private
    } else {
        PrivacyLevel::Public
    };
    let mut note = NoteItem::new(privacy, args.text.clone());
    if let Some(value) = args.category.as_deref() {
        note.category_id = require_category(ctx.repository(), value)?.id;
    }
    if args.encrypt {
        ctx.unlock()?;
        ctx.encryption().seal_note(&mut note)?;
    }

    let stored = ctx.repository().insert_note(&note)?;
    let id = stored.id.unwrap_or_default();
    info!(id, privacy = ?stored.privacy, "note added");
    if ctx.quiet() {
        println!("{}", id);
    } else {
        println!("Added note {}", id);
    }
    Ok(())
}

fn target_privacy(args: &NoteEditArgs, current: PrivacyLevel) -> PrivacyLevel {
    if args.public {
        PrivacyLevel::Public
    } else if args.private {
        PrivacyLevel::Private
    } else if args.encrypt {
        PrivacyLevel::Encrypted
    } else {
        current
    }
}

fn handle_edit(ctx: &AppContext, args: &NoteEditArgs) -> anyhow::Result<()> {
    let mut note = require_note(ctx, args.id)?;
    let privacy = target_privacy(args, note.privacy);
    let reseal = args.text.is_some() || privacy.is_encrypted() != note.privacy.is_encrypted();

    if let Some(value) = args.category.as_deref() {
        note.category_id = require_category(ctx.repository(), value)?.id;
    }

    if reseal {
        let text = match &args.text {
            Some(text) => text.clone(),
            None => match decrypted_text(ctx, &note)? {
                Some(text) => text,
                None => note.text().unwrap_or_default().to_string(),
            },
        };
        note.content = Some(NoteContent::Text(text));
        if privacy.is_encrypted() {
            note.privacy = PrivacyLevel::Private;
            ctx.unlock()?;
            ctx.encryption().seal_note(&mut note)?;
        } else {
            note.privacy = privacy;
        }
    } else {
        note.privacy = privacy;
    }

    // Stamp the edit time.
    note.modified = None;
    let stored = ctx.repository().update_note(&note)?;
    if !ctx.quiet() {
        println!("Updated note {}", stored.id.unwrap_or_default());
    }
    Ok(())
}

fn handle_delete(ctx: &AppContext, id: i64) -> anyhow::Result<()> {
    if !ctx.repository().delete_note(id)? {
        return Err(CliError::not_found(format!("Note not found: {}", id)).into());
    }
    if !ctx.quiet() {
        println!("Deleted note {}", id);
    }
    Ok(())
}

fn handle_delete_all(ctx: &AppContext, yes: bool) -> anyhow::Result<()> {
    if !confirm("Delete every note?", yes, ctx.interactive())? {
        return Ok(());
    }
    let count = ctx.repository().count_notes();
    ctx.repository().delete_all_notes()?;
    if !ctx.quiet() {
        println!("Deleted {} notes", count);
    }
    Ok(())
}
