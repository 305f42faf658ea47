use notepad_core::storage::UNFILED_CATEGORY_ID;
use tracing::info;

use crate::app::AppContext;
use crate::cli::CategoryCommand;
use crate::errors::CliError;
use crate::helpers::{confirm, require_category};
use crate::output::{category_json, print_json, render_rows, OutputMode};

pub fn handle(ctx: &AppContext, command: &CategoryCommand) -> anyhow::Result<()> {
    match command {
        CategoryCommand::List { json } => handle_list(ctx, *json),
        CategoryCommand::Add { name } => handle_add(ctx, name),
        CategoryCommand::Rename { category, name } => handle_rename(ctx, category, name),
        CategoryCommand::Delete { category } => handle_delete(ctx, category),
        CategoryCommand::DeleteAll(args) => handle_delete_all(ctx, args.yes),
    }
}

fn handle_list(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let repository = ctx.repository();
    let categories = repository.get_categories()?;
    let mode = OutputMode::resolve(json);

    if mode == OutputMode::Json {
        let values: Vec<_> = categories
            .iter()
            .map(|c| category_json(c, repository.count_notes_in_category(c.id)))
            .collect();
        return print_json(&serde_json::Value::Array(values));
    }

    let rows: Vec<Vec<String>> = categories
        .iter()
        .map(|c| {
            vec![
                c.id.to_string(),
                c.name.clone(),
                repository.count_notes_in_category(c.id).to_string(),
            ]
        })
        .collect();
    println!("{}", render_rows(mode, &["ID", "Name", "Notes"], &rows));
    Ok(())
}

fn handle_add(ctx: &AppContext, name: &str) -> anyhow::Result<()> {
    let category = ctx.repository().insert_category(name)?;
    info!(id = category.id, "category added");
    if ctx.quiet() {
        println!("{}", category.id);
    } else {
        println!("Added category {} ({})", category.name, category.id);
    }
    Ok(())
}

fn handle_rename(ctx: &AppContext, category: &str, name: &str) -> anyhow::Result<()> {
    let existing = require_category(ctx.repository(), category)?;
    let renamed = ctx.repository().update_category(existing.id, name)?;
    if !ctx.quiet() {
        println!("Renamed category {} to {}", existing.name, renamed.name);
    }
    Ok(())
}

fn handle_delete(ctx: &AppContext, category: &str) -> anyhow::Result<()> {
    let existing = require_category(ctx.repository(), category)?;
    if existing.id == UNFILED_CATEGORY_ID {
        return Err(CliError::invalid_input("The Unfiled category cannot be deleted").into());
    }
    let moved = ctx.repository().count_notes_in_category(existing.id);
    ctx.repository().delete_category(existing.id)?;
    if !ctx.quiet() {
        println!(
            "Deleted category {} ({} notes moved to {})",
            existing.name,
            moved,
            unfiled_name(ctx)?
        );
    }
    Ok(())
}

fn handle_delete_all(ctx: &AppContext, yes: bool) -> anyhow::Result<()> {
    if !confirm("Delete every category?", yes, ctx.interactive())? {
        return Ok(());
    }
    ctx.repository().delete_all_categories()?;
    if !ctx.quiet() {
        println!("Deleted all categories; notes moved to {}", unfiled_name(ctx)?);
    }
    Ok(())
}

fn unfiled_name(ctx: &AppContext) -> anyhow::Result<String> {
    Ok(ctx
        .repository()
        .get_category_by_id(UNFILED_CATEGORY_ID)?
        .map(|c| c.name)
        .unwrap_or_default())
}
