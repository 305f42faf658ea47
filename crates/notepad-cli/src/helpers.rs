//! Input and parsing helper functions for the CLI.

use chrono::{DateTime, Local, Utc};
use dialoguer::{Confirm, Password};
use zeroize::Zeroizing;

use notepad_core::storage::{NoteCategory, NoteRepository};

use crate::constants::{NEW_PASSWORD_ENV, PASSWORD_ENV};
use crate::errors::CliError;

fn password_from_env(name: &str) -> Option<Zeroizing<String>> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(Zeroizing::new)
}

/// Read the password from `NOTEPAD_PASSWORD` or prompt for it.
pub fn prompt_password(interactive: bool) -> anyhow::Result<Zeroizing<String>> {
    if let Some(password) = password_from_env(PASSWORD_ENV) {
        return Ok(password);
    }
    if !interactive {
        return Err(CliError::auth_failed_with_hint(
            "No password provided and no TTY available.",
            format!("Set {}.", PASSWORD_ENV),
        )
        .into());
    }
    Password::new()
        .with_prompt("Password")
        .interact()
        .map(Zeroizing::new)
        .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))
}

/// Read a new password, confirming it when prompting.
///
/// `env` names the variable consulted first.
pub fn prompt_new_password(env: &str, interactive: bool) -> anyhow::Result<Zeroizing<String>> {
    if let Some(password) = password_from_env(env) {
        return Ok(password);
    }
    if !interactive {
        return Err(CliError::auth_failed_with_hint(
            "No password provided and no TTY available.",
            format!("Set {}.", env),
        )
        .into());
    }
    Password::new()
        .with_prompt("New password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .map(Zeroizing::new)
        .map_err(|e| anyhow::anyhow!("Failed to read password: {}", e))
}

/// The replacement password for `password change`.
pub fn prompt_replacement_password(interactive: bool) -> anyhow::Result<Zeroizing<String>> {
    prompt_new_password(NEW_PASSWORD_ENV, interactive)
}

/// Ask before a destructive command unless `--yes` was given.
pub fn confirm(prompt: &str, yes: bool, interactive: bool) -> anyhow::Result<bool> {
    if yes {
        return Ok(true);
    }
    if !interactive {
        return Err(CliError::invalid_input(format!("{} Pass --yes to confirm.", prompt)).into());
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| anyhow::anyhow!("Failed to read confirmation: {}", e))
}

/// Resolve a category given by id or by exact name.
pub fn require_category(
    repository: &dyn NoteRepository,
    value: &str,
) -> anyhow::Result<NoteCategory> {
    let found = match value.trim().parse::<i64>() {
        Ok(id) => repository.get_category_by_id(id)?,
        Err(_) => repository.get_category_by_name(value)?,
    };
    found.ok_or_else(|| CliError::not_found(format!("Category not found: {}", value)).into())
}

/// Epoch milliseconds rendered in local time.
pub fn format_timestamp(millis: Option<i64>) -> String {
    millis
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// First line of `text`, cut to `width` characters.
pub fn summary_line(text: &str, width: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() <= width {
        return line.to_string();
    }
    let mut cut: String = line.chars().take(width.saturating_sub(1)).collect();
    cut.push('…');
    cut
}
