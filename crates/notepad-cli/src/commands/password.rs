use crate::app::{auth_error, AppContext};
use crate::cli::PasswordCommand;
use crate::constants::PASSWORD_ENV;
use crate::errors::CliError;
use crate::helpers::{prompt_new_password, prompt_password, prompt_replacement_password};
use crate::output::print_json;

pub fn handle(ctx: &AppContext, command: &PasswordCommand) -> anyhow::Result<()> {
    match command {
        PasswordCommand::Status { json } => handle_status(ctx, *json),
        PasswordCommand::Set => handle_set(ctx),
        PasswordCommand::Check => handle_check(ctx),
        PasswordCommand::Change => handle_change(ctx),
        PasswordCommand::Remove => handle_remove(ctx),
    }
}

fn handle_status(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let has_password = ctx.encryption().has_password()?;
    let encrypted = ctx.repository().count_encrypted_notes();
    if json {
        return print_json(&serde_json::json!({
            "password_set": has_password,
            "encrypted_notes": encrypted,
        }));
    }
    if has_password {
        println!("Password: set ({} encrypted notes)", encrypted);
    } else {
        println!("Password: not set");
    }
    Ok(())
}

fn handle_set(ctx: &AppContext) -> anyhow::Result<()> {
    if ctx.encryption().has_password()? {
        return Err(CliError::invalid_input(
            "A password is already set. Use `notepad password change`.",
        )
        .into());
    }
    let password = prompt_new_password(PASSWORD_ENV, ctx.interactive())?;
    if password.is_empty() {
        return Err(CliError::invalid_input("Password cannot be empty").into());
    }
    ctx.encryption().set_password(&password)?;
    if !ctx.quiet() {
        println!("Password set");
    }
    Ok(())
}

fn require_password_set(ctx: &AppContext) -> anyhow::Result<()> {
    if ctx.encryption().has_password()? {
        return Ok(());
    }
    Err(CliError::not_found("No password is set.").into())
}

fn handle_check(ctx: &AppContext) -> anyhow::Result<()> {
    require_password_set(ctx)?;
    let password = prompt_password(ctx.interactive())?;
    ctx.encryption()
        .check_password(&password)
        .map_err(|err| auth_error(err, "Incorrect password."))?;
    if !ctx.quiet() {
        println!("Password is correct");
    }
    Ok(())
}

fn handle_change(ctx: &AppContext) -> anyhow::Result<()> {
    require_password_set(ctx)?;
    let old = prompt_password(ctx.interactive())?;
    let new = prompt_replacement_password(ctx.interactive())?;
    if new.is_empty() {
        return Err(CliError::invalid_input("Password cannot be empty").into());
    }
    ctx.encryption()
        .change_password(&old, &new)
        .map_err(|err| auth_error(err, "Incorrect current password."))?;
    if !ctx.quiet() {
        println!(
            "Password changed ({} encrypted notes re-encrypted)",
            ctx.repository().count_encrypted_notes()
        );
    }
    Ok(())
}

fn handle_remove(ctx: &AppContext) -> anyhow::Result<()> {
    require_password_set(ctx)?;
    // Removal requires the password even with nothing to decrypt.
    ctx.unlock()?;
    let decrypted = ctx.repository().count_encrypted_notes();
    ctx.encryption().remove_password()?;
    if !ctx.quiet() {
        println!("Password removed ({} notes are now private)", decrypted);
    }
    Ok(())
}
