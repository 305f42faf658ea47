use crate::app::AppContext;
use crate::output::print_json;

pub fn handle_stats(ctx: &AppContext, json: bool) -> anyhow::Result<()> {
    let repository = ctx.repository();
    let notes = repository.count_notes();
    let private = repository.count_private_notes();
    let encrypted = repository.count_encrypted_notes();
    let categories = repository.count_categories();
    let metadata = repository.count_metadata();
    let password = ctx.encryption().has_password()?;

    if json {
        return print_json(&serde_json::json!({
            "database": ctx.database().display().to_string(),
            "notes": notes,
            "private_notes": private,
            "encrypted_notes": encrypted,
            "categories": categories,
            "metadata": metadata,
            "password_set": password,
        }));
    }

    if !ctx.quiet() {
        println!("Database: {}", ctx.database().display());
    }
    println!("Notes: {} ({} private, {} encrypted)", notes, private, encrypted);
    println!("Categories: {}", categories);
    println!("Metadata records: {}", metadata);
    println!("Password: {}", if password { "set" } else { "not set" });
    Ok(())
}
