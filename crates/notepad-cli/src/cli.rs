use clap::{Args, Parser, Subcommand};

use notepad_core::VERSION;

/// NotePad - public, private and encrypted notes from the shell
#[derive(Parser)]
#[command(name = "notepad")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the notes database
    #[arg(short, long, global = true, env = "NOTEPAD_DB")]
    pub database: Option<String>,

    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_input: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage categories
    #[command(subcommand)]
    Categories(CategoryCommand),

    /// Manage notes
    #[command(subcommand)]
    Notes(NoteCommand),

    /// Manage the encryption password
    #[command(subcommand)]
    Password(PasswordCommand),

    /// Show repository counts
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum CategoryCommand {
    /// List categories
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a category
    Add {
        /// Category name
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Rename a category
    Rename {
        /// Category id or name
        #[arg(value_name = "CATEGORY")]
        category: String,

        /// New name
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Delete a category, moving its notes to Unfiled
    Delete {
        /// Category id or name
        #[arg(value_name = "CATEGORY")]
        category: String,
    },

    /// Delete every category except Unfiled
    DeleteAll(ConfirmArgs),
}

#[derive(Subcommand)]
pub enum NoteCommand {
    /// List notes
    List(NoteListArgs),

    /// Show a note
    Show {
        /// Note id
        #[arg(value_name = "ID")]
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a note
    Add(NoteAddArgs),

    /// Edit a note
    Edit(NoteEditArgs),

    /// Delete a note
    Delete {
        /// Note id
        #[arg(value_name = "ID")]
        id: i64,
    },

    /// Delete every note
    DeleteAll(ConfirmArgs),
}

/// Arguments for `notes list`
#[derive(Args)]
pub struct NoteListArgs {
    /// Only notes in this category (id or name)
    #[arg(long)]
    pub category: Option<String>,

    /// Include private and encrypted notes
    #[arg(long)]
    pub private: bool,

    /// Decrypt encrypted notes for display (asks for the password)
    #[arg(long, requires = "private")]
    pub decrypt: bool,

    /// Sort order, e.g. "modified desc, note"
    #[arg(long)]
    pub sort: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `notes add`
#[derive(Args)]
pub struct NoteAddArgs {
    /// Note text
    #[arg(value_name = "TEXT")]
    pub text: String,

    /// Category id or name
    #[arg(long)]
    pub category: Option<String>,

    /// Mark the note private
    #[arg(long, conflicts_with = "encrypt")]
    pub private: bool,

    /// Encrypt the note (asks for the password)
    #[arg(long)]
    pub encrypt: bool,
}

/// Arguments for `notes edit`
#[derive(Args)]
pub struct NoteEditArgs {
    /// Note id
    #[arg(value_name = "ID")]
    pub id: i64,

    /// Replacement text
    #[arg(long)]
    pub text: Option<String>,

    /// Move to this category (id or name)
    #[arg(long)]
    pub category: Option<String>,

    /// Make the note public
    #[arg(long, conflicts_with_all = ["private", "encrypt"])]
    pub public: bool,

    /// Make the note private
    #[arg(long, conflicts_with = "encrypt")]
    pub private: bool,

    /// Encrypt the note
    #[arg(long)]
    pub encrypt: bool,
}

#[derive(Subcommand)]
pub enum PasswordCommand {
    /// Show whether a password is set
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the first password
    Set,

    /// Check a password
    Check,

    /// Change the password, re-encrypting every encrypted note
    Change,

    /// Remove the password, turning encrypted notes into private ones
    Remove,
}

/// Confirmation for destructive bulk commands
#[derive(Args)]
pub struct ConfirmArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
