//! Application context for the NotePad CLI.
//!
//! Bundles the parsed arguments, the loaded config and an open repository
//! session so handlers do not thread them through separately.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use notepad_core::crypto::KeySession;
use notepad_core::storage::{FixedStrings, NoteRepository, Repository, SortOrder, SqliteEngine};
use notepad_core::{EncryptionService, NotePadError};

use crate::cli::Cli;
use crate::config::{default_config_path, load_config, resolve_database_path, NotepadConfig};
use crate::constants::{CONFIG_ENV, SESSION_OWNER};
use crate::errors::CliError;
use crate::helpers::prompt_password;

pub fn resolve_config_path() -> anyhow::Result<PathBuf> {
    if let Ok(value) = std::env::var(CONFIG_ENV) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    default_config_path()
}

pub struct AppContext<'a> {
    cli: &'a Cli,
    config: NotepadConfig,
    database: PathBuf,
    repository: Arc<dyn NoteRepository>,
    encryption: EncryptionService,
}

impl<'a> AppContext<'a> {
    /// Load config and open a repository session on the resolved database.
    pub fn open(cli: &'a Cli) -> anyhow::Result<Self> {
        let config = load_config(&resolve_config_path()?)?;
        let database = resolve_database_path(cli.database.as_deref(), &config)?;

        let mut repository = Repository::new(SqliteEngine::new(&database));
        if let Some(unfiled) = config.display.unfiled_name.clone() {
            repository = repository.with_strings(FixedStrings { unfiled });
        }
        let repository: Arc<dyn NoteRepository> = Arc::new(repository);
        repository.open(SESSION_OWNER)?;
        debug!(path = %database.display(), "database opened");

        let encryption = EncryptionService::new(Arc::clone(&repository), Arc::new(KeySession::new()));
        Ok(Self {
            cli,
            config,
            database,
            repository,
            encryption,
        })
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// Prompts are allowed: stdin is a terminal and `--no-input` is off.
    pub fn interactive(&self) -> bool {
        !self.cli.no_input && std::io::stdin().is_terminal()
    }

    pub fn config(&self) -> &NotepadConfig {
        &self.config
    }

    pub fn database(&self) -> &PathBuf {
        &self.database
    }

    pub fn repository(&self) -> &dyn NoteRepository {
        self.repository.as_ref()
    }

    pub fn encryption(&self) -> &EncryptionService {
        &self.encryption
    }

    /// Sort order from `--sort`, else the configured default.
    pub fn sort_order(&self, flag: Option<&str>) -> anyhow::Result<SortOrder> {
        let spec = flag.unwrap_or(self.config.display.sort.as_str());
        Ok(spec.parse::<SortOrder>()?)
    }

    /// Ask for the password and hold its key for this process.
    pub fn unlock(&self) -> anyhow::Result<()> {
        if self.encryption.is_unlocked() {
            return Ok(());
        }
        if !self.encryption.has_password()? {
            return Err(CliError::auth_failed_with_hint(
                "No password is set.",
                "Run `notepad password set` first.",
            )
            .into());
        }
        let password = prompt_password(self.interactive())?;
        self.encryption
            .unlock(&password)
            .map_err(|err| auth_error(err, "Incorrect password."))
    }
}

impl Drop for AppContext<'_> {
    fn drop(&mut self) {
        self.encryption.release();
        if let Err(err) = self.repository.release(SESSION_OWNER) {
            warn!(error = %err, "failed to release repository session");
        }
    }
}

/// Turn a wrong password into a CLI auth failure; keep other errors as-is.
pub fn auth_error(err: NotePadError, message: &str) -> anyhow::Error {
    match err {
        NotePadError::InvalidPassword => {
            CliError::auth_failed_with_hint(message, "Check the password and try again.").into()
        }
        other => other.into(),
    }
}
