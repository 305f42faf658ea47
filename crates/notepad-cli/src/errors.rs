//! CLI error types for structured error handling.
//!
//! Errors map to specific exit codes so scripts can tell a missing note
//! from a wrong password.

use std::fmt;

use notepad_core::NotePadError;

use crate::constants::exit_codes;

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Note or category not found
    NotFound(String),

    /// Authentication failed
    AuthFailed { message: String, hint: Option<String> },

    /// Invalid user input
    InvalidInput(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NotFound(message) => write!(f, "{}", message),
            CliError::AuthFailed { message, hint } => match hint {
                Some(h) => write!(f, "{}\n{}", message, h),
                None => write!(f, "{}", message),
            },
            CliError::InvalidInput(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    pub fn not_found(message: impl Into<String>) -> Self {
        CliError::NotFound(message.into())
    }

    pub fn auth_failed_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::AuthFailed {
            message: message.into(),
            hint: Some(hint.into()),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound(_) => exit_codes::NOT_FOUND,
            CliError::AuthFailed { .. } => exit_codes::AUTH_FAILED,
            CliError::InvalidInput(_) => exit_codes::INVALID_INPUT,
        }
    }
}

fn core_exit_code(err: &NotePadError) -> i32 {
    match err {
        NotePadError::NotFound(_) => exit_codes::NOT_FOUND,
        NotePadError::InvalidArgument(_)
        | NotePadError::DuplicateKey(_)
        | NotePadError::InvalidSortField(_)
        | NotePadError::InvalidSortDirection(_) => exit_codes::INVALID_INPUT,
        err if err.is_security() => exit_codes::AUTH_FAILED,
        _ => exit_codes::GENERAL,
    }
}

/// Exit code for any error surfaced by a command.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.exit_code();
    }
    if let Some(core) = err.downcast_ref::<NotePadError>() {
        return core_exit_code(core);
    }
    exit_codes::GENERAL
}
