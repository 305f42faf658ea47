//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// - 0: Success
/// - 1: General error
/// - 2: Usage error (reported by clap)
/// - 3+: Application-specific errors
pub mod exit_codes {
    pub const GENERAL: i32 = 1;

    /// Note or category not found.
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input, duplicate names, bad sort specs.
    pub const INVALID_INPUT: i32 = 4;

    /// Wrong password, locked key session, damaged password record.
    pub const AUTH_FAILED: i32 = 5;
}

/// Password environment variable for non-interactive use.
pub const PASSWORD_ENV: &str = "NOTEPAD_PASSWORD";

/// Replacement password for `password change` without a TTY.
pub const NEW_PASSWORD_ENV: &str = "NOTEPAD_NEW_PASSWORD";

/// Config file override.
pub const CONFIG_ENV: &str = "NOTEPAD_CONFIG";

/// Log output format (`text` or `json`).
pub const LOG_FORMAT_ENV: &str = "NOTEPAD_LOG_FORMAT";

/// Session owner name the CLI registers with the repository.
pub const SESSION_OWNER: &str = "notepad-cli";
