//! # NotePad Core
//!
//! Core library for NotePad - a personal notes manager with public, private
//! and encrypted notes.
//!
//! This crate provides the privacy-aware note repository independent of any
//! user interface.
//!
//! ## Architecture
//!
//! - **storage**: repository contract, transaction handling, observers and
//!   the SQLite / in-memory storage engines
//! - **crypto**: key derivation, note encryption and the key session
//! - **encryption**: password management on top of a repository

pub mod crypto;
pub mod encryption;
pub mod error;
pub mod storage;

pub use encryption::EncryptionService;
pub use error::{NotePadError, Result};
pub use storage::{NoteRepository, Repository};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
