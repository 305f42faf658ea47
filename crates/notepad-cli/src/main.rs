//! NotePad CLI - public, private and encrypted notes from the shell
//!
//! A thin command-line surface over `notepad-core`: it resolves the config
//! and database, installs logging, and maps core errors to exit codes.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod helpers;
mod logging;
mod output;

use clap::Parser;

use crate::app::AppContext;
use crate::cli::Cli;

fn run(cli: &Cli) -> anyhow::Result<()> {
    let ctx = AppContext::open(cli)?;
    commands::dispatch(&ctx, &cli.command)
}

fn main() {
    let cli = Cli::parse();
    logging::init();

    if let Err(err) = run(&cli) {
        eprintln!("Error: {:#}", err);
        std::process::exit(errors::exit_code(&err));
    }
}
