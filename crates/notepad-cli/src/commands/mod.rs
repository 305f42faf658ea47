//! Command handlers, one module per command group.

mod categories;
mod notes;
mod password;
mod stats;

use crate::app::AppContext;
use crate::cli::Commands;

pub fn dispatch(ctx: &AppContext, command: &Commands) -> anyhow::Result<()> {
    match command {
        Commands::Categories(command) => categories::handle(ctx, command),
        Commands::Notes(command) => notes::handle(ctx, command),
        Commands::Password(command) => password::handle(ctx, command),
        Commands::Stats { json } => stats::handle_stats(ctx, *json),
    }
}
