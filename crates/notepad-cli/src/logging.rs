//! Diagnostic logging to stderr.

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::constants::LOG_FORMAT_ENV;

const DEFAULT_FILTER: &str = "notepad=warn";

/// Install the global subscriber. `RUST_LOG` overrides the default filter;
/// `NOTEPAD_LOG_FORMAT=json` switches to JSON lines.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let json = std::env::var(LOG_FORMAT_ENV)
        .map(|value| value.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    if let Err(err) = result {
        eprintln!("Warning: logging disabled: {}", err);
    }
}
