//! Terminal front end for a lookout search session.

pub mod args;
pub mod commands;
pub mod events;
pub mod render;

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `info`. Logs go to stderr so they do not
/// interleave with rendered results.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
