//! Logging setup for processes embedding the resolver

use crate::config::LoggingSection;
use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber. `RUST_LOG` wins over `logging.level`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(logging: &LoggingSection) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(logging.with_target)
        .with_thread_ids(logging.with_thread_ids)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
