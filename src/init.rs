//! Initialization helpers for the application startup.

use crate::config::Config;
use crate::store::{KeyValueStore, MemoryStore, SqliteStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Sets up the tracing subscriber with the configured filters.
pub fn setup_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let mut filter = config.logging.level.clone();

        // Keep dependency chatter out unless explicitly asked for
        for noisy in ["hyper", "reqwest", "rusqlite"] {
            if !filter.contains(noisy) {
                filter.push_str(&format!(",{}=off", noisy));
            }
        }

        tracing_subscriber::EnvFilter::new(filter)
    });

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

/// Opens the configured key-value store.
pub fn init_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
    match config.store.backend.as_str() {
        "memory" => {
            info!("Using in-memory store; state is lost on exit.");
            Ok(Arc::new(MemoryStore::new()))
        }
        "sqlite" => {
            info!("Using SQLite store at {}", config.store.sqlite_path);
            let store = SqliteStore::open(&config.store.sqlite_path)
                .with_context(|| format!("Failed to open store {}", config.store.sqlite_path))?;
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("Unknown store backend '{}'", other),
    }
}
