//! Bulk import of historical heartbeats from WakaTime data dumps.
//!
//! A data dump is requested from the remote service, polled until it is ready,
//! downloaded, enriched with the user agent and machine name directories and
//! streamed out as canonical [`models::Heartbeat`]s for the caller to persist.

pub mod config;
pub mod error;
pub mod import;
pub mod models;
pub mod wakatime;

pub use config::ImporterConfig;
pub use error::ImportError;
pub use import::{DumpImporter, ImportHandle, ImportOutcome, ImportStats, TimeWindow};
pub use models::{Heartbeat, User};

use env_logger::Env;
use std::sync::Once;

static LOGGER: Once = Once::new();

/// Install the `env_logger` backend once, honouring `RUST_LOG`.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    });
}
