//! Data dump import pipeline.
//!
//! 1. **Orchestration** (`orchestrator`) - requests the dump and owns the output stream
//! 2. **Polling** (`poller`) - waits for the remote dump to become downloadable
//! 3. **Decoding** (`payload`) - turns the downloaded bytes into day-grouped heartbeats
//! 4. **Mapping** (`mapper`) - enriches and converts heartbeats into the canonical model
//! 5. **Statistics** (`stats`) - per-run counters reported with the outcome
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use heartbeat_importer::import::DumpImporter;
//! use heartbeat_importer::models::User;
//!
//! let importer = DumpImporter::new(&api_key)?;
//! let mut handle = importer.import_all(&User::new("alice")).await?;
//!
//! while let Some(heartbeat) = handle.recv().await {
//!     store(heartbeat).await?;
//! }
//!
//! let stats = handle.finish().await.into_result()?;
//! println!("imported {} heartbeats", stats.emitted);
//! ```

pub mod mapper;
pub mod orchestrator;
pub mod payload;
pub mod poller;
pub mod stats;

pub use mapper::map_heartbeat;
pub use orchestrator::{DumpImporter, ImportHandle, ImportOutcome, TimeWindow};
pub use poller::{PollOutcome, PollState, ReadinessPoller};
pub use stats::ImportStats;
