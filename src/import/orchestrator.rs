//! Entry point for data dump imports.
//!
//! `import` requests the dump synchronously, so a failure to even start is
//! returned to the caller directly. Everything after that happens on a
//! background task: polling for readiness, then download, decode, lookup
//! fetches and streaming of mapped heartbeats through a bounded channel.
//! Failures after the handle is returned are logged, close the stream early
//! and are reported once through the handle's outcome.

use super::mapper::{map_heartbeat, unix_seconds_to_utc};
use super::payload::decode_payload;
use super::poller::{PollOutcome, ReadinessPoller};
use super::stats::ImportStats;
use crate::config::ImporterConfig;
use crate::error::ImportError;
use crate::models::{Heartbeat, User};
use crate::wakatime::{DataDump, ExportApi, WakaTimeClient};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Inclusive time range heartbeats must fall into to be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// Everything up to now.
    pub fn until_now() -> Self {
        Self::new(DateTime::<Utc>::MIN_UTC, Utc::now())
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.from <= time && time <= self.to
    }
}

/// Completion signal of an import run, resolved once the stream is closed.
#[derive(Debug)]
pub enum ImportOutcome {
    Completed(ImportStats),
    Failed(ImportError),
}

impl ImportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ImportOutcome::Completed(_))
    }

    pub fn into_result(self) -> Result<ImportStats, ImportError> {
        match self {
            ImportOutcome::Completed(stats) => Ok(stats),
            ImportOutcome::Failed(err) => Err(err),
        }
    }
}

/// Caller side of a running import.
pub struct ImportHandle {
    dump_id: String,
    events: mpsc::Receiver<Heartbeat>,
    outcome: oneshot::Receiver<ImportOutcome>,
    cancel: CancellationToken,
}

impl ImportHandle {
    pub fn dump_id(&self) -> &str {
        &self.dump_id
    }

    /// Next heartbeat, or `None` once the stream is closed.
    pub async fn recv(&mut self) -> Option<Heartbeat> {
        self.events.recv().await
    }

    /// Stop the run: polling ends immediately, streaming at the next heartbeat.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the completion signal, discarding anything not yet received.
    pub async fn finish(self) -> ImportOutcome {
        drop(self.events);
        Self::await_outcome(self.outcome).await
    }

    /// Drain the stream and return every heartbeat together with the outcome.
    pub async fn collect(mut self) -> (Vec<Heartbeat>, ImportOutcome) {
        let mut heartbeats = Vec::new();
        while let Some(heartbeat) = self.events.recv().await {
            heartbeats.push(heartbeat);
        }
        let outcome = Self::await_outcome(self.outcome).await;
        (heartbeats, outcome)
    }

    pub fn into_parts(
        self,
    ) -> (
        mpsc::Receiver<Heartbeat>,
        oneshot::Receiver<ImportOutcome>,
        CancellationToken,
    ) {
        (self.events, self.outcome, self.cancel)
    }

    async fn await_outcome(outcome: oneshot::Receiver<ImportOutcome>) -> ImportOutcome {
        // The sender only disappears without a value if the run task died.
        outcome
            .await
            .unwrap_or(ImportOutcome::Failed(ImportError::Cancelled))
    }
}

/// Imports a user's heartbeat history from a WakaTime data dump.
pub struct DumpImporter<A: ExportApi = WakaTimeClient> {
    api: Arc<A>,
    config: ImporterConfig,
}

impl DumpImporter<WakaTimeClient> {
    pub fn new(api_key: &str) -> Result<Self, ImportError> {
        Self::with_config(api_key, ImporterConfig::from_env())
    }

    pub fn with_config(api_key: &str, config: ImporterConfig) -> Result<Self, ImportError> {
        let client = WakaTimeClient::new(api_key, config.clone())?;
        Ok(Self::with_api(client, config))
    }
}

impl<A: ExportApi> DumpImporter<A> {
    pub fn with_api(api: A, config: ImporterConfig) -> Self {
        Self {
            api: Arc::new(api),
            config,
        }
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Start importing heartbeats of `user` within `[min_from, max_to]`.
    ///
    /// Returns an error without spawning anything if the dump can't be requested.
    /// Must be called from within a tokio runtime.
    pub async fn import(
        &self,
        user: &User,
        min_from: DateTime<Utc>,
        max_to: DateTime<Utc>,
    ) -> Result<ImportHandle, ImportError> {
        self.start(user, TimeWindow::new(min_from, max_to)).await
    }

    /// Start importing the complete history of `user`.
    pub async fn import_all(&self, user: &User) -> Result<ImportHandle, ImportError> {
        self.start(user, TimeWindow::until_now()).await
    }

    async fn start(&self, user: &User, window: TimeWindow) -> Result<ImportHandle, ImportError> {
        log::info!("running wakatime dump import for user '{}'", user.id);

        let dump_id = self
            .api
            .create_export(user)
            .await
            .map_err(ImportError::creation)?;

        let (events_tx, events_rx) = mpsc::channel(self.config.stream_buffer.max(1));
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let cancel = CancellationToken::new();

        let poller = ReadinessPoller::new(
            self.api.clone(),
            dump_id.clone(),
            user.clone(),
            &self.config,
            cancel.child_token(),
        );
        let run = ImportRun {
            api: self.api.clone(),
            user: user.clone(),
            window,
            max_payload_bytes: self.config.max_payload_bytes,
            cancel: cancel.clone(),
        };

        tokio::spawn(async move {
            let outcome = run.execute(poller, events_tx).await;
            let _ = outcome_tx.send(outcome);
        });

        Ok(ImportHandle {
            dump_id,
            events: events_rx,
            outcome: outcome_rx,
            cancel,
        })
    }
}

/// State owned by the background task of one import run.
struct ImportRun<A: ExportApi> {
    api: Arc<A>,
    user: User,
    window: TimeWindow,
    max_payload_bytes: usize,
    cancel: CancellationToken,
}

impl<A: ExportApi> ImportRun<A> {
    /// Takes the sender by value so the stream is closed before the outcome is sent.
    async fn execute(
        self,
        poller: ReadinessPoller<A>,
        events: mpsc::Sender<Heartbeat>,
    ) -> ImportOutcome {
        match poller.run().await {
            PollOutcome::Ready { dump, ticks } => self.on_dump_ready(dump, ticks, events).await,
            PollOutcome::Failed(err) => self.on_dump_failed(err),
        }
    }

    fn on_dump_failed(&self, err: ImportError) -> ImportOutcome {
        log::error!(
            "fetching data dump for user '{}' failed - {}",
            self.user.id,
            err
        );
        ImportOutcome::Failed(err)
    }

    async fn on_dump_ready(
        &self,
        dump: DataDump,
        ticks: u64,
        events: mpsc::Sender<Heartbeat>,
    ) -> ImportOutcome {
        let mut stats = ImportStats {
            polls: ticks,
            ..Default::default()
        };

        match self.stream_dump(&dump, &events, &mut stats).await {
            Ok(()) => {
                log::info!(
                    "import {}: streamed {} heartbeats from {} days",
                    self.user.id,
                    stats.emitted,
                    stats.days
                );
                ImportOutcome::Completed(stats)
            }
            Err(ImportError::Cancelled) => {
                log::warn!(
                    "import {}: cancelled after {} heartbeats",
                    self.user.id,
                    stats.emitted
                );
                ImportOutcome::Failed(ImportError::Cancelled)
            }
            Err(err) => ImportOutcome::Failed(err),
        }
    }

    async fn stream_dump(
        &self,
        dump: &DataDump,
        events: &mpsc::Sender<Heartbeat>,
        stats: &mut ImportStats,
    ) -> Result<(), ImportError> {
        let user_id = &self.user.id;
        let url = dump
            .download_url
            .as_deref()
            .ok_or_else(|| ImportError::Payload(format!("data dump '{}' has no download url", dump.id)))?;

        // download
        let downloaded = tokio::select! {
            _ = self.cancel.cancelled() => return Err(ImportError::Cancelled),
            downloaded = self.api.download(url) => downloaded,
        };
        let raw = downloaded.map_err(|e| {
            log::error!("failed to download {} - {}", url, e);
            e
        })?;
        stats.bytes_downloaded = raw.len();
        log::info!(
            "fetched {} bytes data dump for user '{}'",
            raw.len(),
            user_id
        );

        // decode
        let payload = decode_payload(&raw, self.max_payload_bytes).map_err(|e| {
            log::error!(
                "failed to decode data dump for user '{}' ('{}') - {}",
                user_id,
                url,
                e
            );
            e
        })?;
        drop(raw);
        stats.days = payload.days.len();

        // lookups
        let user_agents = self.api.fetch_user_agents().await.map_err(|e| {
            log::error!(
                "failed to fetch user agents while importing wakatime heartbeats for user '{}' - {}",
                user_id,
                e
            );
            e
        })?;
        let machines = self.api.fetch_machine_names().await.map_err(|e| {
            log::error!(
                "failed to fetch machine names while importing wakatime heartbeats for user '{}' - {}",
                user_id,
                e
            );
            e
        })?;

        // stream
        for day in &payload.days {
            for entry in &day.heartbeats {
                let Some(time) = unix_seconds_to_utc(entry.time) else {
                    log::warn!(
                        "import {}: skipping heartbeat {:?} with unusable time {}",
                        user_id,
                        entry.id,
                        entry.time
                    );
                    stats.skipped += 1;
                    continue;
                };
                if !self.window.contains(time) {
                    continue;
                }
                let Some(heartbeat) = map_heartbeat(entry, &user_agents, &machines, &self.user)
                else {
                    continue;
                };

                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return Err(ImportError::Cancelled),
                    sent = events.send(heartbeat) => {
                        if sent.is_err() {
                            // receiver dropped
                            return Err(ImportError::Cancelled);
                        }
                    }
                }
                stats.emitted += 1;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let window = TimeWindow::new(at(100), at(200));
        assert!(window.contains(at(100)));
        assert!(window.contains(at(150)));
        assert!(window.contains(at(200)));
        assert!(!window.contains(at(99)));
        assert!(!window.contains(at(201)));
    }

    #[test]
    fn until_now_covers_epoch_and_present() {
        let window = TimeWindow::until_now();
        assert!(window.contains(DateTime::<Utc>::UNIX_EPOCH));
        assert!(window.contains(at(1_700_000_000)));
        assert!(!window.contains(Utc::now() + chrono::Duration::days(1)));
    }

    #[test]
    fn outcome_into_result() {
        let ok = ImportOutcome::Completed(ImportStats::default());
        assert!(ok.is_success());
        assert!(ok.into_result().is_ok());

        let failed = ImportOutcome::Failed(ImportError::Cancelled);
        assert!(!failed.is_success());
        assert!(matches!(failed.into_result(), Err(ImportError::Cancelled)));
    }
}
