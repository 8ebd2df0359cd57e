//! Import statistics tracking.

/// Counters for a single import run.
///
/// Records dropped by the time window are deliberately absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    /// Status checks issued before the dump became downloadable
    pub polls: u64,
    /// Size of the downloaded payload
    pub bytes_downloaded: usize,
    /// Day groups found in the payload
    pub days: usize,
    /// Heartbeats pushed onto the output stream
    pub emitted: usize,
    /// Heartbeats dropped because their time has no UTC representation
    pub skipped: usize,
}
