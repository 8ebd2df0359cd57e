//! Wire types for the WakaTime v1 data dump, user agent and machine name endpoints.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Readiness of a remote data dump as reported by the dump directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpStatus {
    Pending,
    Completed,
    Unknown,
}

impl DumpStatus {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().trim_end_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "completed" => DumpStatus::Completed,
            "pending" | "processing" | "queued" => DumpStatus::Pending,
            _ => DumpStatus::Unknown,
        }
    }
}

/// One entry of the data dump directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDump {
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub percent_complete: f64,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default, rename = "type")]
    pub dump_type: Option<String>,
    #[serde(default)]
    pub is_processing: bool,
    #[serde(default)]
    pub is_stuck: bool,
    #[serde(default)]
    pub has_failed: bool,
    #[serde(default)]
    pub expires: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl DataDump {
    pub fn dump_status(&self) -> DumpStatus {
        DumpStatus::parse(&self.status)
    }

    /// Completed and carrying a URL to fetch the payload from.
    pub fn is_downloadable(&self) -> bool {
        self.dump_status() == DumpStatus::Completed && self.download_url.is_some()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateDumpRequest<'a> {
    #[serde(rename = "type")]
    pub dump_type: &'a str,
    pub email_when_finished: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataDumpResult {
    pub data: DataDump,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DataDumpList {
    #[serde(default)]
    pub data: Vec<DataDump>,
}

/// Downloaded export payload: heartbeats grouped by day.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportPayload {
    #[serde(default)]
    pub days: Vec<DayEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DayEntry {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub heartbeats: Vec<HeartbeatEntry>,
}

/// A heartbeat as found inside a data dump.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeartbeatEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub entity: String,
    #[serde(default, rename = "type")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub is_write: Option<bool>,
    /// Unix seconds with fractional part.
    pub time: f64,
    #[serde(default)]
    pub user_agent_id: Option<String>,
    #[serde(default)]
    pub machine_name_id: Option<String>,
    #[serde(default)]
    pub lines: Option<i64>,
    #[serde(default)]
    pub lineno: Option<i64>,
    #[serde(default)]
    pub cursorpos: Option<i64>,
    #[serde(default)]
    pub line_additions: Option<i64>,
    #[serde(default)]
    pub line_deletions: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAgentEntry {
    pub id: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub editor: Option<String>,
    #[serde(default)]
    pub os: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MachineEntry {
    pub id: String,
    #[serde(default)]
    pub value: String,
}

/// A page of a paginated directory listing.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

/// Immutable id-keyed directory fetched once per import run.
#[derive(Debug, Clone)]
pub struct LookupTable<V> {
    entries: HashMap<String, V>,
}

impl<V> LookupTable<V> {
    pub fn get(&self, id: Option<&str>) -> Option<&V> {
        id.and_then(|id| self.entries.get(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for LookupTable<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> FromIterator<(String, V)> for LookupTable<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

pub type UserAgentTable = LookupTable<UserAgentEntry>;
pub type MachineTable = LookupTable<MachineEntry>;
