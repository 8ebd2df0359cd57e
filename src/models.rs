use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Origin tag attached to every heartbeat produced by a data dump import.
pub const ORIGIN_WAKATIME_IMPORT: &str = "wakatime_import";

// ===== User =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

// ===== Heartbeat =====

/// A single unit of recorded coding activity in the canonical model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heartbeat {
    pub user_id: String,
    pub entity: String,
    pub entity_type: String,
    pub category: Option<String>,
    pub project: Option<String>,
    pub branch: Option<String>,
    pub language: Option<String>,
    pub is_write: bool,
    pub editor: String,
    pub operating_system: String,
    pub machine: String,
    pub user_agent: String,
    pub time: DateTime<Utc>,
    pub lines: Option<i64>,
    pub line_number: Option<i64>,
    pub cursor_pos: Option<i64>,
    pub line_additions: Option<i64>,
    pub line_deletions: Option<i64>,
    pub origin: String,
    pub origin_id: Option<String>,
    pub hash: String,
}

impl Heartbeat {
    /// Fill in `hash` from the identity fields.
    pub fn hashed(mut self) -> Self {
        self.hash = self.compute_hash();
        self
    }

    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            self.user_id.as_str(),
            self.entity.as_str(),
            self.entity_type.as_str(),
            self.category.as_deref().unwrap_or_default(),
            self.project.as_deref().unwrap_or_default(),
            self.branch.as_deref().unwrap_or_default(),
            self.language.as_deref().unwrap_or_default(),
            self.editor.as_str(),
            self.operating_system.as_str(),
            self.machine.as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update([u8::from(self.is_write)]);
        let nanos = self.time.timestamp_nanos_opt().unwrap_or_default();
        hasher.update(nanos.to_le_bytes());

        hasher
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Heartbeat {
        Heartbeat {
            user_id: "alice".into(),
            entity: "/src/main.rs".into(),
            entity_type: "file".into(),
            category: Some("coding".into()),
            project: Some("importer".into()),
            branch: Some("main".into()),
            language: Some("Rust".into()),
            is_write: true,
            editor: "vscode".into(),
            operating_system: "Linux".into(),
            machine: "workstation".into(),
            user_agent: "wakatime/v1.0".into(),
            time: DateTime::from_timestamp(1_700_000_000, 500).unwrap(),
            lines: Some(120),
            line_number: None,
            cursor_pos: None,
            line_additions: None,
            line_deletions: None,
            origin: ORIGIN_WAKATIME_IMPORT.into(),
            origin_id: Some("hb-1".into()),
            hash: String::new(),
        }
    }

    #[test]
    fn hash_is_hex_sha256() {
        let hb = sample().hashed();
        assert_eq!(hb.hash.len(), 64);
        assert!(hb.hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_ignores_non_identity_fields() {
        let a = sample().hashed();
        let mut b = sample();
        b.lines = Some(999);
        b.origin_id = Some("other".into());
        assert_eq!(a.hash, b.hashed().hash);
    }

    #[test]
    fn hash_changes_with_time_and_entity() {
        let a = sample().hashed();

        let mut later = sample();
        later.time = DateTime::from_timestamp(1_700_000_000, 501).unwrap();
        assert_ne!(a.hash, later.hashed().hash);

        let mut other_file = sample();
        other_file.entity = "/src/lib.rs".into();
        assert_ne!(a.hash, other_file.hashed().hash);
    }
}
