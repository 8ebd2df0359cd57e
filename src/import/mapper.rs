//! Conversion of dumped heartbeats into the canonical heartbeat model.

use crate::models::{Heartbeat, ORIGIN_WAKATIME_IMPORT, User};
use crate::wakatime::{HeartbeatEntry, MachineTable, UserAgentTable};
use chrono::{DateTime, Utc};

/// Substituted for editor, OS, user agent or machine when the id can't be resolved.
pub const UNKNOWN: &str = "unknown";

/// Map one dumped heartbeat onto the canonical model.
///
/// Agent and machine ids are resolved through the lookup tables; unresolvable
/// ids become [`UNKNOWN`] instead of failing the record. Returns `None` if the
/// record's time has no UTC representation.
pub fn map_heartbeat(
    entry: &HeartbeatEntry,
    user_agents: &UserAgentTable,
    machines: &MachineTable,
    user: &User,
) -> Option<Heartbeat> {
    let time = unix_seconds_to_utc(entry.time)?;
    let agent = user_agents.get(entry.user_agent_id.as_deref());
    let machine = machines
        .get(entry.machine_name_id.as_deref())
        .map(|m| m.value.clone())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let (editor, operating_system, user_agent) = match agent {
        Some(agent) => (
            agent.editor.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            agent.os.clone().unwrap_or_else(|| UNKNOWN.to_string()),
            agent.value.clone(),
        ),
        None => (UNKNOWN.to_string(), UNKNOWN.to_string(), UNKNOWN.to_string()),
    };

    let heartbeat = Heartbeat {
        user_id: user.id.clone(),
        entity: entry.entity.clone(),
        entity_type: entry
            .entity_type
            .clone()
            .unwrap_or_else(|| "file".to_string()),
        category: entry.category.clone(),
        project: entry.project.clone(),
        branch: entry.branch.clone(),
        language: entry.language.clone(),
        is_write: entry.is_write.unwrap_or(false),
        editor,
        operating_system,
        machine,
        user_agent,
        time,
        lines: entry.lines,
        line_number: entry.lineno,
        cursor_pos: entry.cursorpos,
        line_additions: entry.line_additions,
        line_deletions: entry.line_deletions,
        origin: ORIGIN_WAKATIME_IMPORT.to_string(),
        origin_id: entry.id.clone(),
        hash: String::new(),
    };
    Some(heartbeat.hashed())
}

/// Fractional unix seconds to a UTC timestamp, nanosecond precision.
///
/// `None` for NaN, infinities and values outside chrono's range.
pub fn unix_seconds_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let whole = seconds.floor();
    if whole < i64::MIN as f64 || whole >= i64::MAX as f64 {
        return None;
    }
    let nanos = ((seconds - whole) * 1e9).round().clamp(0.0, 999_999_999.0) as u32;
    DateTime::from_timestamp(whole as i64, nanos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wakatime::{MachineEntry, UserAgentEntry};

    fn tables() -> (UserAgentTable, MachineTable) {
        let agents: UserAgentTable = [(
            "ua-1".to_string(),
            UserAgentEntry {
                id: "ua-1".into(),
                value: "wakatime/v1.73.0 (linux) vscode/1.80.0".into(),
                editor: Some("vscode".into()),
                os: Some("Linux".into()),
            },
        )]
        .into_iter()
        .collect();
        let machines: MachineTable = [(
            "m-1".to_string(),
            MachineEntry {
                id: "m-1".into(),
                value: "workstation".into(),
            },
        )]
        .into_iter()
        .collect();
        (agents, machines)
    }

    fn entry() -> HeartbeatEntry {
        HeartbeatEntry {
            id: Some("hb-1".into()),
            entity: "/home/alice/project/src/main.rs".into(),
            entity_type: Some("file".into()),
            category: Some("coding".into()),
            project: Some("project".into()),
            branch: Some("main".into()),
            language: Some("Rust".into()),
            is_write: Some(true),
            time: 1_688_000_000.5,
            user_agent_id: Some("ua-1".into()),
            machine_name_id: Some("m-1".into()),
            lines: Some(42),
            lineno: Some(7),
            cursorpos: Some(3),
            line_additions: Some(2),
            line_deletions: Some(1),
        }
    }

    #[test]
    fn maps_and_enriches_known_ids() {
        let (agents, machines) = tables();
        let hb = map_heartbeat(&entry(), &agents, &machines, &User::new("alice")).unwrap();

        assert_eq!(hb.user_id, "alice");
        assert_eq!(hb.entity, "/home/alice/project/src/main.rs");
        assert_eq!(hb.editor, "vscode");
        assert_eq!(hb.operating_system, "Linux");
        assert_eq!(hb.machine, "workstation");
        assert_eq!(hb.user_agent, "wakatime/v1.73.0 (linux) vscode/1.80.0");
        assert_eq!(hb.project.as_deref(), Some("project"));
        assert_eq!(hb.language.as_deref(), Some("Rust"));
        assert!(hb.is_write);
        assert_eq!(hb.line_number, Some(7));
        assert_eq!(hb.origin, ORIGIN_WAKATIME_IMPORT);
        assert_eq!(hb.origin_id.as_deref(), Some("hb-1"));
        assert_eq!(hb.time.timestamp(), 1_688_000_000);
        assert_eq!(hb.time.timestamp_subsec_millis(), 500);
        assert_eq!(hb.hash.len(), 64);
    }

    #[test]
    fn unknown_ids_degrade_to_placeholder() {
        let (agents, machines) = tables();
        let mut raw = entry();
        raw.user_agent_id = Some("missing".into());
        raw.machine_name_id = None;

        let hb = map_heartbeat(&raw, &agents, &machines, &User::new("alice")).unwrap();
        assert_eq!(hb.editor, UNKNOWN);
        assert_eq!(hb.operating_system, UNKNOWN);
        assert_eq!(hb.user_agent, UNKNOWN);
        assert_eq!(hb.machine, UNKNOWN);
    }

    #[test]
    fn empty_tables_never_fail() {
        let hb = map_heartbeat(
            &entry(),
            &UserAgentTable::default(),
            &MachineTable::default(),
            &User::new("bob"),
        )
        .unwrap();
        assert_eq!(hb.user_id, "bob");
        assert_eq!(hb.machine, UNKNOWN);
    }

    #[test]
    fn converts_fractional_seconds() {
        let t = unix_seconds_to_utc(1.25).unwrap();
        assert_eq!(t.timestamp(), 1);
        assert_eq!(t.timestamp_subsec_millis(), 250);
        assert_eq!(unix_seconds_to_utc(0.0), Some(DateTime::<Utc>::UNIX_EPOCH));
    }

    #[test]
    fn unrepresentable_times_are_rejected() {
        assert_eq!(unix_seconds_to_utc(1e20), None);
        assert_eq!(unix_seconds_to_utc(-1e20), None);
        assert_eq!(unix_seconds_to_utc(f64::NAN), None);
        assert_eq!(unix_seconds_to_utc(f64::INFINITY), None);
    }

    #[test]
    fn out_of_range_time_is_not_mapped() {
        let (agents, machines) = tables();
        let mut raw = entry();
        raw.time = 1e20;

        assert!(map_heartbeat(&raw, &agents, &machines, &User::new("alice")).is_none());
    }
}
