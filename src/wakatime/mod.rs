//! WakaTime remote API: data dump client, lookup directories and wire types.

pub mod client;
pub mod lookups;
pub mod traits;
pub mod types;

pub use client::{WakaTimeClient, basic_auth_value};
pub use lookups::{fetch_machine_names, fetch_user_agents};
pub use traits::ExportApi;
pub use types::{
    DataDump, DayEntry, DumpStatus, ExportPayload, HeartbeatEntry, LookupTable, MachineEntry,
    MachineTable, UserAgentEntry, UserAgentTable,
};
