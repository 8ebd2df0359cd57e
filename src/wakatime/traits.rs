//! Remote export API trait definition

use crate::error::ImportError;
use crate::models::User;
use crate::wakatime::types::{DataDump, MachineTable, UserAgentTable};
use std::future::Future;

/// Remote calls an import run depends on.
///
/// `WakaTimeClient` talks to the real service; tests substitute an in-memory
/// implementation.
pub trait ExportApi: Send + Sync + 'static {
    /// Request a new heartbeats data dump and return its id.
    fn create_export(
        &self,
        user: &User,
    ) -> impl Future<Output = Result<String, ImportError>> + Send;

    /// Look up the current state of a data dump in the dump directory.
    ///
    /// Fails with `ImportError::NotFound` when the directory has no entry for `dump_id`.
    fn check_status(
        &self,
        dump_id: &str,
        user: &User,
    ) -> impl Future<Output = Result<DataDump, ImportError>> + Send;

    /// Fetch the raw export payload.
    fn download(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, ImportError>> + Send;

    fn fetch_user_agents(&self) -> impl Future<Output = Result<UserAgentTable, ImportError>> + Send;

    fn fetch_machine_names(&self) -> impl Future<Output = Result<MachineTable, ImportError>> + Send;
}
