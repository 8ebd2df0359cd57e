use super::lookups::{fetch_machine_names, fetch_user_agents};
use super::traits::ExportApi;
use super::types::{
    CreateDumpRequest, DataDump, DataDumpList, DataDumpResult, MachineTable, UserAgentTable,
};
use crate::config::ImporterConfig;
use crate::error::ImportError;
use crate::models::User;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use std::time::Duration;

pub const DATA_DUMPS_PATH: &str = "/users/current/data_dumps";
pub const USER_AGENTS_PATH: &str = "/users/current/user_agents";
pub const MACHINE_NAMES_PATH: &str = "/users/current/machine_names";

const USER_AGENT: &str = "heartbeat-importer/0.1";

/// Value of the `Authorization` header for an API key.
pub fn basic_auth_value(api_key: &str) -> String {
    format!("Basic {}", STANDARD.encode(api_key.as_bytes()))
}

/// Attach the JSON and credential headers every remote call carries.
pub(crate) fn with_headers(request: RequestBuilder, authorization: &str) -> RequestBuilder {
    request
        .header(AUTHORIZATION, authorization)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json")
}

/// Read a response body, turning any non-success status into `ImportError::Status`.
pub(crate) async fn read_success_body(response: Response) -> Result<Vec<u8>, ImportError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(ImportError::status(status, body));
    }

    Ok(response.bytes().await?.to_vec())
}

/// Pick the dump with `dump_id` out of the user's dump directory.
pub(crate) fn find_dump(
    directory: DataDumpList,
    dump_id: &str,
    user: &User,
) -> Result<DataDump, ImportError> {
    directory
        .data
        .into_iter()
        .find(|dump| dump.id == dump_id)
        .ok_or_else(|| ImportError::NotFound {
            dump_id: dump_id.to_string(),
            user_id: user.id.clone(),
        })
}

/// HTTP client for the WakaTime data dump API.
///
/// One underlying connection pool is shared by dump creation, every status
/// poll and the lookup fetches. Downloads get their own long-timeout client.
#[derive(Clone)]
pub struct WakaTimeClient {
    http: reqwest::Client,
    config: ImporterConfig,
    authorization: String,
}

impl WakaTimeClient {
    pub fn new(api_key: &str, config: ImporterConfig) -> Result<Self, ImportError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            config,
            authorization: basic_auth_value(api_key),
        })
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    async fn request_dump(&self) -> Result<String, ImportError> {
        let payload = CreateDumpRequest {
            dump_type: "heartbeats",
            email_when_finished: false,
        };

        let request = self
            .http
            .post(self.config.endpoint(DATA_DUMPS_PATH))
            .json(&payload);
        let response = with_headers(request, &self.authorization).send().await?;
        let body = read_success_body(response).await?;
        let parsed: DataDumpResult = serde_json::from_slice(&body)?;

        Ok(parsed.data.id)
    }
}

impl ExportApi for WakaTimeClient {
    async fn create_export(&self, user: &User) -> Result<String, ImportError> {
        let dump_id = self.request_dump().await?;
        log::info!(
            "import {}: requested data dump '{}'",
            user.id,
            dump_id
        );
        Ok(dump_id)
    }

    async fn check_status(&self, dump_id: &str, user: &User) -> Result<DataDump, ImportError> {
        let request = self.http.get(self.config.endpoint(DATA_DUMPS_PATH));
        let response = with_headers(request, &self.authorization).send().await?;
        let body = read_success_body(response).await?;
        let directory: DataDumpList = serde_json::from_slice(&body)?;

        find_dump(directory, dump_id, user)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ImportError> {
        // Download URLs are pre-signed, so no credentials are attached here.
        let client = reqwest::Client::builder()
            .timeout(self.config.download_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        let response = client.get(url).send().await?;
        read_success_body(response).await
    }

    async fn fetch_user_agents(&self) -> Result<UserAgentTable, ImportError> {
        fetch_user_agents(&self.http, &self.config.api_url, &self.authorization).await
    }

    async fn fetch_machine_names(&self) -> Result<MachineTable, ImportError> {
        fetch_machine_names(&self.http, &self.config.api_url, &self.authorization).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_encodes_raw_api_key() {
        assert_eq!(
            basic_auth_value("waka_123"),
            "Basic d2FrYV8xMjM="
        );
    }

    #[test]
    fn with_headers_sets_json_and_credentials() {
        let http = reqwest::Client::new();
        let request = with_headers(http.get("https://wakatime.test/x"), "Basic abc")
            .build()
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers[AUTHORIZATION], "Basic abc");
        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers[ACCEPT], "application/json");
    }

    fn directory() -> DataDumpList {
        serde_json::from_value(serde_json::json!({
            "data": [
                {"id": "older", "status": "Completed", "percent_complete": 100.0,
                 "download_url": "https://dumps.test/older.json", "type": "heartbeats"},
                {"id": "dump-2", "status": "Processing", "percent_complete": 40.0,
                 "type": "heartbeats", "is_processing": true}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn find_dump_matches_on_id() {
        let dump = find_dump(directory(), "dump-2", &User::new("alice")).unwrap();
        assert_eq!(dump.id, "dump-2");
        assert_eq!(dump.percent_complete, 40.0);
        assert!(!dump.is_downloadable());
    }

    #[test]
    fn find_dump_reports_missing_id() {
        let err = find_dump(directory(), "dump-9", &User::new("alice")).unwrap_err();
        match err {
            ImportError::NotFound { dump_id, user_id } => {
                assert_eq!(dump_id, "dump-9");
                assert_eq!(user_id, "alice");
            }
            other => panic!("expected NotFound, got {other}"),
        }
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = ImporterConfig {
            api_url: String::new(),
            ..ImporterConfig::default()
        };
        assert!(matches!(
            WakaTimeClient::new("key", config),
            Err(ImportError::Config(_))
        ));
    }
}
