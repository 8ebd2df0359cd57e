use crate::error::ImportError;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.wakatime.com/api/v1";
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 1024 * 1024 * 1024;

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_secs(key: &str, default_secs: u64) -> Duration {
    Duration::from_secs(env_u64(key, default_secs))
}

fn env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Runtime configuration for data dump imports.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    pub api_url: String,
    pub poll_interval: Duration,
    /// Upper bound on how long a run waits for the dump to become downloadable.
    pub max_wait: Duration,
    /// Upper bound on status checks per run, 0 disables the tick limit.
    pub max_poll_ticks: u64,
    pub request_timeout: Duration,
    pub download_timeout: Duration,
    /// Upper bound on the decoded payload size, applied after gzip inflation.
    pub max_payload_bytes: usize,
    pub stream_buffer: usize,
}

impl ImporterConfig {
    pub fn from_env() -> Self {
        Self {
            api_url: env_string("WAKATIME_API_URL", DEFAULT_API_URL),
            poll_interval: env_duration_secs("IMPORT_POLL_INTERVAL_SECS", 10),
            max_wait: env_duration_secs("IMPORT_MAX_WAIT_SECS", 3600),
            max_poll_ticks: env_u64("IMPORT_MAX_POLL_TICKS", 0),
            request_timeout: env_duration_secs("IMPORT_REQUEST_TIMEOUT_SECS", 10),
            download_timeout: env_duration_secs("IMPORT_DOWNLOAD_TIMEOUT_SECS", 300),
            max_payload_bytes: env_usize("IMPORT_MAX_PAYLOAD_BYTES", DEFAULT_MAX_PAYLOAD_BYTES),
            stream_buffer: env_usize("IMPORT_STREAM_BUFFER", 1).max(1),
        }
    }

    pub fn validate(&self) -> Result<(), ImportError> {
        if self.api_url.trim().is_empty() {
            return Err(ImportError::Config("api_url must not be empty".to_string()));
        }
        if self.poll_interval.is_zero() {
            return Err(ImportError::Config(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        if self.max_payload_bytes == 0 {
            return Err(ImportError::Config(
                "max_payload_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url.trim_end_matches('/'), path)
    }
}

impl Default for ImporterConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
