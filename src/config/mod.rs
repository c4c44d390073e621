use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::job::{JobKind, JobKindConfig, JobSettings};

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL (e.g., "https://api.example.com/Prod")
    pub api_base_url: String,

    /// Path of the durable key/value file backing caches and flags
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Status poll interval for outfit generation jobs
    #[serde(default = "default_outfit_poll_interval_ms")]
    pub outfit_poll_interval_ms: u64,

    /// Status poll interval for try-on render jobs
    #[serde(default = "default_try_on_poll_interval_ms")]
    pub try_on_poll_interval_ms: u64,

    /// Wall-clock bound after which an unfinished job is failed with "timeout"
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Transport timeout for a single HTTP request
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Region used until the stored profile says otherwise
    #[serde(default = "default_region")]
    pub default_region: String,

    /// Local hour from which the weather forecast targets tomorrow
    #[serde(default = "default_evening_cutoff_hour")]
    pub evening_cutoff_hour: u32,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("coordii-store.json")
}

fn default_outfit_poll_interval_ms() -> u64 {
    2000
}

fn default_try_on_poll_interval_ms() -> u64 {
    3000
}

fn default_job_timeout_secs() -> u64 {
    180
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_region() -> String {
    "福岡市博多区".to_string()
}

fn default_evening_cutoff_hour() -> u32 {
    19
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Config with every optional field at its default.
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            store_path: default_store_path(),
            outfit_poll_interval_ms: default_outfit_poll_interval_ms(),
            try_on_poll_interval_ms: default_try_on_poll_interval_ms(),
            job_timeout_secs: default_job_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            default_region: default_region(),
            evening_cutoff_hour: default_evening_cutoff_hour(),
        }
    }

    /// Per-kind polling configuration for the job runner.
    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            outfit: JobKindConfig {
                kind: JobKind::OutfitGeneration,
                poll_interval: Duration::from_millis(self.outfit_poll_interval_ms),
            },
            try_on: JobKindConfig {
                kind: JobKind::TryOnRender,
                poll_interval: Duration::from_millis(self.try_on_poll_interval_ms),
            },
            timeout: Duration::from_secs(self.job_timeout_secs),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
