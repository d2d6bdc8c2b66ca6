use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FIRST_RUNTIME: &str = "2019-02-01 19:53:23";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub lrw: LrwConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("runestone.duckdb"),
        }
    }
}

/// Which rows of the event table a run picks up
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub table: String,
    pub event_types: Vec<String>,
    pub action_types: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            table: "useinfo".to_string(),
            event_types: vec!["page".to_string()],
            action_types: vec!["view".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub job_name: String,
    /// Watermark used when the job has never completed. Accepts
    /// `YYYY-MM-DD HH:MM:SS` with either a space or a `T` separator.
    pub first_runtime: String,
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            job_name: "caliper_sender".to_string(),
            first_runtime: DEFAULT_FIRST_RUNTIME.to_string(),
            batch_size: 5,
        }
    }
}

/// Learning Record Warehouse destination settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LrwConfig {
    /// Destination kind, `unizin` or `ltitool`. Left unset, every run fails.
    #[serde(rename = "type")]
    pub lrw_type: Option<String>,
    pub server: String,
    pub token: String,
    pub sensor_id: Option<String>,
    pub organization: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub retries: usize,
    #[serde(with = "humantime_serde")]
    pub retry_interval: Duration,
}

impl Default for LrwConfig {
    fn default() -> Self {
        Self {
            lrw_type: None,
            server: String::new(),
            token: String::new(),
            sensor_id: None,
            organization: "Umich".to_string(),
            timeout: Duration::from_secs(30),
            retries: 0,
            retry_interval: Duration::from_secs(1),
        }
    }
}

impl LrwConfig {
    /// Sensor id reported in each envelope, derived from the server when unset
    pub fn sensor_id(&self) -> String {
        match &self.sensor_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => format!("{}/test_caliper", self.server),
        }
    }
}
