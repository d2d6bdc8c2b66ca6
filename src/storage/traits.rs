use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One learner interaction row from the event table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    pub event_type: String,
    pub action_type: String,
    pub subject_id: String,
    pub context_id: String,
    /// Slash-delimited navigation path, e.g. `/runestone/static/book/chapter/page.html`
    pub resource_path: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// One row of the run history table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobWatermark {
    pub job_name: String,
    pub last_run_time: DateTime<Utc>,
    pub last_run_status: String,
}

#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Create the run history table if it does not exist
    async fn init_schema(&self) -> Result<(), StorageError>;

    /// Most recent completion for `job_name`, or `None` if the job never completed
    async fn latest_watermark(&self, job_name: &str) -> Result<Option<JobWatermark>, StorageError>;

    /// Append a completion row
    async fn append_watermark(&self, watermark: &JobWatermark) -> Result<(), StorageError>;
}

#[async_trait]
pub trait EventSource: Send + Sync {
    /// All events with `occurred_at >= since` whose event type and action type
    /// are both in the given sets, in source order.
    async fn fetch_events(
        &self,
        since: DateTime<Utc>,
        event_types: &[String],
        action_types: &[String],
    ) -> Result<Vec<RawEvent>, StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("invalid row: {0}")]
    InvalidRow(String),
}

impl From<duckdb::Error> for StorageError {
    fn from(e: duckdb::Error) -> Self {
        StorageError::Database(e.to_string())
    }
}
