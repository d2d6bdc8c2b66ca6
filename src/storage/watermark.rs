use super::traits::{JobWatermark, StorageError, WatermarkStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub const STATUS_SUCCESS: &str = "success";

pub type Result<T> = std::result::Result<T, StorageError>;

/// Reads and advances the per-job watermark.
///
/// A missing row means the job never completed and yields the configured
/// default; a failed lookup is returned as an error so that an outage is never
/// mistaken for a first run.
pub struct WatermarkTracker {
    store: Arc<dyn WatermarkStore>,
    default_runtime: DateTime<Utc>,
}

impl WatermarkTracker {
    pub fn new(store: Arc<dyn WatermarkStore>, default_runtime: DateTime<Utc>) -> Self {
        Self {
            store,
            default_runtime,
        }
    }

    pub async fn get_last_runtime(&self, job_name: &str) -> Result<DateTime<Utc>> {
        match self.store.latest_watermark(job_name).await? {
            Some(watermark) => {
                tracing::info!(
                    job = %job_name,
                    last_run_time = %watermark.last_run_time,
                    status = %watermark.last_run_status,
                    "Resuming from last completed run"
                );
                Ok(watermark.last_run_time)
            }
            None => {
                tracing::info!(
                    job = %job_name,
                    default = %self.default_runtime,
                    "No previous run recorded, using default watermark"
                );
                Ok(self.default_runtime)
            }
        }
    }

    /// Append a completion row. Only call once every batch of the run was delivered.
    pub async fn record_completion(
        &self,
        job_name: &str,
        completed_at: DateTime<Utc>,
        status: &str,
    ) -> Result<()> {
        let watermark = JobWatermark {
            job_name: job_name.to_string(),
            last_run_time: completed_at,
            last_run_status: status.to_string(),
        };

        self.store.append_watermark(&watermark).await.map_err(|e| {
            tracing::error!(job = %job_name, error = %e, "Failed to record run completion");
            e
        })?;

        tracing::info!(job = %job_name, last_run_time = %completed_at, "Run completion recorded");
        Ok(())
    }
}
