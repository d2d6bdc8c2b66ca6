use crate::config::{parse_runtime, Config, ConfigError};
use crate::delivery::{CaliperSender, DeliveryError, Destination};
use crate::envelope::{TranslationTable, Translator};
use crate::pipeline::batch::{dispatch, BatchSink, DispatchSummary};
use crate::storage::duckdb::DuckDbStorage;
use crate::storage::watermark::{WatermarkTracker, STATUS_SUCCESS};
use crate::storage::{EventSource, StorageError, WatermarkStore};
use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors that abort a run. None of them record a completion.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub job_name: String,
    /// Lower bound used for the fetch
    pub watermark: DateTime<Utc>,
    /// Watermark recorded for the next run
    pub recorded: DateTime<Utc>,
    pub summary: DispatchSummary,
}

/// Run one pass against the configured database and LRW.
///
/// The destination is resolved before the database is opened, so a bad
/// destination fails the run without reading or recording anything. The
/// database connection lives for this call only.
pub async fn run_once(config: &Config) -> Result<RunReport, RunError> {
    let destination = Destination::from_config(&config.lrw)?;
    info!(
        destination = %destination.kind,
        endpoint = %destination.redacted_endpoint(),
        "Resolved LRW destination"
    );
    let mut sender = CaliperSender::new(destination, &config.lrw)?;

    info!(path = %config.database.path.display(), "Connecting to database");
    let storage = Arc::new(
        DuckDbStorage::new(&config.database.path)?.with_event_table(config.source.table.as_str()),
    );

    let translator = Translator::new(TranslationTable::default(), config.lrw.organization.as_str());

    run_pipeline(config, storage.clone(), storage.as_ref(), &translator, &mut sender).await
}

/// Extract, translate, deliver, then record completion.
pub async fn run_pipeline<S>(
    config: &Config,
    store: Arc<dyn WatermarkStore>,
    source: &dyn EventSource,
    translator: &Translator,
    sink: &mut S,
) -> Result<RunReport, RunError>
where
    S: BatchSink<Error = DeliveryError>,
{
    let job_name = config.pipeline.job_name.as_str();
    let default_runtime = parse_runtime(&config.pipeline.first_runtime)?;

    store.init_schema().await?;
    let tracker = WatermarkTracker::new(store, default_runtime);

    let watermark = tracker.get_last_runtime(job_name).await?;

    // Everything that occurred before this instant is covered by the fetch
    // below, so it is safe to resume from here next time. Microseconds match
    // the stored precision.
    let horizon = Utc::now().trunc_subsecs(6).max(watermark);

    let events = source
        .fetch_events(
            watermark,
            &config.source.event_types,
            &config.source.action_types,
        )
        .await?;
    info!(job = %job_name, since = %watermark, count = events.len(), "Fetched events");

    let summary = dispatch(&events, translator, sink, config.pipeline.batch_size).await?;

    tracker
        .record_completion(job_name, horizon, STATUS_SUCCESS)
        .await?;

    info!(
        job = %job_name,
        fetched = summary.fetched,
        translated = summary.translated,
        skipped = summary.skipped,
        batches = summary.batches,
        next_watermark = %horizon,
        "Run complete"
    );

    Ok(RunReport {
        job_name: job_name.to_string(),
        watermark,
        recorded: horizon,
        summary,
    })
}
