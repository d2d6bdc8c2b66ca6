use super::traits::{EventSource, JobWatermark, RawEvent, StorageError, WatermarkStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::types::Value;
use duckdb::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const DEFAULT_EVENT_TABLE: &str = "useinfo";

/// Render a timestamp for binding as `CAST(? AS TIMESTAMP)`
fn sql_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn timestamp_from_micros(idx: usize, micros: i64) -> Result<DateTime<Utc>, duckdb::Error> {
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        duckdb::Error::FromSqlConversionFailure(
            idx,
            duckdb::types::Type::BigInt,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "invalid timestamp",
            )),
        )
    })
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    conn.lock()
        .map_err(|_| StorageError::Database("connection mutex poisoned".to_string()))
}

/// DuckDB-backed event source and run history.
///
/// One instance is opened per run and dropped when the run ends, which closes
/// the connection on every exit path.
pub struct DuckDbStorage {
    conn: Arc<Mutex<Connection>>,
    event_table: String,
}

impl DuckDbStorage {
    /// Open (or create) the database file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| {
            StorageError::Database(format!("failed to open '{}': {}", path.display(), e))
        })?;
        Ok(Self::from_connection(conn))
    }

    /// Create an in-memory DuckDB storage instance (for testing)
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an existing connection, e.g. a `try_clone` of one used to seed data
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            event_table: DEFAULT_EVENT_TABLE.to_string(),
        }
    }

    /// Read events from `table` instead of `useinfo`.
    ///
    /// The name is interpolated into SQL, so callers must pass a validated
    /// identifier (config validation does this).
    pub fn with_event_table(mut self, table: impl Into<String>) -> Self {
        self.event_table = table.into();
        self
    }

    pub fn event_table(&self) -> &str {
        &self.event_table
    }
}

#[async_trait]
impl WatermarkStore for DuckDbStorage {
    async fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;

            conn.execute("CREATE SEQUENCE IF NOT EXISTS cron_run_info_id_seq", [])?;

            conn.execute(
                "CREATE TABLE IF NOT EXISTS cron_run_info (
                    id BIGINT PRIMARY KEY DEFAULT nextval('cron_run_info_id_seq'),
                    cron_job VARCHAR(64) NOT NULL,
                    last_run_time TIMESTAMP NOT NULL,
                    last_run_status VARCHAR(255) NOT NULL
                )",
                [],
            )?;

            Ok::<(), StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }

    async fn latest_watermark(&self, job_name: &str) -> Result<Option<JobWatermark>, StorageError> {
        let conn = self.conn.clone();
        let job_name = job_name.to_string();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare(
                "SELECT cron_job, epoch_us(last_run_time), last_run_status
                 FROM cron_run_info
                 WHERE cron_job = ?
                 ORDER BY last_run_time DESC, id DESC
                 LIMIT 1",
            )?;

            let mut rows = stmt.query(duckdb::params![job_name])?;

            if let Some(row) = rows.next()? {
                Ok(Some(JobWatermark {
                    job_name: row.get(0)?,
                    last_run_time: timestamp_from_micros(1, row.get::<_, i64>(1)?)?,
                    last_run_status: row.get(2)?,
                }))
            } else {
                Ok(None)
            }
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }

    async fn append_watermark(&self, watermark: &JobWatermark) -> Result<(), StorageError> {
        let conn = self.conn.clone();
        let watermark = watermark.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            conn.execute(
                "INSERT INTO cron_run_info (cron_job, last_run_time, last_run_status)
                 VALUES (?, CAST(? AS TIMESTAMP), ?)",
                duckdb::params![
                    watermark.job_name,
                    sql_timestamp(&watermark.last_run_time),
                    watermark.last_run_status,
                ],
            )?;

            Ok::<(), StorageError>(())
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl EventSource for DuckDbStorage {
    async fn fetch_events(
        &self,
        since: DateTime<Utc>,
        event_types: &[String],
        action_types: &[String],
    ) -> Result<Vec<RawEvent>, StorageError> {
        // `IN ()` is not valid SQL, and an empty set matches nothing anyway
        if event_types.is_empty() || action_types.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = |n: usize| vec!["?"; n].join(", ");
        let sql = format!(
            "SELECT event, act, sid, course_id, div_id, epoch_us(\"timestamp\")
             FROM {table}
             WHERE event IN ({events})
               AND act IN ({acts})
               AND \"timestamp\" >= CAST(? AS TIMESTAMP)",
            table = self.event_table,
            events = placeholders(event_types.len()),
            acts = placeholders(action_types.len()),
        );

        let mut params: Vec<Value> = Vec::with_capacity(event_types.len() + action_types.len() + 1);
        params.extend(event_types.iter().cloned().map(Value::Text));
        params.extend(action_types.iter().cloned().map(Value::Text));
        params.push(Value::Text(sql_timestamp(&since)));

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let mut stmt = conn.prepare(&sql)?;

            let rows = stmt.query_map(duckdb::params_from_iter(params), |row| {
                Ok(RawEvent {
                    event_type: row.get(0)?,
                    action_type: row.get(1)?,
                    subject_id: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    context_id: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    resource_path: row.get(4)?,
                    occurred_at: timestamp_from_micros(5, row.get::<_, i64>(5)?)?,
                })
            })?;

            let mut events = Vec::new();
            for row in rows {
                events.push(row?);
            }
            Ok(events)
        })
        .await
        .map_err(|e| StorageError::Database(format!("Task join error: {}", e)))?
    }
}
