use super::destination::Destination;
use crate::config::LrwConfig;
use crate::envelope::caliper::{CaliperEvent, SensorEnvelope, CALIPER_DATA_VERSION};
use crate::pipeline::batch::BatchSink;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("LRW returned error status {status}: {message}")]
    ReceiverError { status: u16, message: String },

    #[error("delivery failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: usize, last_error: String },
}

pub type Result<T> = std::result::Result<T, DeliveryError>;

/// What the receiver answered for one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub status: u16,
    /// Response body, kept for diagnostics
    pub body: String,
}

/// HTTP client posting Caliper batches to one destination
#[derive(Debug)]
pub struct CaliperSender {
    destination: Destination,
    client: reqwest::Client,
    retries: usize,
    retry_interval: Duration,
}

impl CaliperSender {
    pub fn new(destination: Destination, config: &LrwConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            destination,
            client,
            retries: config.retries,
            retry_interval: config.retry_interval,
        })
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    fn envelope(&self, batch: &[CaliperEvent]) -> SensorEnvelope {
        SensorEnvelope {
            sensor: self.destination.sensor_id.clone(),
            send_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            data_version: CALIPER_DATA_VERSION.to_string(),
            data: batch.to_vec(),
        }
    }

    /// Post one batch as a single request
    pub async fn send(&self, batch: &[CaliperEvent]) -> Result<DeliveryOutcome> {
        let envelope = self.envelope(batch);

        tracing::info!(
            count = batch.len(),
            destination = %self.destination.kind,
            "Sending events"
        );

        let outcome = self
            .with_retry(|| self.post(&envelope), self.retries + 1)
            .await?;

        tracing::info!(status = outcome.status, "Events sent");
        tracing::debug!(body = %outcome.body, "LRW response");
        Ok(outcome)
    }

    async fn post(&self, envelope: &SensorEnvelope) -> Result<DeliveryOutcome> {
        let response = self
            .client
            .post(&self.destination.endpoint)
            .bearer_auth(&self.destination.token)
            .json(envelope)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(DeliveryError::ReceiverError {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(DeliveryOutcome {
            status: status.as_u16(),
            body,
        })
    }

    /// Run `operation` up to `max_attempts` times with exponential backoff
    async fn with_retry<F, Fut, T>(&self, mut operation: F, max_attempts: usize) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempts = 0;
        let mut backoff = self.retry_interval;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempts += 1;
                    if attempts >= max_attempts {
                        tracing::error!(
                            destination = %self.destination.kind,
                            attempts = attempts,
                            error = %e,
                            "Delivery failed"
                        );
                        if attempts == 1 {
                            return Err(e);
                        }
                        return Err(DeliveryError::MaxRetriesExceeded {
                            attempts,
                            last_error: e.to_string(),
                        });
                    }

                    tracing::warn!(
                        attempt = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Delivery failed, retrying"
                    );

                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, Duration::from_secs(60));
                }
            }
        }
    }
}

#[async_trait]
impl BatchSink for CaliperSender {
    type Error = DeliveryError;

    async fn deliver(&mut self, batch: &[CaliperEvent]) -> Result<()> {
        self.send(batch).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LrwConfig;

    fn lrw_config() -> LrwConfig {
        LrwConfig {
            lrw_type: Some("ltitool".to_string()),
            server: "http://127.0.0.1:9".to_string(),
            token: "secret".to_string(),
            timeout: Duration::from_secs(2),
            retry_interval: Duration::from_millis(10),
            ..LrwConfig::default()
        }
    }

    #[test]
    fn test_envelope_wraps_batch() {
        let config = lrw_config();
        let destination = Destination::from_config(&config).unwrap();
        let sender = CaliperSender::new(destination, &config).unwrap();

        let envelope = sender.envelope(&[]);
        assert_eq!(envelope.sensor, "http://127.0.0.1:9/test_caliper");
        assert_eq!(envelope.data_version, CALIPER_DATA_VERSION);
        assert!(envelope.data.is_empty());
        assert!(envelope.send_time.ends_with('Z'));
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let config = lrw_config();
        let destination = Destination::from_config(&config).unwrap();
        let sender = CaliperSender::new(destination, &config).unwrap();

        let mut calls = 0;
        let result: Result<()> = sender
            .with_retry(
                || {
                    calls += 1;
                    async {
                        Err(DeliveryError::ReceiverError {
                            status: 503,
                            message: "busy".to_string(),
                        })
                    }
                },
                3,
            )
            .await;

        assert_eq!(calls, 3);
        assert!(matches!(
            result,
            Err(DeliveryError::MaxRetriesExceeded { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_single_attempt_returns_original_error() {
        let config = lrw_config();
        let destination = Destination::from_config(&config).unwrap();
        let sender = CaliperSender::new(destination, &config).unwrap();

        let result: Result<()> = sender
            .with_retry(
                || async {
                    Err(DeliveryError::ReceiverError {
                        status: 401,
                        message: "bad token".to_string(),
                    })
                },
                1,
            )
            .await;

        assert!(matches!(
            result,
            Err(DeliveryError::ReceiverError { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_retry_recovers() {
        let config = lrw_config();
        let destination = Destination::from_config(&config).unwrap();
        let sender = CaliperSender::new(destination, &config).unwrap();

        let mut calls = 0;
        let result = sender
            .with_retry(
                || {
                    calls += 1;
                    let attempt = calls;
                    async move {
                        if attempt < 2 {
                            Err(DeliveryError::ReceiverError {
                                status: 502,
                                message: String::new(),
                            })
                        } else {
                            Ok(attempt)
                        }
                    }
                },
                3,
            )
            .await
            .unwrap();

        assert_eq!(result, 2);
    }
}
