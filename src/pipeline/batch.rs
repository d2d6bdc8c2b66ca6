use crate::envelope::{CaliperEvent, Translator};
use crate::storage::RawEvent;
use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Receives full (or final partial) batches, one at a time, in order
#[async_trait]
pub trait BatchSink: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn deliver(&mut self, batch: &[CaliperEvent]) -> Result<(), Self::Error>;
}

/// Accumulates events and hands them to the sink in batches of `batch_size`
pub struct BatchDispatcher<'a, S: BatchSink> {
    sink: &'a mut S,
    batch_size: usize,
    batch: Vec<CaliperEvent>,
    batches_sent: usize,
}

impl<'a, S: BatchSink> BatchDispatcher<'a, S> {
    /// `batch_size` must be positive; config validation rejects zero
    pub fn new(sink: &'a mut S, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            sink,
            batch_size,
            batch: Vec::with_capacity(batch_size),
            batches_sent: 0,
        }
    }

    pub async fn push(&mut self, event: CaliperEvent) -> Result<(), S::Error> {
        self.batch.push(event);
        if self.batch.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), S::Error> {
        if self.batch.is_empty() {
            return Ok(());
        }
        self.sink.deliver(&self.batch).await?;
        self.batches_sent += 1;
        debug!(count = self.batch.len(), batch = self.batches_sent, "Flushed batch");
        self.batch.clear();
        Ok(())
    }

    /// Flush the trailing partial batch, if any, and return the number of batches sent
    pub async fn finish(mut self) -> Result<usize, S::Error> {
        self.flush().await?;
        Ok(self.batches_sent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub fetched: usize,
    pub translated: usize,
    pub skipped: usize,
    pub batches: usize,
}

/// Translate `events` in order and deliver them through `sink` in batches.
///
/// Events whose type pair has no translation rule are skipped and reported.
/// The first delivery error aborts the dispatch.
pub async fn dispatch<S: BatchSink>(
    events: &[RawEvent],
    translator: &Translator,
    sink: &mut S,
    batch_size: usize,
) -> Result<DispatchSummary, S::Error> {
    let mut summary = DispatchSummary {
        fetched: events.len(),
        ..DispatchSummary::default()
    };
    let mut untranslated: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    let mut dispatcher = BatchDispatcher::new(sink, batch_size);

    for raw in events {
        match translator.translate(raw) {
            Some(event) => {
                summary.translated += 1;
                dispatcher.push(event).await?;
            }
            None => {
                summary.skipped += 1;
                *untranslated
                    .entry((raw.event_type.as_str(), raw.action_type.as_str()))
                    .or_default() += 1;
            }
        }
    }

    summary.batches = dispatcher.finish().await?;

    for ((event_type, action_type), count) in untranslated {
        warn!(
            event_type = %event_type,
            action_type = %action_type,
            count = count,
            "Fetched events have no translation rule and were not sent"
        );
    }

    Ok(summary)
}
