//! Where round batches go.
//!
//! The controller hands each round's full batch to an [`EventSink`] exactly
//! once, including empty batches. [`LogSink`] writes the batch to the log;
//! [`MemorySink`] keeps it for inspection. The `PostgreSQL` sink lives in
//! `feedsim-db`.

use feedsim_events::Event;
use tracing::info;

use crate::error::PersistError;

/// Receives one batch of events per round.
pub trait EventSink: Send {
    /// Persist the events produced in `round` of `experiment_id`.
    ///
    /// `events` may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] if the batch could not be stored. The
    /// controller logs the error and carries on; it never retries.
    fn persist(
        &mut self,
        experiment_id: &str,
        round: u32,
        events: &[Event],
    ) -> impl Future<Output = Result<(), PersistError>> + Send;
}

/// Logs every event line at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl LogSink {
    /// Create a log sink.
    pub const fn new() -> Self {
        Self
    }
}

impl EventSink for LogSink {
    async fn persist(
        &mut self,
        experiment_id: &str,
        round: u32,
        events: &[Event],
    ) -> Result<(), PersistError> {
        for event in events {
            info!(
                experiment_id,
                round,
                event_id = %event.id(),
                actor = %event.actor(),
                "{event}"
            );
        }
        Ok(())
    }
}

/// One batch recorded by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBatch {
    /// Experiment the batch belongs to.
    pub experiment_id: String,
    /// Round index, starting at 0.
    pub round: u32,
    /// The events, in aggregation order.
    pub events: Vec<Event>,
}

/// Keeps every batch in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Vec<PersistedBatch>,
}

impl MemorySink {
    /// Create an empty sink.
    pub const fn new() -> Self {
        Self {
            batches: Vec::new(),
        }
    }

    /// Batches in the order they arrived.
    pub fn batches(&self) -> &[PersistedBatch] {
        &self.batches
    }

    /// Consume the sink, returning its batches.
    pub fn into_batches(self) -> Vec<PersistedBatch> {
        self.batches
    }
}

impl EventSink for MemorySink {
    async fn persist(
        &mut self,
        experiment_id: &str,
        round: u32,
        events: &[Event],
    ) -> Result<(), PersistError> {
        self.batches.push(PersistedBatch {
            experiment_id: experiment_id.to_owned(),
            round,
            events: events.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use feedsim_events::EventKind;
    use feedsim_types::{PostId, UserId};

    use super::*;

    #[tokio::test]
    async fn memory_sink_records_batches_in_order() {
        let mut sink = MemorySink::new();
        let like = Event::new(EventKind::Like {
            user_id: UserId::from_raw(1),
            post_id: PostId::from_raw(2),
        })
        .unwrap();

        assert!(sink.persist("exp", 0, &[]).await.is_ok());
        assert!(sink.persist("exp", 1, std::slice::from_ref(&like)).await.is_ok());

        let batches = sink.into_batches();
        assert_eq!(batches.len(), 2);
        assert_eq!(
            batches.first().map(|b| (b.round, b.events.len())),
            Some((0, 0))
        );
        assert_eq!(
            batches.get(1).map(|b| (b.experiment_id.as_str(), b.events.clone())),
            Some(("exp", vec![like]))
        );
    }

    #[tokio::test]
    async fn log_sink_accepts_empty_batches() {
        let mut sink = LogSink::new();
        assert!(sink.persist("exp", 3, &[]).await.is_ok());
    }
}
