//! [`EventSink`] backed by the `events` table.

use feedsim_core::error::PersistError;
use feedsim_core::sink::EventSink;
use feedsim_events::Event;

use crate::event_store::EventStore;
use crate::postgres::PostgresPool;

/// Persists every round batch to `PostgreSQL`.
#[derive(Clone)]
pub struct PgEventSink {
    pool: PostgresPool,
}

impl PgEventSink {
    /// Create a sink writing through `pool`.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

impl EventSink for PgEventSink {
    async fn persist(
        &mut self,
        experiment_id: &str,
        round: u32,
        events: &[Event],
    ) -> Result<(), PersistError> {
        if i32::try_from(round).is_err() {
            return Err(PersistError::RoundOutOfRange(round));
        }
        EventStore::new(self.pool.pool())
            .batch_insert(experiment_id, round, events)
            .await
            .map_err(|e| PersistError::Backend(Box::new(e)))
    }
}
