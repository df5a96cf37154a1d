//! The sink selected by `storage.backend`.

use feedsim_core::error::PersistError;
use feedsim_core::sink::{EventSink, LogSink};
use feedsim_db::PgEventSink;
use feedsim_events::Event;

/// Either configured sink, so one experiment type serves both.
pub enum EngineSink {
    /// Event lines go to the log.
    Log(LogSink),
    /// Batches go to the `events` table.
    Postgres(PgEventSink),
}

impl EventSink for EngineSink {
    async fn persist(
        &mut self,
        experiment_id: &str,
        round: u32,
        events: &[Event],
    ) -> Result<(), PersistError> {
        match self {
            Self::Log(sink) => sink.persist(experiment_id, round, events).await,
            Self::Postgres(sink) => sink.persist(experiment_id, round, events).await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use feedsim_events::EventKind;

    use super::*;

    #[tokio::test]
    async fn log_variant_accepts_every_batch() {
        let kind: EventKind = "LikeEvent(user_id=1, post_id=2)".parse().unwrap();
        let mut sink = EngineSink::Log(LogSink::new());

        sink.persist("exp", 0, &[]).await.unwrap();
        sink.persist("exp", 1, &[Event::new(kind).unwrap()]).await.unwrap();
    }
}
