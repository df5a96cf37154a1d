//! Batch insertion and querying of round events.
//!
//! Each stored row keeps the canonical line, which is the source of truth
//! for reconstruction, next to a JSON payload for ad-hoc SQL analysis.

use chrono::{DateTime, Utc};
use feedsim_events::{Event, EventKind};
use feedsim_types::EventId;
use sqlx::PgPool;

use crate::error::DbError;

/// Default batch size for event inserts.
const DEFAULT_BATCH_SIZE: usize = 500;

/// Operations on the `events` table.
pub struct EventStore<'a> {
    pool: &'a PgPool,
    batch_size: usize,
}

impl<'a> EventStore<'a> {
    /// Create an event store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size for inserts.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = if size == 0 { 1 } else { size };
        self
    }

    /// Insert one round's events, keeping their order.
    ///
    /// Each chunk is a single `INSERT ... SELECT FROM UNNEST(...)`. All
    /// chunks share one transaction, so a round is stored whole or not at
    /// all. An empty batch is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::OutOfRange`] if an id or the round does not fit
    /// its column, [`DbError::Serialization`] if a payload fails to
    /// serialize, or [`DbError::Postgres`] if the insert fails.
    pub async fn batch_insert(
        &self,
        experiment_id: &str,
        round: u32,
        events: &[Event],
    ) -> Result<(), DbError> {
        if events.is_empty() {
            return Ok(());
        }

        let round = i32::try_from(round).map_err(|_overflow| DbError::out_of_range("round", round))?;
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for chunk in events.chunks(self.batch_size) {
            let len = chunk.len();
            let mut experiment_ids = Vec::with_capacity(len);
            let mut rounds = Vec::with_capacity(len);
            let mut event_ids = Vec::with_capacity(len);
            let mut kinds = Vec::with_capacity(len);
            let mut actor_ids = Vec::with_capacity(len);
            let mut lines = Vec::with_capacity(len);
            let mut payloads = Vec::with_capacity(len);
            let mut timestamps = Vec::with_capacity(len);

            for event in chunk {
                experiment_ids.push(experiment_id.to_owned());
                rounds.push(round);
                event_ids.push(to_bigint("event_id", event.id().into_inner())?);
                kinds.push(event.name().to_owned());
                actor_ids.push(to_bigint("actor_id", event.actor().into_inner())?);
                lines.push(event.to_string());
                payloads.push(serde_json::to_value(event.kind())?);
                timestamps.push(now);
            }

            sqlx::query(
                r"INSERT INTO events (experiment_id, round, event_id, kind, actor_id, line, payload, created_at)
                  SELECT * FROM UNNEST($1::TEXT[], $2::INTEGER[], $3::BIGINT[], $4::TEXT[], $5::BIGINT[], $6::TEXT[], $7::JSONB[], $8::TIMESTAMPTZ[])",
            )
            .bind(&experiment_ids)
            .bind(&rounds)
            .bind(&event_ids)
            .bind(&kinds)
            .bind(&actor_ids)
            .bind(&lines)
            .bind(&payloads)
            .bind(&timestamps)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            experiment_id,
            round,
            count = events.len(),
            "Inserted events (batch UNNEST)"
        );
        Ok(())
    }

    /// Events of one round, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_events_by_round(
        &self,
        experiment_id: &str,
        round: u32,
    ) -> Result<Vec<EventRow>, DbError> {
        let round = i32::try_from(round).map_err(|_overflow| DbError::out_of_range("round", round))?;
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT id, experiment_id, round, event_id, kind, actor_id, line, payload, created_at
              FROM events
              WHERE experiment_id = $1 AND round = $2
              ORDER BY id",
        )
        .bind(experiment_id)
        .bind(round)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Every event of an experiment, by round then insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_events(&self, experiment_id: &str) -> Result<Vec<EventRow>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT id, experiment_id, round, event_id, kind, actor_id, line, payload, created_at
              FROM events
              WHERE experiment_id = $1
              ORDER BY round, id",
        )
        .bind(experiment_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// The highest round stored for an experiment, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn last_round(&self, experiment_id: &str) -> Result<Option<u32>, DbError> {
        let row: (Option<i32>,) =
            sqlx::query_as(r"SELECT MAX(round) FROM events WHERE experiment_id = $1")
                .bind(experiment_id)
                .fetch_one(self.pool)
                .await?;

        row.0
            .map(|round| u32::try_from(round).map_err(|_overflow| DbError::out_of_range("round", round)))
            .transpose()
    }
}

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Auto-incremented row id.
    pub id: i64,
    /// Experiment the event belongs to.
    pub experiment_id: String,
    /// Round the event was produced in.
    pub round: i32,
    /// The in-process event id at the time of the run.
    pub event_id: i64,
    /// Line prefix naming the kind, e.g. `LikeEvent`.
    pub kind: String,
    /// Acting user id.
    pub actor_id: i64,
    /// The canonical event line.
    pub line: String,
    /// JSON rendering of the event kind.
    pub payload: serde_json::Value,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

impl EventRow {
    /// Rebuild the event from its stored line, keeping every stored id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] if the line no longer decodes, or
    /// [`DbError::OutOfRange`] if the stored event id is negative.
    pub fn to_event(&self) -> Result<Event, DbError> {
        let kind: EventKind = self.line.parse().map_err(|source| DbError::Decode {
            row_id: self.id,
            source,
        })?;
        let id = u64::try_from(self.event_id)
            .map_err(|_overflow| DbError::out_of_range("event_id", self.event_id))?;
        Ok(Event::with_id(EventId::from_raw(id), kind))
    }
}

/// Rebuild a batch of rows, in row order.
///
/// # Errors
///
/// Returns the first row's [`DbError`].
pub fn rows_to_events(rows: &[EventRow]) -> Result<Vec<Event>, DbError> {
    rows.iter().map(EventRow::to_event).collect()
}

fn to_bigint(field: &'static str, value: u64) -> Result<i64, DbError> {
    i64::try_from(value).map_err(|_overflow| DbError::out_of_range(field, value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use feedsim_types::{Post, PostId, UserId};

    use super::*;

    fn row(line: &str, event_id: i64) -> EventRow {
        EventRow {
            id: 1,
            experiment_id: "exp".to_owned(),
            round: 0,
            event_id,
            kind: line.split('(').next().unwrap_or_default().to_owned(),
            actor_id: 2,
            line: line.to_owned(),
            payload: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_rebuilds_event_with_stored_ids() {
        let line = "PostEvent(user_id=2, post=Post(id=101, content=Hello, world!))";
        let event = row(line, 42).to_event().unwrap();

        assert_eq!(event.id(), EventId::from_raw(42));
        assert_eq!(
            event.kind(),
            &EventKind::Post {
                user_id: UserId::from_raw(2),
                post: Post::with_id(PostId::from_raw(101), "Hello, world!").unwrap(),
            }
        );
        assert_eq!(event.to_string(), line);
    }

    #[test]
    fn undecodable_row_reports_its_id() {
        let result = row("GARBAGE", 1).to_event();
        assert!(matches!(result, Err(DbError::Decode { row_id: 1, .. })));
    }

    #[test]
    fn negative_event_id_is_out_of_range() {
        let result = row("LikeEvent(user_id=1, post_id=2)", -5).to_event();
        assert!(matches!(
            result,
            Err(DbError::OutOfRange {
                field: "event_id",
                ..
            })
        ));
    }

    #[test]
    fn rows_to_events_keeps_order() {
        let rows = vec![
            row("LikeEvent(user_id=1, post_id=2)", 10),
            row("DislikeEvent(user_id=1, post_id=3)", 11),
        ];
        let events = rows_to_events(&rows).unwrap();
        let names: Vec<&str> = events.iter().map(Event::name).collect();
        assert_eq!(names, vec!["LikeEvent", "DislikeEvent"]);
    }

    #[test]
    fn ids_beyond_bigint_are_rejected() {
        assert!(to_bigint("event_id", u64::MAX).is_err());
        assert_eq!(to_bigint("event_id", 7).ok(), Some(7));
    }
}
