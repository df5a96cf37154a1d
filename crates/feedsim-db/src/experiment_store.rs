//! Experiment metadata.

use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `experiments` table.
pub struct ExperimentStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ExperimentStore<'a> {
    /// Create an experiment store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record an experiment, updating name, description, and length if it
    /// already exists.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::OutOfRange`] if `max_rounds` does not fit the
    /// column, or [`DbError::Postgres`] if the upsert fails.
    pub async fn upsert(
        &self,
        id: &str,
        name: &str,
        description: Option<&str>,
        max_rounds: u32,
    ) -> Result<(), DbError> {
        let max_rounds = i32::try_from(max_rounds)
            .map_err(|_overflow| DbError::out_of_range("max_rounds", max_rounds))?;

        sqlx::query(
            r"INSERT INTO experiments (id, name, description, max_rounds)
              VALUES ($1, $2, $3, $4)
              ON CONFLICT (id) DO UPDATE
              SET name = EXCLUDED.name,
                  description = EXCLUDED.description,
                  max_rounds = EXCLUDED.max_rounds",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(max_rounds)
        .execute(self.pool)
        .await?;

        tracing::info!(experiment_id = id, name, max_rounds, "Recorded experiment");
        Ok(())
    }

    /// Look up an experiment.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get(&self, id: &str) -> Result<Option<ExperimentRow>, DbError> {
        let row = sqlx::query_as::<_, ExperimentRow>(
            r"SELECT id, name, description, max_rounds, created_at
              FROM experiments
              WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }
}

/// A row from the `experiments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ExperimentRow {
    /// Experiment identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Configured number of rounds.
    pub max_rounds: i32,
    /// Insertion time.
    pub created_at: chrono::DateTime<chrono::Utc>,
}
