//! Persona records stored per experiment.
//!
//! The `agents` table holds the raw persona of every participant. Loading
//! them yields drafts with freshly allocated user ids; the row id is a
//! storage key, not a simulation identity.

use chrono::{DateTime, Utc};
use feedsim_core::persona::DraftPersona;
use sqlx::PgPool;

use crate::error::DbError;

/// Operations on the `agents` table.
pub struct AgentStore<'a> {
    pool: &'a PgPool,
}

impl<'a> AgentStore<'a> {
    /// Create an agent store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a persona for an experiment and return its row id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert_agent(
        &self,
        experiment_id: &str,
        name: &str,
        instructions: &str,
        image: Option<&[u8]>,
    ) -> Result<i64, DbError> {
        let row: (i64,) = sqlx::query_as(
            r"INSERT INTO agents (experiment_id, name, instructions, image)
              VALUES ($1, $2, $3, $4)
              RETURNING id",
        )
        .bind(experiment_id)
        .bind(name)
        .bind(instructions)
        .bind(image)
        .fetch_one(self.pool)
        .await?;

        tracing::debug!(experiment_id, agent_row = row.0, name, "Stored agent");
        Ok(row.0)
    }

    /// Every persona of an experiment, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn get_agents(&self, experiment_id: &str) -> Result<Vec<AgentRow>, DbError> {
        let rows = sqlx::query_as::<_, AgentRow>(
            r"SELECT id, experiment_id, name, instructions, image, created_at
              FROM agents
              WHERE experiment_id = $1
              ORDER BY id",
        )
        .bind(experiment_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    /// Load an experiment's personas as drafts.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails, or
    /// [`DbError::Persona`] if no user id is left for a draft.
    pub async fn load_drafts(&self, experiment_id: &str) -> Result<Vec<DraftPersona>, DbError> {
        let rows = self.get_agents(experiment_id).await?;
        tracing::info!(experiment_id, agents = rows.len(), "Loaded agents");
        rows.into_iter().map(AgentRow::into_draft).collect()
    }
}

/// A row from the `agents` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AgentRow {
    /// Storage key.
    pub id: i64,
    /// Owning experiment.
    pub experiment_id: String,
    /// Display name.
    pub name: String,
    /// Raw instructions.
    pub instructions: String,
    /// Optional profile image.
    pub image: Option<Vec<u8>>,
    /// Insertion time.
    pub created_at: DateTime<Utc>,
}

impl AgentRow {
    /// Turn the row into a draft with a fresh user id.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Persona`] if no user id is left.
    pub fn into_draft(self) -> Result<DraftPersona, DbError> {
        let draft = DraftPersona::new(self.name, self.instructions)?;
        Ok(match self.image {
            Some(image) => draft.with_image(image),
            None => draft,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn row(id: i64, image: Option<Vec<u8>>) -> AgentRow {
        AgentRow {
            id,
            experiment_id: "exp".to_owned(),
            name: format!("agent{id}"),
            instructions: "Be curious".to_owned(),
            image,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn rows_become_drafts_with_fresh_ids() {
        let a = row(1, None).into_draft().unwrap();
        let b = row(1, Some(vec![9])).into_draft().unwrap();

        assert_eq!(a.name(), "agent1");
        assert_eq!(a.instructions(), "Be curious");
        assert_ne!(a.id(), b.id());
    }
}
