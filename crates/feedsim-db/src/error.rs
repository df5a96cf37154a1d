//! Error types for the data layer.
//!
//! All errors are propagated via [`DbError`], which wraps the underlying
//! [`sqlx`] errors and the conversions between domain and column types.

use feedsim_core::error::PersonaError;
use feedsim_events::EventError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored event line no longer decodes.
    #[error("Stored event {row_id} does not decode: {source}")]
    Decode {
        /// Row id in the `events` table.
        row_id: i64,
        /// The codec error.
        source: EventError,
    },

    /// A value does not fit its column type.
    #[error("{field} value {value} is out of range")]
    OutOfRange {
        /// The field being converted.
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// A stored persona could not become a draft.
    #[error("Persona error: {0}")]
    Persona(#[from] PersonaError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DbError {
    pub(crate) fn out_of_range(field: &'static str, value: impl ToString) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
        }
    }
}
