//! Error types for persona preparation and round persistence.
//!
//! Neither surfaces during a round: persona errors happen before the first
//! round, and the controller logs persistence errors and keeps going.

use std::path::PathBuf;

use feedsim_types::TypesError;

/// Errors raised while finalizing persona instructions.
#[derive(Debug, thiserror::Error)]
pub enum PersonaError {
    /// A custom template file could not be read.
    #[error("failed to read persona template {path}: {source}")]
    Io {
        /// The template path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The template failed to compile or render.
    #[error("persona template error: {0}")]
    Template(String),

    /// No user id is left for a new persona.
    #[error("persona identity error: {0}")]
    Identity(#[from] TypesError),
}

impl From<minijinja::Error> for PersonaError {
    fn from(e: minijinja::Error) -> Self {
        Self::Template(e.to_string())
    }
}

/// Errors reported by an [`EventSink`](crate::sink::EventSink).
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// The round index does not fit the sink's storage type.
    #[error("round {0} is out of range for this sink")]
    RoundOutOfRange(u32),

    /// The storage backend rejected the batch.
    #[error("event sink backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
