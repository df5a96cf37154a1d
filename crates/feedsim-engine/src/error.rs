//! Error types for the engine binary.
//!
//! [`EngineError`] wraps every failure that can stop a run before its
//! first round. Nothing inside a round surfaces here.

use std::path::PathBuf;

/// Top-level error for the engine binary.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: feedsim_core::config::ConfigError,
    },

    /// Persona finalization failed.
    #[error("persona error: {source}")]
    Persona {
        /// The underlying persona error.
        #[from]
        source: feedsim_core::error::PersonaError,
    },

    /// Database access failed.
    #[error("database error: {source}")]
    Db {
        /// The underlying database error.
        #[from]
        source: feedsim_db::DbError,
    },

    /// The HTTP client for completion backends could not be built.
    #[error("llm error: {source}")]
    Llm {
        /// The underlying backend error.
        #[from]
        source: feedsim_llm::LlmError,
    },

    /// A persona image could not be read.
    #[error("failed to read persona image {path}: {source}")]
    Image {
        /// The image path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// No personas were found for the run.
    #[error("no personas to run: {message}")]
    NoPersonas {
        /// Where the personas were looked for.
        message: String,
    },
}
