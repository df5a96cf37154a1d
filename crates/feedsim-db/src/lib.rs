//! `PostgreSQL` persistence for feedsim.
//!
//! Stores experiments, their personas, and every round's events. Events
//! are written through [`PgEventSink`], the database-backed implementation
//! of the core sink contract, and read back through [`EventStore`].
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool and migrations
//! - [`event_store`] -- Batch event insertion, queries, reconstruction
//! - [`agent_store`] -- Persona records per experiment
//! - [`experiment_store`] -- Experiment metadata
//! - [`sink`] -- [`PgEventSink`]
//! - [`error`] -- Shared error types

pub mod agent_store;
pub mod error;
pub mod event_store;
pub mod experiment_store;
pub mod postgres;
pub mod sink;

pub use agent_store::{AgentRow, AgentStore};
pub use error::DbError;
pub use event_store::{EventRow, EventStore, rows_to_events};
pub use experiment_store::{ExperimentRow, ExperimentStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use sink::PgEventSink;
