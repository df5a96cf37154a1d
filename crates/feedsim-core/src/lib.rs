//! Personas, agent turns, and the round controller for feedsim.
//!
//! This crate owns the simulation loop: each round every agent sees the
//! previous round's events, turns run concurrently, and the aggregated batch
//! is persisted and carried forward. Text generation and storage are
//! reached only through the [`Completion`] and [`EventSink`] traits.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `feedsim-config.yaml`
//! - [`persona`] -- Draft and finalized personas, the user directory
//! - [`completion`] -- [`Completion`] trait and [`Prompt`]
//! - [`agent`] -- One agent's turn and structural filtering
//! - [`sink`] -- [`EventSink`] trait, [`LogSink`], [`MemorySink`]
//! - [`experiment`] -- The concurrent round controller
//! - [`error`] -- Persona and persistence errors
//!
//! [`Completion`]: completion::Completion
//! [`Prompt`]: completion::Prompt
//! [`EventSink`]: sink::EventSink
//! [`LogSink`]: sink::LogSink
//! [`MemorySink`]: sink::MemorySink

pub mod agent;
pub mod completion;
pub mod config;
pub mod error;
pub mod experiment;
pub mod persona;
pub mod sink;
