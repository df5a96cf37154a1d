//! Language-model completion backends for feedsim agents.
//!
//! Implements the core [`Completion`] contract over HTTP: `OpenAI`-compatible
//! chat completions and Ollama's native chat API, each agent keeping its
//! own rolling context, with a per-request timeout and an optional
//! fallback backend.
//!
//! # Modules
//!
//! - [`backend`] -- Enum-dispatched HTTP backends and their factory
//! - [`history`] -- Rolling chat context
//! - [`client`] -- [`LlmCompletion`], the per-agent client
//! - [`error`] -- Backend errors
//!
//! [`Completion`]: feedsim_core::completion::Completion
//! [`LlmCompletion`]: client::LlmCompletion

pub mod backend;
pub mod client;
pub mod error;
pub mod history;

pub use backend::{LlmBackend, create_backend, http_client};
pub use client::LlmCompletion;
pub use error::LlmError;
