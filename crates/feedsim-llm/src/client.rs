//! The per-agent completion client.
//!
//! Wraps a primary backend, an optional fallback, and the agent's rolling
//! chat context. Every call is bounded by a request timeout; when the
//! primary fails or times out the fallback is asked, and when both fail the
//! agent gets no completion for the round.

use std::time::Duration;

use feedsim_core::completion::{Completion, Prompt};
use feedsim_core::config::{BackendKind, LlmConfig, SamplingConfig};
use tracing::{debug, warn};

use crate::backend::{LlmBackend, create_backend};
use crate::error::LlmError;
use crate::history::{ChatHistory, ChatMessage};

/// Completion client owned by exactly one agent.
pub struct LlmCompletion {
    primary: LlmBackend,
    fallback: Option<LlmBackend>,
    history: ChatHistory,
    sampling: SamplingConfig,
    timeout: Duration,
}

impl LlmCompletion {
    /// Assemble a client from explicit parts.
    pub fn new(
        primary: LlmBackend,
        fallback: Option<LlmBackend>,
        context_window: usize,
        sampling: SamplingConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            primary,
            fallback,
            history: ChatHistory::new(context_window),
            sampling,
            timeout,
        }
    }

    /// Build a client from the `llm` config section, sharing `client`.
    pub fn from_config(config: &LlmConfig, client: &reqwest::Client) -> Self {
        if config.primary.api_key.is_none() && config.primary.kind == BackendKind::OpenAi {
            debug!(api_url = %config.primary.api_url, "primary backend has no API key");
        }
        Self::new(
            create_backend(&config.primary, client.clone()),
            config
                .fallback
                .as_ref()
                .map(|fallback| create_backend(fallback, client.clone())),
            config.context_window,
            config.sampling,
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    /// The agent's chat context so far.
    pub const fn history(&self) -> &ChatHistory {
        &self.history
    }

    async fn ask(
        backend: &LlmBackend,
        messages: &[ChatMessage],
        sampling: &SamplingConfig,
        timeout: Duration,
    ) -> Result<String, LlmError> {
        match tokio::time::timeout(timeout, backend.complete(messages, sampling)).await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Timeout {
                backend: backend.name(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        }
    }
}

impl Completion for LlmCompletion {
    async fn complete(&mut self, prompt: &Prompt<'_>) -> Option<String> {
        self.history.push_user(prompt.user);
        let messages = self.history.request(prompt.system);

        let backends = std::iter::once(&self.primary).chain(self.fallback.as_ref());
        for backend in backends {
            match Self::ask(backend, &messages, &self.sampling, self.timeout).await {
                Ok(reply) => {
                    let reply = reply.trim().to_owned();
                    debug!(
                        backend = backend.name(),
                        reply_len = reply.len(),
                        "completion received"
                    );
                    self.history.push_assistant(reply.clone());
                    return Some(reply);
                }
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "completion failed");
                }
            }
        }

        None
    }
}
