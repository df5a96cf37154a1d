//! HTTP completion backends.
//!
//! Enum dispatch over the supported API flavors, so a backend can be
//! stored and awaited without boxing. Both send the full chat context and
//! return the reply text.

use std::time::Duration;

use feedsim_core::config::{BackendConfig, BackendKind, SamplingConfig};
use serde_json::{Value, json};

use crate::error::LlmError;
use crate::history::ChatMessage;

/// A completion backend.
pub enum LlmBackend {
    /// `OpenAI`-compatible chat completions API.
    OpenAi(OpenAiBackend),
    /// Ollama native chat API.
    Ollama(OllamaBackend),
}

impl LlmBackend {
    /// Send `messages` and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] if the request fails, the status is not a
    /// success, or the reply text is missing.
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        sampling: &SamplingConfig,
    ) -> Result<String, LlmError> {
        match self {
            Self::OpenAi(backend) => backend.complete(messages, sampling).await,
            Self::Ollama(backend) => backend.complete(messages, sampling).await,
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OpenAi(_) => OPENAI,
            Self::Ollama(_) => OLLAMA,
        }
    }
}

const OPENAI: &str = "openai-compatible";
const OLLAMA: &str = "ollama";

/// Backend for OpenAI-compatible chat completions APIs.
///
/// Sends requests to `{api_url}/chat/completions`.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiBackend {
    /// Create a backend sharing `client`.
    pub fn new(config: &BackendConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        sampling: &SamplingConfig,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.api_url);
        let body = openai_body(&self.model, messages, sampling);

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let json = send(OPENAI, request).await?;
        extract_openai_content(&json)
    }
}

/// Backend for Ollama's native chat API.
///
/// Sends non-streaming requests to `{api_url}/api/chat`.
pub struct OllamaBackend {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a backend sharing `client`.
    pub fn new(config: &BackendConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
        }
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        sampling: &SamplingConfig,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.api_url);
        let body = ollama_body(&self.model, messages, sampling);

        let json = send(OLLAMA, self.client.post(&url).json(&body)).await?;
        extract_ollama_content(&json)
    }
}

async fn send(backend: &'static str, request: reqwest::RequestBuilder) -> Result<Value, LlmError> {
    let response = request.send().await.map_err(|e| LlmError::Request {
        backend,
        message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error body".to_owned());
        return Err(LlmError::Status {
            backend,
            status: status.as_u16(),
            body,
        });
    }

    response.json().await.map_err(|e| LlmError::Request {
        backend,
        message: format!("response parse failed: {e}"),
    })
}

fn openai_body(model: &str, messages: &[ChatMessage], sampling: &SamplingConfig) -> Value {
    json!({
        "model": model,
        "messages": messages,
        "temperature": sampling.temperature,
        "top_p": sampling.top_p,
        "max_tokens": sampling.max_tokens,
    })
}

fn ollama_body(model: &str, messages: &[ChatMessage], sampling: &SamplingConfig) -> Value {
    json!({
        "model": model,
        "messages": messages,
        "stream": false,
        "options": {
            "temperature": sampling.temperature,
            "top_p": sampling.top_p,
            "num_predict": sampling.max_tokens,
        },
    })
}

/// Extract the reply from an `OpenAI` chat completions response.
fn extract_openai_content(json: &Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or(LlmError::MissingContent {
            backend: OPENAI,
            path: "choices[0].message.content",
        })
}

/// Extract the reply from an Ollama chat (or generate) response.
fn extract_ollama_content(json: &Value) -> Result<String, LlmError> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .or_else(|| json.get("response"))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
        .ok_or(LlmError::MissingContent {
            backend: OLLAMA,
            path: "message.content",
        })
}

/// Build a shared HTTP client.
///
/// # Errors
///
/// Returns [`LlmError::Client`] if the TLS backend cannot initialize.
pub fn http_client(connect_timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| LlmError::Client(e.to_string()))
}

/// Create a backend from configuration.
pub fn create_backend(config: &BackendConfig, client: reqwest::Client) -> LlmBackend {
    match config.kind {
        BackendKind::OpenAi => LlmBackend::OpenAi(OpenAiBackend::new(config, client)),
        BackendKind::Ollama => LlmBackend::Ollama(OllamaBackend::new(config, client)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Role;

    fn backend_config(kind: BackendKind) -> BackendConfig {
        BackendConfig {
            kind,
            api_url: "http://localhost:11434/".to_owned(),
            model: "test-model".to_owned(),
            api_key: None,
        }
    }

    #[test]
    fn extract_openai_content_valid() {
        let json = json!({
            "choices": [{
                "message": {"content": "LikeEvent(user_id=1, post_id=2)"}
            }]
        });
        assert_eq!(
            extract_openai_content(&json).ok().as_deref(),
            Some("LikeEvent(user_id=1, post_id=2)")
        );
    }

    #[test]
    fn extract_openai_content_missing_choices() {
        let json = json!({"error": "rate_limit"});
        assert!(matches!(
            extract_openai_content(&json),
            Err(LlmError::MissingContent { .. })
        ));
    }

    #[test]
    fn extract_ollama_chat_content() {
        let json = json!({"message": {"role": "assistant", "content": "hi"}, "done": true});
        assert_eq!(extract_ollama_content(&json).ok().as_deref(), Some("hi"));
    }

    #[test]
    fn extract_ollama_generate_content() {
        let json = json!({"response": "hello", "done": true});
        assert_eq!(extract_ollama_content(&json).ok().as_deref(), Some("hello"));
    }

    #[test]
    fn extract_ollama_content_missing() {
        assert!(extract_ollama_content(&json!({"done": true})).is_err());
    }

    #[test]
    fn openai_body_carries_sampling_and_messages() {
        let messages = vec![
            ChatMessage::new(Role::System, "sys"),
            ChatMessage::new(Role::User, "events"),
        ];
        let body = openai_body("gpt-4o", &messages, &SamplingConfig::default());
        assert_eq!(body.get("model"), Some(&json!("gpt-4o")));
        assert_eq!(body.get("max_tokens"), Some(&json!(1024)));
        assert_eq!(
            body.get("messages"),
            Some(&json!([
                {"role": "system", "content": "sys"},
                {"role": "user", "content": "events"}
            ]))
        );
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn ollama_body_disables_streaming() {
        let body = ollama_body("llama3", &[], &SamplingConfig::default());
        assert_eq!(body.get("stream"), Some(&json!(false)));
        assert_eq!(
            body.get("options").and_then(|o| o.get("num_predict")),
            Some(&json!(1024))
        );
    }

    #[test]
    fn create_backend_dispatches_correctly() {
        let client = reqwest::Client::new();
        let openai = create_backend(&backend_config(BackendKind::OpenAi), client.clone());
        assert_eq!(openai.name(), "openai-compatible");

        let ollama = create_backend(&backend_config(BackendKind::Ollama), client);
        assert_eq!(ollama.name(), "ollama");
        if let LlmBackend::Ollama(backend) = ollama {
            assert_eq!(backend.api_url, "http://localhost:11434");
        }
    }
}
