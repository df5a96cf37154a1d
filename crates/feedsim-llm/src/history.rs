//! Rolling chat context kept per agent.

use std::collections::VecDeque;

use serde::Serialize;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Persona instructions.
    System,
    /// Event history sent to the model.
    User,
    /// A previous model reply.
    Assistant,
}

/// One message in a chat request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Build a message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// The most recent user/assistant exchanges of one agent.
///
/// Holds at most `window` messages; older ones fall off the front. The
/// system message is not stored and is prepended on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatHistory {
    window: usize,
    messages: VecDeque<ChatMessage>,
}

impl ChatHistory {
    /// Create an empty history keeping `window` messages (at least one).
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            messages: VecDeque::with_capacity(window),
        }
    }

    /// Record the events just sent to the model.
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::new(Role::User, content));
    }

    /// Record the model's reply.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::new(Role::Assistant, content));
    }

    fn push(&mut self, message: ChatMessage) {
        while self.messages.len() >= self.window {
            self.messages.pop_front();
        }
        self.messages.push_back(message);
    }

    /// The messages for a request: `system` first, then the window.
    pub fn request(&self, system: &str) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::new(Role::System, system))
            .chain(self.messages.iter().cloned())
            .collect()
    }

    /// Number of stored messages, excluding the system message.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been exchanged yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The configured window.
    pub const fn window(&self) -> usize {
        self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_starts_with_system_message() {
        let mut history = ChatHistory::new(4);
        history.push_user("LikeEvent(user_id=1, post_id=2)");

        let request = history.request("be nice");
        assert_eq!(request.len(), 2);
        assert_eq!(request.first(), Some(&ChatMessage::new(Role::System, "be nice")));
        assert_eq!(request.get(1).map(|m| m.role), Some(Role::User));
    }

    #[test]
    fn window_keeps_most_recent_messages() {
        let mut history = ChatHistory::new(3);
        for round in 0..4 {
            history.push_user(format!("events {round}"));
            history.push_assistant(format!("reply {round}"));
        }

        assert_eq!(history.len(), 3);
        let contents: Vec<String> = history
            .request("sys")
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["sys", "reply 2", "events 3", "reply 3"]);
    }

    #[test]
    fn zero_window_still_keeps_the_latest_message() {
        let mut history = ChatHistory::new(0);
        history.push_user("a");
        history.push_user("b");
        assert_eq!(history.window(), 1);
        assert_eq!(history.request("s").len(), 2);
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::new(Role::Assistant, "x")).unwrap_or_default();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "x"}));
    }
}
