//! The text-completion contract agents depend on.
//!
//! During a round each agent hands its finalized instructions and the
//! rendered event history to a [`Completion`] and gets raw text back (or
//! nothing). The core does not care what produces the text: an HTTP model
//! backend, a scripted bot in tests, or a human at a terminal.

/// A prompt ready to send to a completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt<'a> {
    /// System message: the persona's finalized instructions.
    pub system: &'a str,
    /// User message: the previous round's events, one per line. Empty when
    /// nothing happened.
    pub user: &'a str,
}

/// A source of generated text.
///
/// Implementations may keep state between calls, such as a rolling chat
/// context. Failures are not errors at this boundary: an implementation
/// that cannot produce text returns `None`, and the agent does nothing
/// that round. Retries, timeouts, and fallbacks are the implementation's
/// concern.
pub trait Completion: Send {
    /// Generate a response to `prompt`.
    ///
    /// Called at most once per agent per round.
    fn complete(&mut self, prompt: &Prompt<'_>) -> impl Future<Output = Option<String>> + Send;
}
