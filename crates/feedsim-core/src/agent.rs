//! One simulated user: a finalized persona plus its completion source.

use feedsim_events::{Event, decode_batch, encode_batch};
use feedsim_types::UserId;
use tracing::debug;

use crate::completion::{Completion, Prompt};
use crate::persona::Persona;

/// A simulated user taking one turn per round.
pub struct Agent<C> {
    persona: Persona,
    completion: C,
}

impl<C: Completion> Agent<C> {
    /// Pair a finalized persona with its own completion source.
    pub const fn new(persona: Persona, completion: C) -> Self {
        Self {
            persona,
            completion,
        }
    }

    /// The agent's user id, which every emitted event is attributed to.
    pub const fn id(&self) -> UserId {
        self.persona.id()
    }

    /// The agent's display name.
    pub fn name(&self) -> &str {
        self.persona.name()
    }

    /// The persona driving this agent.
    pub const fn persona(&self) -> &Persona {
        &self.persona
    }

    /// React to the previous round's events.
    ///
    /// Renders `history` one event per line, asks the completion source,
    /// decodes the reply as this agent, and drops structurally invalid
    /// events. No reply, a blank reply, or a reply with no decodable line
    /// all yield an empty list.
    pub async fn turn(&mut self, history: &[Event]) -> Vec<Event> {
        let rendered = encode_batch(history);
        let prompt = Prompt {
            system: self.persona.instructions(),
            user: &rendered,
        };

        let Some(reply) = self.completion.complete(&prompt).await else {
            debug!(agent = %self.persona.id(), "no completion this round");
            return Vec::new();
        };
        if reply.trim().is_empty() {
            debug!(agent = %self.persona.id(), "blank completion");
            return Vec::new();
        }

        let events = filter_invalid_events(decode_batch(&reply, self.persona.id()));
        debug!(
            agent = %self.persona.id(),
            events = events.len(),
            "turn complete"
        );
        events
    }
}

/// Drop events that violate their kind's structural rules, keeping order.
///
/// Idempotent.
pub fn filter_invalid_events(events: Vec<Event>) -> Vec<Event> {
    events
        .into_iter()
        .filter(|event| {
            let valid = event.kind().is_structurally_valid();
            if !valid {
                debug!(event = %event, "dropping structurally invalid event");
            }
            valid
        })
        .collect()
}
