//! Event model and text codec for the feedsim social feed simulation.
//!
//! Agents talk to each other exclusively through events rendered as single
//! text lines. This crate owns that wire form: the closed set of event
//! kinds, their canonical `Display` rendering, and the decoder that turns
//! model output back into typed events.
//!
//! # Modules
//!
//! - [`template`] -- Named-placeholder extraction over anchored patterns
//! - [`event`] -- Event kinds, the identified [`Event`], batch encoding
//! - [`decode`] -- Line and batch decoding with actor binding
//! - [`error`] -- Codec error types

pub mod decode;
pub mod error;
pub mod event;
pub mod template;

pub use decode::{Binding, decode_batch, parse_event, parse_kind};
pub use error::{EventError, TemplateError};
pub use event::{Event, EventKind, encode_batch};
pub use template::{Fields, Template, extract_placeholders};

#[cfg(test)]
mod tests {
    #[test]
    fn export_bindings() {
        use ts_rs::TS;

        let _ = crate::event::EventKind::export_all();
        let _ = crate::event::Event::export_all();
    }
}
