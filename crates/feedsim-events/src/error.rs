//! Error types for the event codec.
//!
//! None of these are fatal to a simulation: a line that fails to decode is
//! dropped by the batch decoder and the rest of the response survives.

use feedsim_types::TypesError;

/// Errors raised while compiling a line template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// The same placeholder name appears twice.
    #[error("duplicate placeholder {{{0}}} in template")]
    DuplicatePlaceholder(String),

    /// The generated pattern failed to compile.
    #[error("invalid template pattern: {0}")]
    Pattern(String),
}

/// Errors raised while decoding a single event line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    /// The text before the first `(` names no known event kind.
    #[error("unrecognized event kind: {0:?}")]
    UnknownKind(String),

    /// The line does not match the canonical grammar of its kind.
    #[error("invalid {kind} line: {line}")]
    Malformed {
        /// The event kind the line claimed to be.
        kind: &'static str,
        /// The offending line.
        line: String,
    },

    /// A field matched the grammar but holds an unusable value.
    #[error("invalid {field} value {value:?} in {kind}")]
    InvalidField {
        /// The event kind being decoded.
        kind: &'static str,
        /// The placeholder name.
        field: &'static str,
        /// The raw text captured for the field.
        value: String,
    },

    /// A built-in template failed to compile.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// The decoded entity could not be constructed.
    #[error("entity error: {0}")]
    Entity(#[from] TypesError),
}
