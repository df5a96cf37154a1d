//! Errors raised while constructing identifiers and entities.

/// Errors from identifier allocation and entity construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// The counter for this entity class has no identifiers left.
    #[error("{0} identifiers exhausted")]
    IdsExhausted(&'static str),

    /// Post or comment content would break the one-event-per-line format.
    #[error("content must be a single line")]
    MultilineContent,
}
