//! Shared type definitions for the feedsim social feed simulation.
//!
//! Identifiers and the small immutable records that events refer to. Types
//! exported here also flow to `TypeScript` via `ts-rs` for the frontend.
//!
//! # Modules
//!
//! - [`ids`] -- Process-unique integer identifiers and their allocator
//! - [`entities`] -- Posts, comments, users, and the user directory
//! - [`error`] -- Allocation and construction errors

pub mod entities;
pub mod error;
pub mod ids;

pub use entities::{Comment, Post, User, UserDirectory};
pub use error::TypesError;
pub use ids::{CommentId, EventId, IdAllocator, PostId, UserId};

#[cfg(test)]
mod tests {
    #[test]
    fn export_bindings() {
        // Writes the TypeScript bindings into `bindings/` relative to the
        // crate root.
        use ts_rs::TS;

        let _ = crate::ids::UserId::export_all();
        let _ = crate::ids::PostId::export_all();
        let _ = crate::ids::CommentId::export_all();
        let _ = crate::ids::EventId::export_all();

        let _ = crate::entities::Post::export_all();
        let _ = crate::entities::Comment::export_all();
        let _ = crate::entities::User::export_all();
    }
}
