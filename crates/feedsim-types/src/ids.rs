//! Process-unique integer identifiers.
//!
//! Each entity class (users, posts, comments, events) owns one monotonic
//! counter starting at 1. A fresh identifier is taken from the counter on
//! construction; an explicit identifier is only supplied when an entity is
//! rebuilt from external storage, and [`IdAllocator::reserve`] then pushes the
//! counter past it so it is never handed out again while the process lives.
//!
//! `u64::MAX` is never allocated. Once the counter reaches it, allocation
//! fails with [`TypesError::IdsExhausted`] instead of wrapping around.

use core::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::TypesError;

/// Monotonic allocator for one entity class.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// Create an allocator whose first identifier is 1.
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Take the next identifier, or `None` once the range is used up.
    pub fn allocate(&self) -> Option<u64> {
        self.next
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |next| next.checked_add(1))
            .ok()
    }

    /// Mark `id` as used so later allocations start above it.
    ///
    /// Reserving `u64::MAX - 1` or `u64::MAX` exhausts the allocator.
    pub fn reserve(&self, id: u64) {
        self.next.fetch_max(id.saturating_add(1), Ordering::Relaxed);
    }

    /// The identifier the next call to [`IdAllocator::allocate`] returns.
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a newtype wrapper around `u64` backed by its own allocator.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub u64);

        impl $name {
            /// Allocate the next identifier of this class.
            ///
            /// # Errors
            ///
            /// Returns [`TypesError::IdsExhausted`] once every identifier of
            /// this class has been handed out or reserved.
            pub fn next() -> Result<Self, TypesError> {
                Self::allocator()
                    .allocate()
                    .map(Self)
                    .ok_or(TypesError::IdsExhausted(stringify!($name)))
            }

            /// Wrap a raw value without touching the allocator.
            ///
            /// Use this for references to entities owned elsewhere.
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Wrap a raw value for an entity rebuilt from storage and keep
            /// the allocator from ever handing it out.
            pub fn reserve(raw: u64) -> Self {
                Self::allocator().reserve(raw);
                Self(raw)
            }

            /// Return the inner integer.
            pub const fn into_inner(self) -> u64 {
                self.0
            }

            fn allocator() -> &'static IdAllocator {
                static ALLOCATOR: IdAllocator = IdAllocator::new();
                &ALLOCATOR
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Identity of a user, which is also the identity of the agent acting as that user.
    UserId
}

define_id! {
    /// Unique identifier for a post.
    PostId
}

define_id! {
    /// Unique identifier for a comment.
    CommentId
}

define_id! {
    /// Unique identifier for an event.
    EventId
}
