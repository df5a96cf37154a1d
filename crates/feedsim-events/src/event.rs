//! The closed set of social actions and their canonical text form.
//!
//! ```text
//! PostEvent(user_id={int}, post=Post(id={int}, content={string}))
//! CommentEvent(user_id={int}, comment=Comment(id={int}, post_id={int}, content={string}))
//! LikeEvent(user_id={int}, post_id={int})
//! DislikeEvent(user_id={int}, post_id={int})
//! FollowEvent(follower_id={int}, followee_id={int})
//! ```
//!
//! The `Display` impls produce exactly these lines; other decoders depend on
//! them byte for byte. Content strings are written as-is; `Post` and
//! `Comment` refuse line breaks at construction.

use core::fmt;

use feedsim_types::{Comment, EventId, Post, PostId, TypesError, UserId};
use serde::Serialize;
use ts_rs::TS;

/// Literal prefix of a post line.
pub const POST_EVENT: &str = "PostEvent";
/// Literal prefix of a comment line.
pub const COMMENT_EVENT: &str = "CommentEvent";
/// Literal prefix of a like line.
pub const LIKE_EVENT: &str = "LikeEvent";
/// Literal prefix of a dislike line.
pub const DISLIKE_EVENT: &str = "DislikeEvent";
/// Literal prefix of a follow line.
pub const FOLLOW_EVENT: &str = "FollowEvent";

/// What happened, with its actor and payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "type")]
#[ts(export, export_to = "bindings/")]
pub enum EventKind {
    /// A user published a post.
    Post {
        /// Author.
        user_id: UserId,
        /// The new post.
        post: Post,
    },
    /// A user commented on a post.
    Comment {
        /// Author.
        user_id: UserId,
        /// The new comment.
        comment: Comment,
    },
    /// A user liked a post.
    Like {
        /// Who liked.
        user_id: UserId,
        /// The liked post.
        post_id: PostId,
    },
    /// A user disliked a post.
    Dislike {
        /// Who disliked.
        user_id: UserId,
        /// The disliked post.
        post_id: PostId,
    },
    /// A user followed another user. The follower is the actor.
    Follow {
        /// Who follows.
        follower_id: UserId,
        /// Who is followed.
        followee_id: UserId,
    },
}

impl EventKind {
    /// The literal line prefix for this kind, e.g. `"LikeEvent"`.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Post { .. } => POST_EVENT,
            Self::Comment { .. } => COMMENT_EVENT,
            Self::Like { .. } => LIKE_EVENT,
            Self::Dislike { .. } => DISLIKE_EVENT,
            Self::Follow { .. } => FOLLOW_EVENT,
        }
    }

    /// The user who performed the action.
    pub const fn actor(&self) -> UserId {
        match self {
            Self::Post { user_id, .. }
            | Self::Comment { user_id, .. }
            | Self::Like { user_id, .. }
            | Self::Dislike { user_id, .. } => *user_id,
            Self::Follow { follower_id, .. } => *follower_id,
        }
    }

    /// Whether the event satisfies the structural invariants of its kind.
    ///
    /// Currently the only rule: nobody follows themselves.
    pub fn is_structurally_valid(&self) -> bool {
        match self {
            Self::Follow {
                follower_id,
                followee_id,
            } => follower_id != followee_id,
            Self::Post { .. } | Self::Comment { .. } | Self::Like { .. } | Self::Dislike { .. } => {
                true
            }
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post { user_id, post } => {
                write!(f, "{POST_EVENT}(user_id={user_id}, post={post})")
            }
            Self::Comment { user_id, comment } => {
                write!(f, "{COMMENT_EVENT}(user_id={user_id}, comment={comment})")
            }
            Self::Like { user_id, post_id } => {
                write!(f, "{LIKE_EVENT}(user_id={user_id}, post_id={post_id})")
            }
            Self::Dislike { user_id, post_id } => {
                write!(f, "{DISLIKE_EVENT}(user_id={user_id}, post_id={post_id})")
            }
            Self::Follow {
                follower_id,
                followee_id,
            } => write!(
                f,
                "{FOLLOW_EVENT}(follower_id={follower_id}, followee_id={followee_id})"
            ),
        }
    }
}

/// One identified event.
///
/// The id is not part of the text form; two events with the same kind and
/// different ids serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    id: EventId,
    kind: EventKind,
}

impl Event {
    /// Wrap `kind` with a freshly allocated event id.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::IdsExhausted`] if no event id is left.
    pub fn new(kind: EventKind) -> Result<Self, TypesError> {
        Ok(Self {
            id: EventId::next()?,
            kind,
        })
    }

    /// Rebuild an event with a known id.
    pub fn with_id(id: EventId, kind: EventKind) -> Self {
        Self {
            id: EventId::reserve(id.into_inner()),
            kind,
        }
    }

    /// The event id.
    pub const fn id(&self) -> EventId {
        self.id
    }

    /// The action and its payload.
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Consume the event, keeping only its kind.
    pub fn into_kind(self) -> EventKind {
        self.kind
    }

    /// The user who performed the action.
    pub const fn actor(&self) -> UserId {
        self.kind.actor()
    }

    /// The literal line prefix for this event's kind.
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// Render events one per line, in order, without a trailing newline.
///
/// An empty slice renders as the empty string.
pub fn encode_batch(events: &[Event]) -> String {
    events
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use feedsim_types::CommentId;

    use super::*;

    fn user(raw: u64) -> UserId {
        UserId::from_raw(raw)
    }

    #[test]
    fn canonical_forms_are_exact() {
        let cases = [
            (
                EventKind::Post {
                    user_id: user(2),
                    post: Post::with_id(PostId::from_raw(101), "Hello!").unwrap(),
                },
                "PostEvent(user_id=2, post=Post(id=101, content=Hello!))",
            ),
            (
                EventKind::Comment {
                    user_id: user(4),
                    comment: Comment::with_id(
                        CommentId::from_raw(301),
                        PostId::from_raw(101),
                        "Hi from agent4!",
                    )
                    .unwrap(),
                },
                "CommentEvent(user_id=4, comment=Comment(id=301, post_id=101, content=Hi from agent4!))",
            ),
            (
                EventKind::Like {
                    user_id: user(3),
                    post_id: PostId::from_raw(101),
                },
                "LikeEvent(user_id=3, post_id=101)",
            ),
            (
                EventKind::Dislike {
                    user_id: user(3),
                    post_id: PostId::from_raw(9),
                },
                "DislikeEvent(user_id=3, post_id=9)",
            ),
            (
                EventKind::Follow {
                    follower_id: user(5),
                    followee_id: user(6),
                },
                "FollowEvent(follower_id=5, followee_id=6)",
            ),
        ];

        for (kind, expected) in cases {
            assert_eq!(kind.to_string(), expected);
            assert_eq!(Event::new(kind).unwrap().to_string(), expected);
        }
    }

    #[test]
    fn serialization_is_stable() {
        let event = Event::new(EventKind::Like {
            user_id: user(1),
            post_id: PostId::from_raw(2),
        })
        .unwrap();
        assert_eq!(event.to_string(), event.to_string());
    }

    #[test]
    fn actor_of_follow_is_the_follower() {
        let kind = EventKind::Follow {
            follower_id: user(5),
            followee_id: user(6),
        };
        assert_eq!(kind.actor(), user(5));
        assert_eq!(kind.name(), "FollowEvent");
    }

    #[test]
    fn self_follow_is_structurally_invalid() {
        let self_follow = EventKind::Follow {
            follower_id: user(5),
            followee_id: user(5),
        };
        let follow = EventKind::Follow {
            follower_id: user(5),
            followee_id: user(6),
        };
        assert!(!self_follow.is_structurally_valid());
        assert!(follow.is_structurally_valid());
    }

    #[test]
    fn encode_batch_joins_lines_without_trailing_newline() {
        let events = vec![
            Event::new(EventKind::Like {
                user_id: user(1),
                post_id: PostId::from_raw(2),
            })
            .unwrap(),
            Event::new(EventKind::Dislike {
                user_id: user(1),
                post_id: PostId::from_raw(3),
            })
            .unwrap(),
        ];
        assert_eq!(
            encode_batch(&events),
            "LikeEvent(user_id=1, post_id=2)\nDislikeEvent(user_id=1, post_id=3)"
        );
        assert_eq!(encode_batch(&[]), "");
    }

    #[test]
    fn fresh_events_get_distinct_ids() {
        let kind = EventKind::Like {
            user_id: user(1),
            post_id: PostId::from_raw(2),
        };
        let a = Event::new(kind.clone()).unwrap();
        let b = Event::new(kind).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind(), b.kind());
    }

    #[test]
    fn json_shape_tags_the_kind() {
        let event = Event::with_id(
            EventId::from_raw(77),
            EventKind::Like {
                user_id: user(1),
                post_id: PostId::from_raw(2),
            },
        );
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["id"], 77);
        assert_eq!(json["kind"]["type"], "Like");
        assert_eq!(json["kind"]["post_id"], 2);
    }
}
