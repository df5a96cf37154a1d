//! Domain entities referenced by events: posts, comments, and users.
//!
//! Entities are immutable once constructed. Their `Display` output is the
//! canonical text embedded in event lines and in the user directory, so the
//! formats here are part of the wire protocol. Post and comment content is
//! therefore restricted to a single line; it may be empty.

use core::fmt;

use serde::Serialize;
use ts_rs::TS;

use crate::error::TypesError;
use crate::ids::{CommentId, PostId, UserId};

/// A post created by a `PostEvent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Post {
    id: PostId,
    content: String,
}

impl Post {
    /// Create a post with a freshly allocated identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::MultilineContent`] if `content` contains a line
    /// break, or [`TypesError::IdsExhausted`] if no post id is left.
    pub fn new(content: impl Into<String>) -> Result<Self, TypesError> {
        let content = single_line(content.into())?;
        Ok(Self {
            id: PostId::next()?,
            content,
        })
    }

    /// Rebuild a post with a known identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::MultilineContent`] if `content` contains a line
    /// break.
    pub fn with_id(id: PostId, content: impl Into<String>) -> Result<Self, TypesError> {
        let content = single_line(content.into())?;
        Ok(Self {
            id: PostId::reserve(id.into_inner()),
            content,
        })
    }

    /// The post identifier.
    pub const fn id(&self) -> PostId {
        self.id
    }

    /// The post body.
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Post(id={}, content={})", self.id, self.content)
    }
}

/// A comment on a post.
///
/// `post_id` is a relation only; the post need not exist in this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Comment {
    id: CommentId,
    post_id: PostId,
    content: String,
}

impl Comment {
    /// Create a comment with a freshly allocated identifier.
    ///
    /// # Errors
    ///
    /// Same as [`Post::new`].
    pub fn new(post_id: PostId, content: impl Into<String>) -> Result<Self, TypesError> {
        let content = single_line(content.into())?;
        Ok(Self {
            id: CommentId::next()?,
            post_id,
            content,
        })
    }

    /// Rebuild a comment with a known identifier.
    ///
    /// # Errors
    ///
    /// Same as [`Post::with_id`].
    pub fn with_id(
        id: CommentId,
        post_id: PostId,
        content: impl Into<String>,
    ) -> Result<Self, TypesError> {
        let content = single_line(content.into())?;
        Ok(Self {
            id: CommentId::reserve(id.into_inner()),
            post_id,
            content,
        })
    }

    /// The comment identifier.
    pub const fn id(&self) -> CommentId {
        self.id
    }

    /// The post this comment replies to.
    pub const fn post_id(&self) -> PostId {
        self.post_id
    }

    /// The comment body.
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Comment(id={}, post_id={}, content={})",
            self.id, self.post_id, self.content
        )
    }
}

fn single_line(content: String) -> Result<String, TypesError> {
    if content.contains(['\n', '\r']) {
        return Err(TypesError::MultilineContent);
    }
    Ok(content)
}

/// The public identity of an agent, as other agents see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct User {
    id: UserId,
    name: String,
}

impl User {
    /// Create a user entry for an already-allocated identity.
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The user identifier.
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "User(id={}, name={})", self.id, self.name)
    }
}

/// Roster of every user in an experiment.
///
/// Rendered as `[User(id=1, name=a), User(id=2, name=b)]` and embedded
/// verbatim in each agent's instructions so agents can resolve names to ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    /// Build a directory from users in roster order.
    pub const fn new(users: Vec<User>) -> Self {
        Self { users }
    }

    /// Look up a user by id.
    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    /// Iterate users in roster order.
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.iter()
    }

    /// Number of users.
    pub const fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the roster is empty.
    pub const fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl fmt::Display for UserDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, user) in self.users.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{user}")?;
        }
        f.write_str("]")
    }
}

impl FromIterator<User> for UserDirectory {
    fn from_iter<I: IntoIterator<Item = User>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn post_canonical_form() {
        let post = Post::with_id(PostId::from_raw(101), "Hello, world (again)!").unwrap();
        assert_eq!(post.to_string(), "Post(id=101, content=Hello, world (again)!)");
    }

    #[test]
    fn comment_canonical_form() {
        let comment =
            Comment::with_id(CommentId::from_raw(301), PostId::from_raw(101), "Hi!").unwrap();
        assert_eq!(
            comment.to_string(),
            "Comment(id=301, post_id=101, content=Hi!)"
        );
    }

    #[test]
    fn new_posts_get_distinct_ids() {
        let a = Post::new("a").unwrap();
        let b = Post::new("b").unwrap();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn restored_post_id_is_not_reallocated() {
        let raw = PostId::next().unwrap().into_inner().saturating_add(3);
        let restored = Post::with_id(PostId::from_raw(raw), "old").unwrap();
        let fresh = Post::new("new").unwrap();
        assert!(fresh.id() > restored.id());
    }

    #[test]
    fn empty_content_is_allowed() {
        let post = Post::with_id(PostId::from_raw(5), "").unwrap();
        assert_eq!(post.to_string(), "Post(id=5, content=)");
        assert_eq!(Comment::new(PostId::from_raw(5), "").unwrap().content(), "");
    }

    #[test]
    fn multiline_content_is_rejected() {
        assert_eq!(
            Post::new("first\nsecond"),
            Err(TypesError::MultilineContent)
        );
        assert_eq!(
            Post::with_id(PostId::from_raw(9), "carriage\rreturn"),
            Err(TypesError::MultilineContent)
        );
        assert_eq!(
            Comment::with_id(CommentId::from_raw(9), PostId::from_raw(1), "a\r\nb"),
            Err(TypesError::MultilineContent)
        );
    }

    #[test]
    fn directory_renders_bracketed_list() {
        let directory: UserDirectory = [
            User::new(UserId::from_raw(1), "agent1"),
            User::new(UserId::from_raw(2), "agent2"),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            directory.to_string(),
            "[User(id=1, name=agent1), User(id=2, name=agent2)]"
        );
        assert_eq!(directory.get(UserId::from_raw(2)).map(User::name), Some("agent2"));
    }

    #[test]
    fn empty_directory_renders_empty_brackets() {
        assert_eq!(UserDirectory::default().to_string(), "[]");
    }
}
