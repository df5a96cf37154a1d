//! Decoding event lines and agent responses.
//!
//! Every line is decoded in two steps: the kind is picked from the literal
//! prefix before the first `(`, then the line is matched against that
//! kind's template (and the nested `Post(...)`/`Comment(...)` payload
//! against its own template).
//!
//! How the decoded fields are trusted depends on the [`Binding`]:
//!
//! - [`Binding::Actor`] is used for text produced by an agent. The actor
//!   field of every kind (`user_id`, or `follower_id` for follows) is
//!   replaced with the acting agent's id, whatever the text claims. Post
//!   and comment ids in the text are placeholders, so fresh ids are
//!   allocated for the new entities.
//! - [`Binding::Verbatim`] trusts every field. It rebuilds events from
//!   storage and from any other canonical source.

use std::sync::LazyLock;

use feedsim_types::{Comment, CommentId, Post, PostId, UserId};
use tracing::debug;

use crate::error::{EventError, TemplateError};
use crate::event::{
    COMMENT_EVENT, DISLIKE_EVENT, Event, EventKind, FOLLOW_EVENT, LIKE_EVENT, POST_EVENT,
};
use crate::template::{Fields, Template};

type CompiledTemplate = LazyLock<Result<Template, TemplateError>>;

static POST_EVENT_TEMPLATE: CompiledTemplate =
    LazyLock::new(|| Template::compile("PostEvent(user_id={user_id}, post={post})"));
static POST_TEMPLATE: CompiledTemplate =
    LazyLock::new(|| Template::compile("Post(id={id}, content={content})"));
static COMMENT_EVENT_TEMPLATE: CompiledTemplate =
    LazyLock::new(|| Template::compile("CommentEvent(user_id={user_id}, comment={comment})"));
static COMMENT_TEMPLATE: CompiledTemplate = LazyLock::new(|| {
    Template::compile("Comment(id={id}, post_id={post_id}, content={content})")
});
static LIKE_EVENT_TEMPLATE: CompiledTemplate =
    LazyLock::new(|| Template::compile("LikeEvent(user_id={user_id}, post_id={post_id})"));
static DISLIKE_EVENT_TEMPLATE: CompiledTemplate =
    LazyLock::new(|| Template::compile("DislikeEvent(user_id={user_id}, post_id={post_id})"));
static FOLLOW_EVENT_TEMPLATE: CompiledTemplate = LazyLock::new(|| {
    Template::compile("FollowEvent(follower_id={follower_id}, followee_id={followee_id})")
});

/// How actor fields and entity ids in a line are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    /// Trust every field, including actor ids and entity ids.
    Verbatim,
    /// Text emitted by this agent: the actor is always this id, and new
    /// posts and comments get fresh ids.
    Actor(UserId),
}

/// Decode one line into an [`EventKind`].
///
/// Surrounding whitespace is ignored.
///
/// # Errors
///
/// [`EventError::UnknownKind`] if the prefix names no kind,
/// [`EventError::Malformed`] if the line does not fit its kind's grammar,
/// [`EventError::InvalidField`] if an integer field does not parse,
/// [`EventError::Entity`] if no fresh post or comment id is left.
pub fn parse_kind(line: &str, binding: Binding) -> Result<EventKind, EventError> {
    let line = line.trim();
    let prefix = line.split('(').next().unwrap_or_default();

    match prefix {
        POST_EVENT => parse_post_event(line, binding),
        COMMENT_EVENT => parse_comment_event(line, binding),
        LIKE_EVENT => {
            let (user_id, post_id) = parse_reaction(&LIKE_EVENT_TEMPLATE, LIKE_EVENT, line, binding)?;
            Ok(EventKind::Like { user_id, post_id })
        }
        DISLIKE_EVENT => {
            let (user_id, post_id) =
                parse_reaction(&DISLIKE_EVENT_TEMPLATE, DISLIKE_EVENT, line, binding)?;
            Ok(EventKind::Dislike { user_id, post_id })
        }
        FOLLOW_EVENT => parse_follow_event(line, binding),
        other => Err(EventError::UnknownKind(other.to_owned())),
    }
}

/// Decode one line emitted by the agent `actor` into a new [`Event`].
///
/// # Errors
///
/// See [`parse_kind`].
pub fn parse_event(line: &str, actor: UserId) -> Result<Event, EventError> {
    let kind = parse_kind(line, Binding::Actor(actor))?;
    Ok(Event::new(kind)?)
}

/// Decode a whole agent response, one event per line.
///
/// Lines that fail to decode are dropped; the remaining events keep their
/// order. Blank lines are skipped.
pub fn decode_batch(text: &str, actor: UserId) -> Vec<Event> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match parse_event(line, actor) {
            Ok(event) => Some(event),
            Err(e) => {
                debug!(actor = %actor, error = %e, "dropping undecodable line");
                None
            }
        })
        .collect()
}

impl core::str::FromStr for EventKind {
    type Err = EventError;

    /// Decode a canonical line, trusting every field.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        parse_kind(line, Binding::Verbatim)
    }
}

fn template(cell: &'static CompiledTemplate) -> Result<&'static Template, EventError> {
    cell.as_ref()
        .map_err(|e| EventError::Template(e.clone()))
}

fn match_line<'a>(
    cell: &'static CompiledTemplate,
    kind: &'static str,
    line: &'a str,
) -> Result<Fields<'a>, EventError> {
    template(cell)?
        .extract(line)
        .ok_or_else(|| EventError::Malformed {
            kind,
            line: line.to_owned(),
        })
}

fn field<'a>(
    fields: &Fields<'a>,
    kind: &'static str,
    name: &'static str,
) -> Result<&'a str, EventError> {
    fields.get(name).ok_or_else(|| EventError::InvalidField {
        kind,
        field: name,
        value: String::new(),
    })
}

fn int_field(fields: &Fields<'_>, kind: &'static str, name: &'static str) -> Result<u64, EventError> {
    let raw = field(fields, kind, name)?;
    raw.trim().parse().map_err(|_parse_err| EventError::InvalidField {
        kind,
        field: name,
        value: raw.to_owned(),
    })
}

/// Resolve the actor field of a line under `binding`.
fn actor_field(
    fields: &Fields<'_>,
    kind: &'static str,
    name: &'static str,
    binding: Binding,
) -> Result<UserId, EventError> {
    match binding {
        Binding::Verbatim => int_field(fields, kind, name).map(UserId::from_raw),
        Binding::Actor(actor) => {
            if let Ok(claimed) = int_field(fields, kind, name)
                && claimed != actor.into_inner()
            {
                debug!(actor = %actor, claimed, kind, "overriding claimed actor");
            }
            Ok(actor)
        }
    }
}

fn parse_post_event(line: &str, binding: Binding) -> Result<EventKind, EventError> {
    let outer = match_line(&POST_EVENT_TEMPLATE, POST_EVENT, line)?;
    let user_id = actor_field(&outer, POST_EVENT, "user_id", binding)?;
    let inner = match_line(&POST_TEMPLATE, POST_EVENT, field(&outer, POST_EVENT, "post")?)?;
    let content = field(&inner, POST_EVENT, "content")?;

    let post = match binding {
        Binding::Verbatim => {
            let id = int_field(&inner, POST_EVENT, "id")?;
            Post::with_id(PostId::from_raw(id), content)?
        }
        Binding::Actor(_) => Post::new(content)?,
    };

    Ok(EventKind::Post { user_id, post })
}

fn parse_comment_event(line: &str, binding: Binding) -> Result<EventKind, EventError> {
    let outer = match_line(&COMMENT_EVENT_TEMPLATE, COMMENT_EVENT, line)?;
    let user_id = actor_field(&outer, COMMENT_EVENT, "user_id", binding)?;
    let inner = match_line(
        &COMMENT_TEMPLATE,
        COMMENT_EVENT,
        field(&outer, COMMENT_EVENT, "comment")?,
    )?;
    let post_id = PostId::from_raw(int_field(&inner, COMMENT_EVENT, "post_id")?);
    let content = field(&inner, COMMENT_EVENT, "content")?;

    let comment = match binding {
        Binding::Verbatim => {
            let id = int_field(&inner, COMMENT_EVENT, "id")?;
            Comment::with_id(CommentId::from_raw(id), post_id, content)?
        }
        Binding::Actor(_) => Comment::new(post_id, content)?,
    };

    Ok(EventKind::Comment { user_id, comment })
}

fn parse_reaction(
    cell: &'static CompiledTemplate,
    kind: &'static str,
    line: &str,
    binding: Binding,
) -> Result<(UserId, PostId), EventError> {
    let fields = match_line(cell, kind, line)?;
    let user_id = actor_field(&fields, kind, "user_id", binding)?;
    let post_id = PostId::from_raw(int_field(&fields, kind, "post_id")?);
    Ok((user_id, post_id))
}

fn parse_follow_event(line: &str, binding: Binding) -> Result<EventKind, EventError> {
    let fields = match_line(&FOLLOW_EVENT_TEMPLATE, FOLLOW_EVENT, line)?;
    let follower_id = actor_field(&fields, FOLLOW_EVENT, "follower_id", binding)?;
    let followee_id = UserId::from_raw(int_field(&fields, FOLLOW_EVENT, "followee_id")?);
    Ok(EventKind::Follow {
        follower_id,
        followee_id,
    })
}
