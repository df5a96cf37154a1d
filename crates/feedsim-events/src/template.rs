//! Named-placeholder extraction from templated text.
//!
//! A template is literal text with `{name}` placeholders, for example
//! `LikeEvent(user_id={user_id}, post_id={post_id})`. Matching a line
//! against it yields the exact substring each placeholder covered:
//!
//! - the match is anchored to the whole line,
//! - each placeholder takes as few characters as possible, possibly none,
//!   before the next literal fragment (the last one runs to the end),
//! - nothing inside a captured value is interpreted.
//!
//! Nested payloads such as the `Post(...)` inside a `PostEvent` are captured
//! as one opaque value and then matched against their own template. The
//! payloads carry free text with commas and parentheses, so a single flat
//! pattern over the whole line would split them at the wrong place.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::TemplateError;

/// Matches `{name}` placeholders inside a template.
static PLACEHOLDER: LazyLock<Result<Regex, TemplateError>> = LazyLock::new(|| {
    Regex::new(r"\{(\w+)\}").map_err(|e| TemplateError::Pattern(e.to_string()))
});

/// A compiled template, reusable across lines.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    pattern: Regex,
    names: Vec<String>,
}

/// Placeholder values captured from one line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields<'a> {
    values: BTreeMap<String, &'a str>,
}

impl<'a> Fields<'a> {
    /// The substring captured for `name`, if the template has that placeholder.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.values.get(name).copied()
    }

    /// Number of captured placeholders.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the template had no placeholders.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume into a name-to-value map.
    pub fn into_map(self) -> BTreeMap<String, &'a str> {
        self.values
    }
}

impl Template {
    /// Compile a template.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::DuplicatePlaceholder`] if a placeholder name
    /// repeats.
    pub fn compile(template: &str) -> Result<Self, TemplateError> {
        let placeholder = PLACEHOLDER.as_ref().map_err(Clone::clone)?;

        let mut pattern = String::from(r"\A");
        let mut names: Vec<String> = Vec::new();
        let mut literal_start = 0;

        for caps in placeholder.captures_iter(template) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let name = name.as_str();
            if names.iter().any(|n| n == name) {
                return Err(TemplateError::DuplicatePlaceholder(name.to_owned()));
            }
            let literal = template.get(literal_start..whole.start()).unwrap_or_default();
            pattern.push_str(&regex::escape(literal));
            pattern.push_str("(?P<");
            pattern.push_str(name);
            pattern.push_str(">.*?)");
            names.push(name.to_owned());
            literal_start = whole.end();
        }

        pattern.push_str(&regex::escape(template.get(literal_start..).unwrap_or_default()));
        pattern.push_str(r"\z");

        let pattern = Regex::new(&pattern).map_err(|e| TemplateError::Pattern(e.to_string()))?;

        Ok(Self {
            source: template.to_owned(),
            pattern,
            names,
        })
    }

    /// Match `line` against the template.
    ///
    /// Returns `None` when the line does not have the template's shape.
    pub fn extract<'a>(&self, line: &'a str) -> Option<Fields<'a>> {
        let caps = self.pattern.captures(line)?;
        let values = self
            .names
            .iter()
            .filter_map(|name| caps.name(name).map(|m| (name.clone(), m.as_str())))
            .collect();
        Some(Fields { values })
    }

    /// The template text this was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> &[String] {
        &self.names
    }
}

/// Compile `template` and match `line` against it in one step.
///
/// Prefer a long-lived [`Template`] on hot paths; this exists for one-off
/// matching. Returns `None` if the line does not match or the template is
/// invalid.
pub fn extract_placeholders<'a>(template: &str, line: &'a str) -> Option<Fields<'a>> {
    Template::compile(template).ok()?.extract(line)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn extracts_flat_fields() {
        let fields = extract_placeholders(
            "LikeEvent(user_id={user_id}, post_id={post_id})",
            "LikeEvent(user_id=3, post_id=101)",
        )
        .unwrap();
        assert_eq!(fields.get("user_id"), Some("3"));
        assert_eq!(fields.get("post_id"), Some("101"));
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn match_is_anchored_to_the_whole_line() {
        let template = Template::compile("LikeEvent(user_id={user_id}, post_id={post_id})").unwrap();
        assert!(template.extract("xLikeEvent(user_id=3, post_id=101)").is_none());
        assert!(template.extract("LikeEvent(user_id=3, post_id=101) trailing").is_none());
        assert!(template.extract("LikeEvent(user_id=3)").is_none());
    }

    #[test]
    fn last_placeholder_runs_to_the_final_literal() {
        let template = Template::compile("Post(id={id}, content={content})").unwrap();
        let fields = template.extract("Post(id=7, content=a, content=b (c))").unwrap();
        assert_eq!(fields.get("id"), Some("7"));
        assert_eq!(fields.get("content"), Some("a, content=b (c)"));
    }

    #[test]
    fn nested_payload_is_captured_opaquely() {
        let outer = Template::compile("PostEvent(user_id={user_id}, post={post})").unwrap();
        let inner = Template::compile("Post(id={id}, content={content})").unwrap();

        let line = "PostEvent(user_id=2, post=Post(id=101, content=Hello, (world)!))";
        let fields = outer.extract(line).unwrap();
        assert_eq!(fields.get("user_id"), Some("2"));
        assert_eq!(fields.get("post"), Some("Post(id=101, content=Hello, (world)!)"));

        let post = inner.extract(fields.get("post").unwrap()).unwrap();
        assert_eq!(post.get("content"), Some("Hello, (world)!"));
    }

    #[test]
    fn placeholders_may_capture_nothing() {
        let template = Template::compile("Post(id={id}, content={content})").unwrap();
        let fields = template.extract("Post(id=1, content=)").unwrap();
        assert_eq!(fields.get("id"), Some("1"));
        assert_eq!(fields.get("content"), Some(""));
        assert!(template.extract("Post(id=1, content").is_none());
    }

    #[test]
    fn empty_capture_does_not_swallow_literals() {
        let template = Template::compile("LikeEvent(user_id={user_id}, post_id={post_id})").unwrap();
        let fields = template.extract("LikeEvent(user_id=, post_id=4)").unwrap();
        assert_eq!(fields.get("user_id"), Some(""));
        assert_eq!(fields.get("post_id"), Some("4"));
    }

    #[test]
    fn regex_metacharacters_in_literals_are_escaped() {
        let template = Template::compile("a.b*[{x}]+").unwrap();
        assert_eq!(template.extract("a.b*[hi]+").unwrap().get("x"), Some("hi"));
        assert!(template.extract("aXbb[hi]+").is_none());
    }

    #[test]
    fn duplicate_placeholders_are_rejected() {
        let result = Template::compile("{a} and {a}");
        assert_eq!(
            result.err(),
            Some(TemplateError::DuplicatePlaceholder("a".to_owned()))
        );
    }

    #[test]
    fn template_without_placeholders_matches_exactly() {
        let template = Template::compile("ping()").unwrap();
        assert!(template.extract("ping()").unwrap().is_empty());
        assert!(template.extract("ping( )").is_none());
        assert!(template.placeholders().is_empty());
        assert_eq!(template.as_str(), "ping()");
    }
}
