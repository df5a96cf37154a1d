//! Persona lifecycle: draft, directory, finalization.
//!
//! A [`DraftPersona`] holds raw instructions. Once every persona of a run is
//! known, [`build_directory`] produces the shared user roster, and
//! [`DraftPersona::finalize`] consumes each draft, rendering its final
//! instructions through a [`PersonaTemplate`]. Only a finalized [`Persona`]
//! can drive an [`Agent`](crate::agent::Agent), so instructions are
//! finalized exactly once and never used raw.

use std::path::Path;

use feedsim_types::{User, UserDirectory, UserId};
use minijinja::{Environment, context};

use crate::error::PersonaError;

/// The built-in finalization template.
///
/// Variables: `name`, `id`, `instructions`, `directory`.
pub const DEFAULT_PERSONA_TEMPLATE: &str = include_str!("../templates/persona.j2");

const TEMPLATE_NAME: &str = "persona.j2";

/// Renders finalized persona instructions.
pub struct PersonaTemplate {
    env: Environment<'static>,
}

impl PersonaTemplate {
    /// The built-in template.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError::Template`] if the embedded template does not
    /// compile.
    pub fn builtin() -> Result<Self, PersonaError> {
        Self::from_source(DEFAULT_PERSONA_TEMPLATE.to_owned())
    }

    /// Compile a template from source text.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError::Template`] on a syntax error.
    pub fn from_source(source: String) -> Result<Self, PersonaError> {
        let mut env = Environment::new();
        env.add_template_owned(TEMPLATE_NAME, source)?;
        Ok(Self { env })
    }

    /// Load and compile a template file.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError::Io`] if the file cannot be read, or
    /// [`PersonaError::Template`] on a syntax error.
    pub fn from_file(path: &Path) -> Result<Self, PersonaError> {
        let source = std::fs::read_to_string(path).map_err(|source| PersonaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(source)
    }

    fn render(
        &self,
        id: UserId,
        name: &str,
        instructions: &str,
        directory: &str,
    ) -> Result<String, PersonaError> {
        let rendered = self.env.get_template(TEMPLATE_NAME)?.render(context! {
            id => id.into_inner(),
            name => name,
            instructions => instructions,
            directory => directory,
        })?;
        Ok(rendered)
    }
}

/// A persona whose instructions have not been finalized yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPersona {
    id: UserId,
    name: String,
    instructions: String,
    image: Option<Vec<u8>>,
}

impl DraftPersona {
    /// Create a draft with a freshly allocated user id.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError::Identity`] if no user id is left.
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Result<Self, PersonaError> {
        Ok(Self::with_id(UserId::next()?, name, instructions))
    }

    /// Create a draft for a known user id.
    pub fn with_id(id: UserId, name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            id: UserId::reserve(id.into_inner()),
            name: name.into(),
            instructions: instructions.into(),
            image: None,
        }
    }

    /// Attach a profile image.
    #[must_use]
    pub fn with_image(mut self, image: Vec<u8>) -> Self {
        self.image = Some(image);
        self
    }

    /// The persona's user id.
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// The persona's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw instructions.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// The profile image, if any.
    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    /// The public identity other agents see.
    pub fn user(&self) -> User {
        User::new(self.id, self.name.clone())
    }

    /// Embed identity, directory, and protocol rules into the instructions.
    ///
    /// Consumes the draft.
    ///
    /// # Errors
    ///
    /// Returns [`PersonaError::Template`] if rendering fails.
    pub fn finalize(
        self,
        directory: &UserDirectory,
        template: &PersonaTemplate,
    ) -> Result<Persona, PersonaError> {
        let directory = directory.to_string();
        let instructions = template.render(self.id, &self.name, &self.instructions, &directory)?;
        Ok(Persona {
            id: self.id,
            name: self.name,
            instructions,
            image: self.image,
            directory,
        })
    }
}

/// A persona with finalized instructions, ready to act.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    id: UserId,
    name: String,
    instructions: String,
    image: Option<Vec<u8>>,
    directory: String,
}

impl Persona {
    /// The persona's user id.
    pub const fn id(&self) -> UserId {
        self.id
    }

    /// The persona's display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The finalized instructions, used as the system prompt.
    pub fn instructions(&self) -> &str {
        &self.instructions
    }

    /// The profile image, if any.
    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    /// The user directory text embedded at finalization.
    pub fn directory(&self) -> &str {
        &self.directory
    }

    /// The public identity other agents see.
    pub fn user(&self) -> User {
        User::new(self.id, self.name.clone())
    }
}

/// Build the user directory for a set of drafts, in draft order.
pub fn build_directory(drafts: &[DraftPersona]) -> UserDirectory {
    drafts.iter().map(DraftPersona::user).collect()
}

/// Finalize every draft against a shared directory.
///
/// # Errors
///
/// Returns the first [`PersonaError`] encountered.
pub fn finalize_all(
    drafts: Vec<DraftPersona>,
    template: &PersonaTemplate,
) -> Result<Vec<Persona>, PersonaError> {
    let directory = build_directory(&drafts);
    drafts
        .into_iter()
        .map(|draft| draft.finalize(&directory, template))
        .collect()
}
