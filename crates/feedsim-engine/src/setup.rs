//! Startup steps: logging, config, personas, agents, and storage.

use std::path::{Path, PathBuf};

use feedsim_core::agent::Agent;
use feedsim_core::config::{
    ExperimentConfig, FeedsimConfig, LlmConfig, LoggingConfig, PersonaConfig, StorageBackend,
};
use feedsim_core::persona::{DraftPersona, Persona, PersonaTemplate};
use feedsim_db::{AgentStore, ExperimentStore, PostgresPool};
use feedsim_llm::LlmCompletion;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `logging.level` when set.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load the config file, falling back to defaults when it does not exist.
///
/// Environment overrides apply either way.
pub fn load_config(path: &Path) -> Result<FeedsimConfig, EngineError> {
    if path.exists() {
        Ok(FeedsimConfig::from_file(path)?)
    } else {
        let mut config = FeedsimConfig::default();
        config.apply_env_overrides();
        Ok(config)
    }
}

/// Directory relative paths in the config file resolve against.
pub fn config_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Whether the run needs a database connection at all.
pub fn needs_database(config: &FeedsimConfig, from_db: bool) -> bool {
    from_db || config.storage.backend == StorageBackend::Postgres
}

/// Connect to `PostgreSQL` and apply migrations.
pub async fn connect_database(url: &str) -> Result<PostgresPool, EngineError> {
    let pool = PostgresPool::connect_url(url).await?;
    pool.run_migrations().await?;
    Ok(pool)
}

/// Turn the configured personas into drafts, reading image files.
pub fn drafts_from_config(
    personas: &[PersonaConfig],
    base_dir: &Path,
) -> Result<Vec<DraftPersona>, EngineError> {
    personas
        .iter()
        .map(|persona| {
            let draft = DraftPersona::new(persona.name.clone(), persona.instructions.clone())?;
            let Some(image) = &persona.image else {
                return Ok(draft);
            };
            let path = base_dir.join(image);
            let bytes = std::fs::read(&path).map_err(|source| EngineError::Image {
                path: path.clone(),
                source,
            })?;
            Ok(draft.with_image(bytes))
        })
        .collect()
}

/// Load the drafts stored for an experiment.
pub async fn drafts_from_database(
    pool: &PostgresPool,
    experiment_id: &str,
) -> Result<Vec<DraftPersona>, EngineError> {
    Ok(AgentStore::new(pool.pool())
        .load_drafts(experiment_id)
        .await?)
}

/// The finalization template: the configured file, or the built-in one.
pub fn persona_template(
    config: &FeedsimConfig,
    base_dir: &Path,
) -> Result<PersonaTemplate, EngineError> {
    let template = match &config.persona_template {
        Some(path) => PersonaTemplate::from_file(&base_dir.join(path))?,
        None => PersonaTemplate::builtin()?,
    };
    Ok(template)
}

/// One agent per persona, each with its own completion client.
pub fn build_agents(
    personas: Vec<Persona>,
    llm: &LlmConfig,
    client: &reqwest::Client,
) -> Vec<Agent<LlmCompletion>> {
    personas
        .into_iter()
        .map(|persona| Agent::new(persona, LlmCompletion::from_config(llm, client)))
        .collect()
}

/// Record the experiment, and its personas if none are stored yet.
pub async fn register_experiment(
    pool: &PostgresPool,
    experiment: &ExperimentConfig,
    drafts: &[DraftPersona],
) -> Result<(), EngineError> {
    ExperimentStore::new(pool.pool())
        .upsert(
            &experiment.id,
            &experiment.name,
            experiment.description.as_deref(),
            experiment.max_rounds,
        )
        .await?;

    let agents = AgentStore::new(pool.pool());
    if agents.get_agents(&experiment.id).await?.is_empty() {
        for draft in drafts {
            agents
                .insert_agent(
                    &experiment.id,
                    draft.name(),
                    draft.instructions(),
                    draft.image(),
                )
                .await?;
        }
        info!(
            experiment_id = %experiment.id,
            agents = drafts.len(),
            "Registered personas"
        );
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use feedsim_core::persona::finalize_all;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "feedsim-engine-{name}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn persona(name: &str, image: Option<&str>) -> PersonaConfig {
        PersonaConfig {
            name: name.to_owned(),
            instructions: format!("You are {name}."),
            image: image.map(PathBuf::from),
        }
    }

    #[test]
    fn drafts_keep_config_order_and_read_images() {
        let dir = scratch_dir("images");
        std::fs::write(dir.join("avatar.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let drafts = drafts_from_config(
            &[persona("agent0", Some("avatar.png")), persona("agent1", None)],
            &dir,
        )
        .unwrap();

        let names: Vec<&str> = drafts.iter().map(DraftPersona::name).collect();
        assert_eq!(names, vec!["agent0", "agent1"]);
        assert_eq!(drafts[0].image(), Some(&[0x89, b'P', b'N', b'G'][..]));
        assert!(drafts[1].image().is_none());
        assert_ne!(drafts[0].id(), drafts[1].id());
    }

    #[test]
    fn missing_image_names_the_path() {
        let dir = scratch_dir("missing");
        let result = drafts_from_config(&[persona("agent0", Some("nope.png"))], &dir);
        assert!(matches!(
            &result,
            Err(EngineError::Image { path, .. }) if path.ends_with("nope.png")
        ));
    }

    #[test]
    fn builtin_template_is_used_without_override() {
        let config = FeedsimConfig::default();
        assert!(persona_template(&config, Path::new("")).is_ok());
    }

    #[test]
    fn missing_template_file_is_a_persona_error() {
        let config = FeedsimConfig {
            persona_template: Some(PathBuf::from("does-not-exist.j2")),
            ..FeedsimConfig::default()
        };
        assert!(matches!(
            persona_template(&config, &scratch_dir("template")),
            Err(EngineError::Persona { .. })
        ));
    }

    #[test]
    fn custom_template_resolves_against_config_dir() {
        let dir = scratch_dir("custom");
        std::fs::write(dir.join("persona.j2"), "{{ name }}:{{ instructions }}").unwrap();
        let config = FeedsimConfig {
            persona_template: Some(PathBuf::from("persona.j2")),
            ..FeedsimConfig::default()
        };

        let template = persona_template(&config, &dir).unwrap();
        let drafts = vec![DraftPersona::new("agent0", "be brief").unwrap()];
        let personas = finalize_all(drafts, &template).unwrap();
        assert_eq!(personas[0].instructions(), "agent0:be brief");
    }

    #[test]
    fn every_persona_gets_an_agent() {
        let template = PersonaTemplate::builtin().unwrap();
        let drafts = vec![
            DraftPersona::new("agent0", "a").unwrap(),
            DraftPersona::new("agent1", "b").unwrap(),
        ];
        let personas = finalize_all(drafts, &template).unwrap();

        let agents = build_agents(personas, &LlmConfig::default(), &reqwest::Client::new());
        let names: Vec<&str> = agents.iter().map(Agent::name).collect();
        assert_eq!(names, vec!["agent0", "agent1"]);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let config = load_config(Path::new("/nonexistent/feedsim-config.yaml")).unwrap();
        assert_eq!(config.personas.len(), 0);
        assert_eq!(config.experiment.max_rounds, ExperimentConfig::default().max_rounds);
    }

    #[test]
    fn database_is_needed_for_postgres_or_db_personas() {
        let mut config = FeedsimConfig::default();
        assert!(!needs_database(&config, false));
        assert!(needs_database(&config, true));
        config.storage.backend = StorageBackend::Postgres;
        assert!(needs_database(&config, false));
    }

    #[test]
    fn config_dir_of_bare_file_name_is_empty() {
        assert_eq!(config_dir(Path::new("feedsim-config.yaml")), PathBuf::new());
        assert_eq!(config_dir(Path::new("conf/run.yaml")), PathBuf::from("conf"));
    }
}
