//! Engine binary for feedsim.
//!
//! Wires configuration, personas, completion backends, and an event sink
//! into one experiment and runs it to completion.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments and load `feedsim-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` if storage or persona loading needs it
//! 4. Load persona drafts from the config file or the `agents` table
//! 5. Finalize personas against the shared user directory
//! 6. Build one completion client per agent
//! 7. Run every round
//! 8. Log the summary

mod cli;
mod error;
mod setup;
mod sink;

use std::time::Duration;

use clap::Parser;
use feedsim_core::config::StorageBackend;
use feedsim_core::experiment::Experiment;
use feedsim_core::persona::finalize_all;
use feedsim_core::sink::LogSink;
use feedsim_db::PgEventSink;
use tracing::{info, warn};

use crate::cli::Args;
use crate::error::EngineError;
use crate::sink::EngineSink;

/// Connect timeout for the shared HTTP client.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any startup step fails. Failures inside rounds are
/// logged and never abort the run.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let args = Args::parse();
    let mut config = setup::load_config(&args.config)?;
    args.apply(&mut config);
    config.validate().map_err(EngineError::from)?;
    let base_dir = setup::config_dir(&args.config);

    // 2. Initialize structured logging.
    setup::init_tracing(&config.logging);
    info!(
        config = %args.config.display(),
        config_found = args.config.exists(),
        experiment_id = %config.experiment.id,
        max_rounds = config.experiment.max_rounds,
        primary_backend = config.llm.primary.kind.as_str(),
        fallback_backend = config.llm.fallback.as_ref().map(|f| f.kind.as_str()),
        "feedsim-engine starting"
    );

    // 3. Connect to the database when needed.
    let pool = if setup::needs_database(&config, args.from_db) {
        Some(setup::connect_database(&config.storage.database_url).await?)
    } else {
        None
    };

    // 4. Load persona drafts.
    let drafts = match pool.as_ref().filter(|_| args.from_db) {
        Some(pool) => setup::drafts_from_database(pool, &config.experiment.id).await?,
        None => setup::drafts_from_config(&config.personas, &base_dir)?,
    };
    if drafts.is_empty() {
        let message = if args.from_db {
            format!("no agents stored for experiment {}", config.experiment.id)
        } else {
            format!("no personas in {}", args.config.display())
        };
        return Err(EngineError::NoPersonas { message }.into());
    }

    // 5. Pick the sink, registering the experiment for database storage.
    let mut sink = match (&pool, config.storage.backend) {
        (Some(pool), StorageBackend::Postgres) => {
            setup::register_experiment(pool, &config.experiment, &drafts).await?;
            EngineSink::Postgres(PgEventSink::new(pool.clone()))
        }
        _ => EngineSink::Log(LogSink::new()),
    };

    // 6. Finalize personas.
    let template = setup::persona_template(&config, &base_dir)?;
    let personas = finalize_all(drafts, &template).map_err(EngineError::from)?;
    info!(agents = personas.len(), "Personas finalized");

    // 7. Build agents.
    let client = feedsim_llm::http_client(HTTP_CONNECT_TIMEOUT).map_err(EngineError::from)?;
    let agents = setup::build_agents(personas, &config.llm, &client);

    // 8. Run the experiment.
    let mut experiment = Experiment::new(
        config.experiment.id.clone(),
        config.experiment.name.clone(),
        config.experiment.max_rounds,
        agents,
    );
    let summary = experiment.run(&mut sink).await;

    // 9. Log results.
    let failed: Vec<u32> = summary.failed_rounds().collect();
    if !failed.is_empty() {
        warn!(
            experiment_id = %summary.experiment_id,
            failed_rounds = ?failed,
            "Some round batches were not persisted"
        );
    }
    info!(
        experiment_id = %summary.experiment_id,
        rounds = summary.rounds.len(),
        total_events = summary.total_events(),
        final_events = summary.final_events.len(),
        "feedsim-engine shutdown complete"
    );

    if let Some(pool) = pool {
        pool.close().await;
    }

    Ok(())
}
