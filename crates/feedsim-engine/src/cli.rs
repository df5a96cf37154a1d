//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use feedsim_core::config::FeedsimConfig;

/// Default config file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "feedsim-config.yaml";

/// Run one feedsim experiment.
#[derive(Parser, Debug)]
#[command(name = "feedsim-engine")]
#[command(about = "Round-based social feed simulation driven by LLM personas")]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Experiment identifier, overriding `experiment.id`
    #[arg(short, long)]
    pub experiment_id: Option<String>,

    /// Number of rounds, overriding `experiment.max_rounds`
    #[arg(short, long)]
    pub rounds: Option<u32>,

    /// Load personas from the `agents` table instead of the config file
    #[arg(long, default_value_t = false)]
    pub from_db: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut FeedsimConfig) {
        if let Some(id) = &self.experiment_id {
            config.experiment.id.clone_from(id);
        }
        if let Some(rounds) = self.rounds {
            config.experiment.max_rounds = rounds;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_project_config() {
        let args = Args::try_parse_from(["feedsim-engine"]).unwrap();
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(args.experiment_id.is_none());
        assert!(args.rounds.is_none());
        assert!(!args.from_db);
    }

    #[test]
    fn overrides_replace_config_values() {
        let args = Args::try_parse_from([
            "feedsim-engine",
            "--config",
            "other.yaml",
            "--experiment-id",
            "exp-7",
            "--rounds",
            "3",
            "--from-db",
        ])
        .unwrap();
        assert!(args.from_db);

        let mut config = FeedsimConfig::default();
        args.apply(&mut config);
        assert_eq!(config.experiment.id, "exp-7");
        assert_eq!(config.experiment.max_rounds, 3);
    }

    #[test]
    fn absent_overrides_keep_config_values() {
        let args = Args::try_parse_from(["feedsim-engine"]).unwrap();
        let mut config = FeedsimConfig::default();
        let before = config.experiment.clone();
        args.apply(&mut config);
        assert_eq!(config.experiment, before);
    }

    #[test]
    fn negative_rounds_are_rejected() {
        assert!(Args::try_parse_from(["feedsim-engine", "--rounds", "-1"]).is_err());
    }
}
