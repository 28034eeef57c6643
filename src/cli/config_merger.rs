//! Configuration merger for CLI arguments and config files
//!
//! This module handles merging CLI argument overrides with file-based configuration,
//! implementing the configuration precedence logic.

use std::path::Path;

use super::parser::{Cli, Commands, JobsArgs};
use crate::config::error::ConfigError;
use crate::config::{ConfigLoader, Environment, settings::Settings};

/// Configuration merger that handles CLI argument integration with file-based configuration
///
/// CLI arguments override configuration file values.
pub struct ConfigurationMerger {
    base_config: Settings,
}

impl ConfigurationMerger {
    /// Create a new configuration merger with base configuration
    pub fn new(base_config: Settings) -> Self {
        Self { base_config }
    }

    /// Load the base configuration the way the CLI asked for it
    ///
    /// # Arguments
    /// * `config_path` - Single file to load instead of the layered config directory
    /// * `environment` - Environment overriding `DEFERRED_APP_ENV`
    ///
    /// # Errors
    /// Returns ConfigError if configuration loading fails
    pub fn from_sources(
        config_path: Option<&Path>,
        environment: Option<Environment>,
    ) -> Result<Self, ConfigError> {
        let mut loader = ConfigLoader::new()?;
        if let Some(path) = config_path {
            Self::validate_config_file_access(path)?;
            loader = loader.with_config_file(path);
        }
        if let Some(environment) = environment {
            loader = loader.with_environment(environment);
        }

        Ok(Self::new(loader.load()?))
    }

    /// Validate that the configuration file is accessible and readable
    fn validate_config_file_access(path: &Path) -> Result<(), ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::ValidationError {
                field: "config_file".to_string(),
                message: format!("Configuration file does not exist: '{}'", path.display()),
            });
        }

        match std::fs::File::open(path) {
            Ok(_) => Ok(()),
            Err(e) => Err(ConfigError::ValidationError {
                field: "config_file".to_string(),
                message: format!("Cannot read configuration file '{}': {}", path.display(), e),
            }),
        }
    }

    /// Merge CLI arguments with the base configuration
    ///
    /// CLI arguments have the highest priority. The merged configuration is
    /// validated before it is returned.
    pub fn merge_cli_args(&self, cli: &Cli) -> Result<Settings, ConfigError> {
        let mut config = self.base_config.clone();

        self.apply_global_overrides(&mut config, cli);

        if let Some(ref command) = cli.command {
            self.apply_command_overrides(&mut config, command);
        }

        config.validate()?;

        Ok(config)
    }

    /// Apply global CLI argument overrides
    fn apply_global_overrides(&self, config: &mut Settings, cli: &Cli) {
        if cli.verbose {
            config.logger.level = "debug".to_string();
        } else if cli.quiet {
            config.logger.level = "error".to_string();
        }
    }

    /// Apply command-specific CLI argument overrides
    fn apply_command_overrides(&self, config: &mut Settings, command: &Commands) {
        match command {
            Commands::Jobs(JobsArgs {
                backend: Some(backend),
                ..
            }) => {
                config.scheduler.backend = (*backend).into();
            }
            Commands::Migrate { .. } => {
                // Migrations only make sense against the database
                config.scheduler.backend = crate::config::StoreBackend::Postgres;
            }
            Commands::Jobs(_) | Commands::Check { .. } => {}
        }
    }

    /// Get the current configuration (useful for inspection)
    pub fn config(&self) -> &Settings {
        &self.base_config
    }
}
