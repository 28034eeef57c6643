//! Layered configuration loading.
//!
//! Sources, lowest priority first:
//! 1. `default.toml` (required)
//! 2. `{environment}.toml`
//! 3. `local.toml`
//! 4. `DEFERRED_*` environment variables, `__` separating nested keys
//!    (`DEFERRED_SCHEDULER__BATCH_SIZE` sets `scheduler.batch_size`)
//!
//! Pointing `DEFERRED_CONFIG_FILE` (or `--config`) at a file replaces the
//! three file layers with that single file.

use std::path::{Path, PathBuf};

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File, FileFormat};

use crate::config::environment::Environment as AppEnvironment;
use crate::config::error::ConfigError;
use crate::config::settings::Settings;

const CONFIG_DIR_ENV: &str = "DEFERRED_CONFIG_DIR";
const CONFIG_FILE_ENV: &str = "DEFERRED_CONFIG_FILE";
const DEFAULT_CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "DEFERRED";
const ENV_SEPARATOR: &str = "__";

type Builder = ConfigBuilder<DefaultState>;

/// One file layer and whether it must exist.
struct Layer {
    path: PathBuf,
    required: bool,
}

#[derive(Debug)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    config_file: Option<PathBuf>,
    environment: AppEnvironment,
}

impl ConfigLoader {
    /// Reads `DEFERRED_CONFIG_DIR`, `DEFERRED_CONFIG_FILE` and
    /// `DEFERRED_APP_ENV`.
    ///
    /// # Errors
    ///
    /// The directory and file variables are mutually exclusive.
    pub fn new() -> Result<Self, ConfigError> {
        let dir_var = std::env::var(CONFIG_DIR_ENV).ok();
        let config_file = std::env::var(CONFIG_FILE_ENV).ok().map(PathBuf::from);

        if dir_var.is_some() && config_file.is_some() {
            return Err(ConfigError::mutual_exclusivity(format!(
                "{CONFIG_DIR_ENV} and {CONFIG_FILE_ENV} cannot both be set; \
                 pick layered loading from a directory or a single file"
            )));
        }

        Ok(Self {
            config_dir: dir_var.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR), PathBuf::from),
            config_file,
            environment: AppEnvironment::from_env(),
        })
    }

    pub fn environment(&self) -> AppEnvironment {
        self.environment
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Load a single file instead of the layered directory.
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Override the environment picked from `DEFERRED_APP_ENV`.
    pub fn with_environment(mut self, environment: AppEnvironment) -> Self {
        self.environment = environment;
        self
    }

    /// Merges every source, deserializes and validates the result.
    pub fn load(&self) -> Result<Settings, ConfigError> {
        let settings: Settings = self
            .build_config()?
            .try_deserialize()
            .map_err(|e| ConfigError::ParseError(format!("Failed to deserialize configuration: {e}")))?;

        settings.validate()?;
        Ok(settings)
    }

    fn layers(&self) -> Vec<Layer> {
        if let Some(file) = &self.config_file {
            return vec![Layer {
                path: file.clone(),
                required: true,
            }];
        }

        vec![
            Layer {
                path: self.config_dir.join("default.toml"),
                required: true,
            },
            Layer {
                path: self.config_dir.join(self.environment.overlay_file()),
                required: false,
            },
            Layer {
                path: self.config_dir.join("local.toml"),
                required: false,
            },
        ]
    }

    fn build_config(&self) -> Result<Config, ConfigError> {
        let builder = self
            .layers()
            .into_iter()
            .try_fold(Config::builder(), |builder, layer| {
                Self::add_file_source(builder, &layer.path, layer.required)
            })?;

        Self::add_env_source(builder)
            .build()
            .map_err(ConfigError::from)
    }

    fn add_file_source(builder: Builder, path: &Path, required: bool) -> Result<Builder, ConfigError> {
        if required && !path.exists() {
            return Err(ConfigError::file_not_found(format!(
                "Required configuration file not found: {}",
                path.display()
            )));
        }

        Ok(builder.add_source(
            File::new(&path.to_string_lossy(), FileFormat::Toml).required(required),
        ))
    }

    fn add_env_source(builder: Builder) -> Builder {
        builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR)
                .ignore_empty(true)
                .try_parsing(true),
        )
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file: None,
            environment: AppEnvironment::default(),
        })
    }
}
