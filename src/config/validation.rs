//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::config::error::ConfigError;
use crate::config::settings::{
    DatabaseConfig, FileSettings, LoggerSettings, SchedulerConfig, Settings, StoreBackend,
};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

impl DatabaseConfig {
    /// Validate database configuration
    ///
    /// # Validation Rules
    /// - URL must not be empty
    /// - URL must be a PostgreSQL connection string
    /// - Max and min connections must be greater than 0
    /// - Min connections must not exceed max connections
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required. Please specify a valid database connection string.",
            ));
        }

        if !self.is_valid_database_url() {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected format: postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections == 0 {
            return Err(ConfigError::validation(
                "database.min_connections",
                "Min connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::ValidationError {
                field: "database.min_connections".to_string(),
                message: format!(
                    "Min connections ({}) cannot exceed max connections ({}).",
                    self.min_connections, self.max_connections
                ),
            });
        }

        Ok(())
    }

    fn is_valid_database_url(&self) -> bool {
        ["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }
}

impl FileSettings {
    /// Validate file settings
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - If file logging is enabled, path must not be empty
    /// - Log format must be one of: full, compact, json
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.file.validate()?;

        Ok(())
    }
}

impl SchedulerConfig {
    /// Validate scheduler configuration
    ///
    /// # Validation Rules
    /// - Poll interval must be a whole number of seconds, at least one
    /// - Batch size and execution limit must be greater than 0
    /// - The selected backend's own section must be usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms < 1000 || self.poll_interval_ms % 1000 != 0 {
            return Err(ConfigError::ValidationError {
                field: "scheduler.poll_interval_ms".to_string(),
                message: format!(
                    "Poll interval must be a whole number of seconds (1000, 2000, ...), got {} ms.",
                    self.poll_interval_ms
                ),
            });
        }

        if self.batch_size == 0 {
            return Err(ConfigError::validation(
                "scheduler.batch_size",
                "Batch size must be greater than 0.",
            ));
        }

        if self.max_concurrent_executions == 0 {
            return Err(ConfigError::validation(
                "scheduler.max_concurrent_executions",
                "Max concurrent executions must be greater than 0.",
            ));
        }

        match self.backend {
            StoreBackend::Disk => {
                if self.disk.directory.trim().is_empty() {
                    return Err(ConfigError::validation(
                        "scheduler.disk.directory",
                        "Directory is required for the disk backend.",
                    ));
                }
                if self.disk.name.trim().is_empty() {
                    return Err(ConfigError::validation(
                        "scheduler.disk.name",
                        "Store name is required for the disk backend.",
                    ));
                }
            }
            StoreBackend::Redis => {
                if !self.redis.url.starts_with("redis://") && !self.redis.url.starts_with("rediss://")
                {
                    return Err(ConfigError::validation(
                        "scheduler.redis.url",
                        "Invalid Redis URL. Expected format: redis://host[:port][/db]",
                    ));
                }
                if self.redis.pool_size == 0 {
                    return Err(ConfigError::validation(
                        "scheduler.redis.pool_size",
                        "Pool size must be greater than 0.",
                    ));
                }
                if self.redis.key_prefix.trim().is_empty() {
                    return Err(ConfigError::validation(
                        "scheduler.redis.key_prefix",
                        "Key prefix must not be empty.",
                    ));
                }
            }
            StoreBackend::Memory | StoreBackend::Postgres => {}
        }

        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// The database section is only checked when the postgres backend is
    /// selected. Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logger.validate()?;
        self.scheduler.validate()?;
        if self.scheduler.backend == StoreBackend::Postgres {
            self.database.validate()?;
        }
        Ok(())
    }
}
