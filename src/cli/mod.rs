//! CLI module for deferred-rs
//!
//! This module provides command-line interface functionality including:
//! - Argument parsing with clap
//! - Configuration merging (CLI args + config files)
//! - Command handlers for check, jobs and migrate

pub mod config_merger;
pub mod executor;
pub mod handlers;
pub mod parser;
pub mod validation;

pub use config_merger::ConfigurationMerger;
pub use executor::execute_command;
pub use parser::{Backend, Cli, Commands, Environment, JobsArgs, JobsCommand};

use anyhow::Context;

use crate::config::settings::Settings;
use crate::logger::{LogLevelHandle, init_logger};

/// Load configuration and apply CLI overrides
///
/// # Errors
/// Returns error if configuration loading, merging, or validation fails
pub fn load_and_merge_config(cli: &Cli) -> anyhow::Result<Settings> {
    let merger = ConfigurationMerger::from_sources(cli.config.as_deref(), cli.env.map(Into::into))
        .context("Failed to load configuration")?;

    merger
        .merge_cli_args(cli)
        .context("Invalid configuration")
}

/// Initialize logger from settings
///
/// # Errors
/// Returns error if the logger section is invalid or a global subscriber is
/// already installed
pub fn init_logger_from_settings(settings: &Settings) -> anyhow::Result<LogLevelHandle> {
    let logger_config = settings
        .logger
        .clone()
        .into_logger_config()
        .context("Logger configuration error")?;

    init_logger(logger_config).context("Logger initialization error")
}
