//! CLI argument parsing with clap
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, arguments, and their documentation.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::StoreBackend;

/// Operate a persistent one-shot job store
#[derive(Parser, Debug)]
#[command(name = "deferred-rs")]
#[command(about = "Inspect and maintain a persistent one-shot job store")]
#[command(long_about = "
deferred-rs keeps one-shot jobs in a durable trigger store (memory, disk,
postgres or redis) until they fall due. This binary covers the operational
side: schema migrations, listing and removing scheduled jobs, and checking
configuration.

EXAMPLES:
    # Validate configuration
    deferred-rs check

    # Validate configuration and open the configured store
    deferred-rs check --connect

    # List jobs in one group
    deferred-rs jobs list --group hearings

    # Count jobs in a disk store, overriding the configured backend
    deferred-rs jobs --backend disk count

    # Remove one job, then a whole group
    deferred-rs jobs remove --id 7b0c... --group hearings
    deferred-rs jobs remove-group --group hearings

    # Run database migrations for the postgres backend
    deferred-rs migrate

    # Rollback the last migration
    deferred-rs migrate --rollback 1
")]
#[command(version = crate::clap_long_version())]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    ///
    /// Load only this TOML file (plus DEFERRED_* environment variables)
    /// instead of the layered files under config/.
    ///
    /// Example: --config /etc/deferred-rs/production.toml
    #[arg(short, long, value_name = "FILE", value_parser = super::validation::validate_config_file_path)]
    pub config: Option<PathBuf>,

    /// Override environment detection
    ///
    /// Selects which config/{env}.toml is layered over the defaults.
    ///
    /// Available values: development (dev), test, staging (stage), production (prod)
    #[arg(short, long, value_enum)]
    pub env: Option<Environment>,

    /// Enable verbose logging
    ///
    /// Raises the log level to debug. Cannot be used with --quiet.
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress non-error output
    ///
    /// Lowers the log level to error. Cannot be used with --verbose.
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration (default)
    ///
    /// Loads and validates every configuration section. With --connect the
    /// configured trigger store is opened as well.
    ///
    /// Examples:
    ///   deferred-rs check
    ///   deferred-rs check --connect
    Check {
        /// Also open the configured trigger store
        #[arg(long)]
        connect: bool,
    },
    /// Inspect or remove scheduled jobs
    Jobs(JobsArgs),
    /// Database migration operations
    ///
    /// Manage the schema used by the postgres backend.
    ///
    /// Examples:
    ///   deferred-rs migrate                    # Apply all pending migrations
    ///   deferred-rs migrate --dry-run          # Show pending migrations without applying
    ///   deferred-rs migrate --rollback 1       # Rollback the last migration
    Migrate {
        /// Show pending migrations without applying
        ///
        /// Cannot be used with --rollback.
        #[arg(long, conflicts_with = "rollback")]
        dry_run: bool,

        /// Number of migrations to rollback
        ///
        /// Reverts the specified number of most recent migrations.
        /// Must be between 1 and 100. Cannot be used with --dry-run.
        #[arg(long, value_name = "STEPS", conflicts_with = "dry_run", value_parser = super::validation::validate_rollback_steps)]
        rollback: Option<u32>,
    },
}

#[derive(Args, Debug)]
pub struct JobsArgs {
    /// Trigger store backend, overriding scheduler.backend
    #[arg(long, value_enum, global = true)]
    pub backend: Option<Backend>,

    #[command(subcommand)]
    pub action: JobsCommand,
}

#[derive(Subcommand, Debug)]
pub enum JobsCommand {
    /// List scheduled jobs ordered by trigger time
    List {
        /// Only jobs in this group
        #[arg(long, value_parser = super::validation::validate_job_group)]
        group: Option<String>,

        /// Print one JSON object per line
        #[arg(long)]
        json: bool,
    },
    /// Count scheduled jobs
    Count {
        /// Only jobs in this group
        #[arg(long, value_parser = super::validation::validate_job_group)]
        group: Option<String>,
    },
    /// List groups that have scheduled jobs
    Groups,
    /// Remove one scheduled job
    Remove {
        /// Job id returned when the job was scheduled
        #[arg(long, value_parser = super::validation::validate_job_id)]
        id: String,

        /// Group the job was scheduled in
        #[arg(long, value_parser = super::validation::validate_job_group)]
        group: String,
    },
    /// Remove every scheduled job in a group
    RemoveGroup {
        #[arg(long, value_parser = super::validation::validate_job_group)]
        group: String,
    },
}

/// Environment options
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum Environment {
    #[value(name = "development", alias = "dev")]
    Development,
    #[value(name = "test")]
    Test,
    #[value(name = "staging", alias = "stage")]
    Staging,
    #[value(name = "production", alias = "prod")]
    Production,
}

/// Trigger store backends selectable on the command line
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Disk,
    Postgres,
    Redis,
}

impl Cli {
    /// Validate argument combinations clap cannot express
    pub fn validate(&self) -> Result<(), String> {
        if let Some(Commands::Migrate { dry_run, rollback }) = &self.command
            && *dry_run
            && rollback.is_some()
        {
            return Err("Cannot use --dry-run and --rollback together".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use --verbose and --quiet together".to_string());
        }

        Ok(())
    }
}

impl From<Backend> for StoreBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Memory => StoreBackend::Memory,
            Backend::Disk => StoreBackend::Disk,
            Backend::Postgres => StoreBackend::Postgres,
            Backend::Redis => StoreBackend::Redis,
        }
    }
}

impl From<Environment> for crate::config::Environment {
    fn from(env: Environment) -> Self {
        match env {
            Environment::Development => crate::config::Environment::Development,
            Environment::Test => crate::config::Environment::Test,
            Environment::Staging => crate::config::Environment::Staging,
            Environment::Production => crate::config::Environment::Production,
        }
    }
}
