//! Command executor for dispatching CLI commands
//!
//! This module provides the main entry point for executing CLI commands
//! after parsing and configuration loading.

use super::handlers::{CheckCommandHandler, JobsCommandHandler, MigrateCommandHandler};
use super::parser::{Cli, Commands};
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};

/// Execute a CLI command with the given settings
///
/// Running without a subcommand behaves like `check`.
///
/// # Errors
/// Returns errors from command handlers or validation failures
pub async fn execute_command(cli: &Cli, settings: Settings) -> AppResult<()> {
    validate_command_args(cli)?;

    match &cli.command {
        Some(Commands::Check { connect }) => CheckCommandHandler::new(settings).execute(*connect).await,
        None => CheckCommandHandler::new(settings).execute(false).await,
        Some(Commands::Jobs(args)) => {
            JobsCommandHandler::from_settings(&settings)
                .await?
                .execute(&args.action)
                .await
        }
        Some(Commands::Migrate { dry_run, rollback }) => {
            MigrateCommandHandler::new(settings.database)
                .execute(*dry_run, *rollback)
                .await
        }
    }
}

/// Validate command arguments before execution
fn validate_command_args(cli: &Cli) -> AppResult<()> {
    if let Err(msg) = cli.validate() {
        return Err(AppError::Validation {
            field: "cli_arguments".to_string(),
            reason: msg,
        });
    }

    if let Some(Commands::Migrate {
        rollback: Some(steps),
        ..
    }) = cli.command
        && steps > 50
    {
        eprintln!(
            "Warning: Rolling back {} migrations is a large operation. Consider using smaller steps.",
            steps
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::parser::Cli;
    use clap::Parser;

    #[tokio::test]
    async fn test_execute_default_is_check() {
        let cli = Cli::try_parse_from(["deferred-rs"]).unwrap();
        assert!(execute_command(&cli, Settings::default()).await.is_ok());
    }

    #[tokio::test]
    async fn test_execute_jobs_count_on_memory_store() {
        let cli = Cli::try_parse_from(["deferred-rs", "jobs", "count"]).unwrap();
        assert!(execute_command(&cli, Settings::default()).await.is_ok());
    }

    #[test]
    fn test_validate_conflicting_args() {
        let cli = Cli {
            command: Some(Commands::Migrate {
                dry_run: true,
                rollback: Some(5),
            }),
            config: None,
            env: None,
            verbose: false,
            quiet: false,
        };

        let result = validate_command_args(&cli);
        assert!(matches!(result, Err(AppError::Validation { field, .. }) if field == "cli_arguments"));
    }
}
