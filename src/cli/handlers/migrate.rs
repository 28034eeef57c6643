//! Migrate command handler
//!
//! Applies, previews or reverts the embedded migrations that create the
//! `scheduled_triggers` table for the postgres backend.

use diesel_migrations::MigrationHarness;

use crate::config::DatabaseConfig;
use crate::db::{MIGRATIONS, run_pending_migrations, with_migration_connection};
use crate::error::{AppError, AppResult};

/// Handler for the migrate command
pub struct MigrateCommandHandler {
    database: DatabaseConfig,
}

impl MigrateCommandHandler {
    pub fn new(database: DatabaseConfig) -> Self {
        Self { database }
    }

    /// Execute the migrate command
    ///
    /// # Arguments
    /// * `dry_run` - Only list pending migrations
    /// * `rollback` - Revert this many of the most recent migrations
    ///
    /// # Errors
    /// - `AppError::Validation` for zero rollback steps
    /// - `AppError::Configuration` for an unusable database section
    /// - `AppError::Database` when connecting or migrating fails
    pub async fn execute(&self, dry_run: bool, rollback: Option<u32>) -> AppResult<()> {
        if rollback == Some(0) {
            return Err(AppError::Validation {
                field: "rollback_steps".to_string(),
                reason: "Number of rollback steps must be greater than 0".to_string(),
            });
        }
        self.database.validate()?;

        match (dry_run, rollback) {
            (true, _) => self.show_pending_migrations().await,
            (false, Some(steps)) => self.rollback_migrations(steps).await,
            (false, None) => self.run_migrations().await,
        }
    }

    async fn show_pending_migrations(&self) -> AppResult<()> {
        println!("Checking for pending migrations...");

        let pending: Vec<String> =
            with_migration_connection(&self.database, "check pending migrations", |conn| {
                let pending = conn
                    .pending_migrations(MIGRATIONS)
                    .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
                Ok(pending.iter().map(|m| m.name().to_string()).collect())
            })
            .await?;

        if pending.is_empty() {
            println!("✓ No pending migrations, the trigger schema is up to date");
        } else {
            println!("Found {} pending migration(s):", pending.len());
            for name in &pending {
                println!("  - {}", name);
            }
            println!("\nRun without --dry-run to apply them");
        }
        Ok(())
    }

    async fn run_migrations(&self) -> AppResult<()> {
        println!("Running database migrations...");

        let applied = run_pending_migrations(&self.database).await?;

        if applied.is_empty() {
            println!("✓ No migrations to apply, the trigger schema is up to date");
        } else {
            println!("✓ Applied {} migration(s):", applied.len());
            for name in &applied {
                println!("  - {}", name);
            }
        }
        Ok(())
    }

    async fn rollback_migrations(&self, steps: u32) -> AppResult<()> {
        println!("Rolling back {} migration(s)...", steps);

        let reverted: Vec<String> =
            with_migration_connection(&self.database, "revert migrations", move |conn| {
                let applied = conn
                    .applied_migrations()
                    .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
                if applied.len() < steps as usize {
                    anyhow::bail!(
                        "Cannot rollback {} migrations, only {} applied",
                        steps,
                        applied.len()
                    );
                }

                let mut reverted = Vec::with_capacity(steps as usize);
                for _ in 0..steps {
                    let version = conn
                        .revert_last_migration(MIGRATIONS)
                        .map_err(|e| anyhow::anyhow!("Migration rollback error: {}", e))?;
                    reverted.push(version.to_string());
                }
                Ok(reverted)
            })
            .await?;

        println!("✓ Rolled back {} migration(s):", reverted.len());
        for version in &reverted {
            println!("  - {}", version);
        }
        tracing::info!(reverted = reverted.len(), "Database migrations reverted");
        Ok(())
    }

    pub fn database(&self) -> &DatabaseConfig {
        &self.database
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database() -> DatabaseConfig {
        DatabaseConfig {
            url: "postgres://localhost/test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_migrate_handler_new() {
        let handler = MigrateCommandHandler::new(database());
        assert_eq!(handler.database(), &database());
    }

    #[tokio::test]
    async fn test_migrate_handler_zero_rollback_steps() {
        let handler = MigrateCommandHandler::new(database());

        match handler.execute(false, Some(0)).await {
            Err(AppError::Validation { field, reason }) => {
                assert_eq!(field, "rollback_steps");
                assert!(reason.contains("must be greater than 0"));
            }
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_migrate_handler_requires_database_url() {
        let handler = MigrateCommandHandler::new(DatabaseConfig::default());
        assert!(handler.execute(true, None).await.is_err());
    }
}
