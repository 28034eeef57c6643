//! Embedded schema migrations.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use crate::config::DatabaseConfig;
use crate::error::AppError;

/// Migrations compiled into the binary from `migrations/`.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Runs `f` on a blocking thread with a fresh synchronous connection.
///
/// Migration harnesses are synchronous, so they never touch the async pool.
pub async fn with_migration_connection<T, F>(
    config: &DatabaseConfig,
    operation: &'static str,
    f: F,
) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce(&mut PgConnection) -> anyhow::Result<T> + Send + 'static,
{
    let database_url = config.url.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&database_url).map_err(|e| AppError::Database {
            operation: format!("connect for {}", operation),
            source: anyhow::Error::from(e),
        })?;
        f(&mut conn).map_err(|source| AppError::Database {
            operation: operation.to_string(),
            source,
        })
    })
    .await
    .map_err(|e| AppError::Internal {
        source: anyhow::Error::from(e),
    })?
}

/// Applies every pending migration, returning the applied versions.
pub async fn run_pending_migrations(config: &DatabaseConfig) -> Result<Vec<String>, AppError> {
    let applied = with_migration_connection(config, "run pending migrations", |conn| {
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Migration error: {}", e))?;
        Ok(applied.iter().map(|m| m.to_string()).collect::<Vec<_>>())
    })
    .await?;

    tracing::info!(applied = applied.len(), "Database migrations finished");
    Ok(applied)
}
