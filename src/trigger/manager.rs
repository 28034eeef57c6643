//! Builds the trigger store selected by `[scheduler].backend`.

use std::sync::Arc;

use crate::config::{DatabaseConfig, SchedulerConfig, StoreBackend};
use crate::db::{establish_async_connection_pool, run_pending_migrations};
use crate::trigger::{
    DiskTriggerStore, MemoryTriggerStore, PostgresTriggerStore, RedisTriggerStore, StoreError,
    TriggerStore,
};

/// Create the configured backend.
///
/// `database` is only consulted for the postgres backend, which opens its own
/// connection pool and applies pending migrations first when
/// `database.auto_migrate` is set.
pub async fn build_trigger_store(
    scheduler: &SchedulerConfig,
    database: &DatabaseConfig,
) -> Result<Arc<dyn TriggerStore>, StoreError> {
    let store: Arc<dyn TriggerStore> = match scheduler.backend {
        StoreBackend::Memory => Arc::new(MemoryTriggerStore::new()),
        StoreBackend::Disk => Arc::new(DiskTriggerStore::new(&scheduler.disk)?),
        StoreBackend::Postgres => {
            let pool = establish_async_connection_pool(database).await?;
            if database.auto_migrate {
                run_pending_migrations(database).await?;
            }
            Arc::new(PostgresTriggerStore::new(pool))
        }
        StoreBackend::Redis => Arc::new(RedisTriggerStore::new(&scheduler.redis).await?),
    };

    tracing::info!(backend = store.backend_name(), "Trigger store initialized");
    Ok(store)
}
