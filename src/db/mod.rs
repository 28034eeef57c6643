//! Database connection pool module.
//!
//! Provides async PostgreSQL connection pooling using diesel_async with bb8,
//! plus the embedded migrations for the trigger table.

mod migrate;
mod pool;

pub use migrate::{MIGRATIONS, run_pending_migrations, with_migration_connection};
pub use pool::{AsyncDbPool, establish_async_connection_pool};
