//! Trigger store module with multiple backend implementations.
//!
//! A trigger store is the durable home of scheduled jobs. Every record sits in
//! the store until it is either claimed by the runner (and handed to a
//! dispatcher) or removed by a caller; claiming and removal both delete, so a
//! record is consumed exactly once.
//!
//! # Backends
//!
//! - **Memory**: DashMap, lost on restart
//! - **Disk**: sled through `cached`'s `DiskCache`, flushed on every change
//! - **Postgres**: `scheduled_triggers` table, claims with `SKIP LOCKED`
//! - **Redis**: sorted set of trigger times plus per-group sets
//!
//! # Example
//!
//! ```ignore
//! use deferred_rs::trigger::build_trigger_store;
//!
//! let store = build_trigger_store(&settings.scheduler, &settings.database).await?;
//! let due = store.claim_due(jiff::Timestamp::now(), 10).await?;
//! ```

mod disk;
mod error;
mod manager;
mod memory;
mod postgres;
mod redis;
mod traits;

pub use disk::DiskTriggerStore;
pub use error::StoreError;
pub use manager::build_trigger_store;
pub use memory::MemoryTriggerStore;
pub use postgres::PostgresTriggerStore;
pub use redis::RedisTriggerStore;
pub use traits::TriggerStore;

use jiff::{SignedDuration, Timestamp};

/// Rounds `at` up to a whole multiple of `unit_nanos`.
///
/// Backends that keep coarser time than a `Timestamp` store the rounded value,
/// so a record never becomes due before its trigger time.
pub(crate) fn round_up(at: Timestamp, unit_nanos: i32) -> Timestamp {
    let rem = at.subsec_nanosecond().rem_euclid(unit_nanos);
    if rem == 0 {
        return at;
    }
    at.checked_add(SignedDuration::from_nanos(i64::from(unit_nanos - rem)))
        .unwrap_or(at)
}
