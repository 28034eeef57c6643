//! Repository layer for data access operations.
//!
//! Provides async operations on the trigger table.

mod trigger_repo;

pub use trigger_repo::TriggerRepository;
