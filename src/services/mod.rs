//! Service layer for operational queries.
//!
//! Services sit on top of the trigger store and are what the CLI and any
//! embedding application use to inspect scheduled jobs.

mod job_service;

pub use job_service::JobService;
