//! deferred-rs Library
//!
//! Persistent one-shot job scheduling: schedule typed work for a future
//! instant, cancel it by id or group, and have it executed at most once when
//! it falls due, across process restarts.

use shadow_rs::shadow;
shadow!(build);

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod logger;
pub mod models;
pub mod repositories;
pub mod runtime;
pub mod schema;
pub mod services;
pub mod trigger;

pub use jobs::{
    CodecRegistry, DispatchRegistry, Job, JobError, JobExecutor, JobId, JobRemover, JobResult,
    JobScheduler,
};
pub use runtime::JobRuntime;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
