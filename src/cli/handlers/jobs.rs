//! Jobs command handler
//!
//! Lists, counts and removes scheduled jobs directly in the configured
//! trigger store. Nothing here fires jobs.

use std::io::Write;
use std::sync::Arc;

use crate::cli::parser::JobsCommand;
use crate::config::settings::Settings;
use crate::error::{AppError, AppResult};
use crate::jobs::{JobId, JobRemover, PersistedJobRecord};
use crate::services::JobService;
use crate::trigger::{TriggerStore, build_trigger_store};

/// Handler for the jobs command
pub struct JobsCommandHandler {
    service: JobService,
    remover: JobRemover,
}

impl JobsCommandHandler {
    pub fn new(store: Arc<dyn TriggerStore>) -> Self {
        if store.backend_name() == "memory" {
            tracing::warn!("Using the memory backend, the store starts out empty");
        }
        Self {
            service: JobService::new(Arc::clone(&store)),
            remover: JobRemover::new(store),
        }
    }

    /// Open the store selected by `[scheduler]`
    pub async fn from_settings(settings: &Settings) -> AppResult<Self> {
        let store = build_trigger_store(&settings.scheduler, &settings.database).await?;
        Ok(Self::new(store))
    }

    /// Execute one jobs action, writing results to stdout
    pub async fn execute(&self, action: &JobsCommand) -> AppResult<()> {
        let mut buffer = Vec::new();
        self.execute_to(action, &mut buffer).await?;
        std::io::stdout().write_all(&buffer).map_err(io_error)
    }

    /// Execute one jobs action, writing results to `out`
    pub async fn execute_to<W: Write>(&self, action: &JobsCommand, out: &mut W) -> AppResult<()> {
        match action {
            JobsCommand::List { group, json } => {
                let records = self.service.list_jobs(group.as_deref()).await?;
                if *json {
                    for record in &records {
                        let line = serde_json::to_string(record).map_err(|e| AppError::Internal {
                            source: anyhow::Error::from(e),
                        })?;
                        writeln!(out, "{}", line).map_err(io_error)?;
                    }
                } else {
                    write_table(out, &records)?;
                }
            }
            JobsCommand::Count { group } => {
                let count = self.service.count_jobs(group.as_deref()).await?;
                writeln!(out, "{}", count).map_err(io_error)?;
            }
            JobsCommand::Groups => {
                for group in self.service.job_groups().await? {
                    writeln!(out, "{}", group).map_err(io_error)?;
                }
            }
            JobsCommand::Remove { id, group } => {
                let removed = self.remover.remove(&JobId::from(id.as_str()), group).await?;
                if removed {
                    writeln!(out, "✓ Removed job {} from group {}", id, group).map_err(io_error)?;
                } else {
                    writeln!(out, "No job {} in group {}", id, group).map_err(io_error)?;
                }
            }
            JobsCommand::RemoveGroup { group } => {
                let removed = self.remover.remove_group(group).await?;
                writeln!(out, "✓ Removed {} job(s) from group {}", removed, group)
                    .map_err(io_error)?;
            }
        }
        Ok(())
    }
}

fn write_table<W: Write>(out: &mut W, records: &[PersistedJobRecord]) -> AppResult<()> {
    if records.is_empty() {
        writeln!(out, "No scheduled jobs").map_err(io_error)?;
        return Ok(());
    }

    writeln!(
        out,
        "{:<36}  {:<20}  {:<24}  {:<20}  TYPE",
        "ID", "GROUP", "NAME", "TRIGGER AT"
    )
    .map_err(io_error)?;
    for record in records {
        writeln!(
            out,
            "{:<36}  {:<20}  {:<24}  {:<20}  {}",
            record.job_id,
            record.job_group,
            record.job_name,
            record.trigger_at.strftime("%Y-%m-%dT%H:%M:%SZ").to_string(),
            record.type_tag
        )
        .map_err(io_error)?;
    }
    Ok(())
}

fn io_error(e: std::io::Error) -> AppError {
    AppError::Internal {
        source: anyhow::Error::from(e),
    }
}
