//! Check command handler
//!
//! Validates configuration and optionally opens the configured trigger store.

use crate::config::settings::Settings;
use crate::error::AppResult;
use crate::trigger::build_trigger_store;

/// Handler for the check command
pub struct CheckCommandHandler {
    config: Settings,
}

impl CheckCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Validate configuration, and open the store when `connect` is set
    pub async fn execute(&self, connect: bool) -> AppResult<()> {
        self.config.validate()?;

        let scheduler = &self.config.scheduler;
        println!("✓ Configuration is valid");
        println!("✓ Trigger store backend: {}", scheduler.backend);
        println!(
            "✓ Poll every {}ms, batch {}, up to {} concurrent executions",
            scheduler.poll_interval_ms, scheduler.batch_size, scheduler.max_concurrent_executions
        );
        println!("✓ Logger level: {}", self.config.logger.level);

        if connect {
            let store = build_trigger_store(scheduler, &self.config.database).await?;
            let count = store.count(None).await?;
            println!(
                "✓ Opened {} store, {} job(s) scheduled",
                store.backend_name(),
                count
            );
        }

        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreBackend;

    #[tokio::test]
    async fn test_check_default_config() {
        let handler = CheckCommandHandler::new(Settings::default());
        assert!(handler.execute(false).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_connects_to_memory_store() {
        let handler = CheckCommandHandler::new(Settings::default());
        assert!(handler.execute(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_check_invalid_config() {
        let mut config = Settings::default();
        config.scheduler.backend = StoreBackend::Postgres;
        let handler = CheckCommandHandler::new(config.clone());

        assert_eq!(handler.config(), &config);
        assert!(handler.execute(false).await.is_err());
    }
}
