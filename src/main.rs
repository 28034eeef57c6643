use clap::Parser;

use deferred_rs::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = cli::load_and_merge_config(&cli)?;
    let _log_handle = cli::init_logger_from_settings(&settings)?;

    tracing::debug!(
        version = deferred_rs::pkg_version(),
        backend = %settings.scheduler.backend,
        "Configuration loaded"
    );

    cli::execute_command(&cli, settings).await?;
    Ok(())
}
