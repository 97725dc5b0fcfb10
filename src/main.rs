mod config;
mod digest;
mod llm;
mod pipeline;
mod platform;
mod scheduler;
mod scrape;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Secrets};
use crate::pipeline::DigestPipeline;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,digestbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // `--once` runs a single digest and exits; any other argument is the
    // config file path.
    let mut run_once = false;
    let mut config_path = PathBuf::from("config.toml");
    for arg in std::env::args().skip(1) {
        if arg == "--once" {
            run_once = true;
        } else {
            config_path = PathBuf::from(arg);
        }
    }

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let secrets = Secrets::from_env()?;

    info!("Configuration loaded successfully");
    info!("  Gemini model: {}", config.gemini.model);
    info!("  Sources: {}", config.sources().len());
    info!("  Timezone: {}", config.digest.timezone);
    info!(
        "  Schedules: {} / {}",
        config.schedule.morning_cron, config.schedule.evening_cron
    );

    let allowed_user_ids = config.telegram.allowed_user_ids.clone();
    let pipeline = Arc::new(DigestPipeline::new(config, secrets)?);

    if run_once {
        let report = pipeline.run().await?;
        info!("Digest run complete: {}", report.summary());
        return Ok(());
    }

    // Register the two daily firings, then block on the command listener.
    let sched = Scheduler::new().await?;
    scheduler::jobs::register_digest_jobs(&sched, pipeline.clone()).await?;
    sched.start().await?;

    platform::telegram::run(pipeline, allowed_user_ids).await?;

    Ok(())
}
