use std::sync::Arc;

use tracing::error;

use crate::pipeline::DigestPipeline;
use crate::scheduler::Scheduler;

/// Register the two daily digest jobs. These, plus the manual triggers
/// (`--once` and /digest), are the only ways a run starts.
pub async fn register_digest_jobs(
    scheduler: &Scheduler,
    pipeline: Arc<DigestPipeline>,
) -> anyhow::Result<()> {
    let jobs = [
        ("morning digest", pipeline.config.schedule.morning_cron.clone()),
        ("evening digest", pipeline.config.schedule.evening_cron.clone()),
    ];

    for (name, cron_expr) in jobs {
        let pipeline = pipeline.clone();
        scheduler
            .add_cron_job(&cron_expr, name, move || {
                let pipeline = pipeline.clone();
                Box::pin(async move {
                    if let Err(e) = pipeline.run().await {
                        error!("Scheduled digest run failed: {:#}", e);
                    }
                })
            })
            .await?;
    }

    Ok(())
}
