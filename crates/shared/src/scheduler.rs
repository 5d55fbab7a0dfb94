//! Weekly update daemon.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::Config;
use crate::pipeline::{run_update, UpdatePaths};

/// Register the weekly update job. The returned scheduler must be started
/// with `start()` and kept alive for the job to fire.
///
/// A failed run is logged and the next one still fires on schedule.
pub async fn start_weekly_updater(config: Config, paths: UpdatePaths) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new()
        .await
        .context("Failed to create job scheduler")?;

    let schedule = config.schedule.clone();
    let config = Arc::new(config);
    let paths = Arc::new(paths);

    let job = Job::new_async(schedule.as_str(), move |_uuid, _lock| {
        let config = Arc::clone(&config);
        let paths = Arc::clone(&paths);

        Box::pin(async move {
            info!("Starting scheduled dashboard update");
            match run_update(&config, &paths, Utc::now()).await {
                Ok(outcome) if outcome.changed() => info!(
                    "Dashboard updated: {} publications written to {}",
                    outcome.publications,
                    paths.html.display()
                ),
                Ok(outcome) => info!(
                    "No changes ({} publications{})",
                    outcome.publications,
                    if outcome.kept_existing {
                        ", sources unavailable"
                    } else {
                        ""
                    }
                ),
                Err(e) => error!("Scheduled update failed: {:#}", e),
            }
        })
    })
    .with_context(|| format!("Invalid update schedule: {:?}", schedule))?;

    scheduler
        .add(job)
        .await
        .context("Failed to register update job")?;

    Ok(scheduler)
}
