//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Currently a single job: hourly removal of expired OTP challenges. It is
//! storage hygiene only; expiry is enforced at verification time.

use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::domains::phone_verification::sweep_expired;
use crate::kernel::ServerDeps;

/// Every hour, on the hour
const SWEEP_SCHEDULE: &str = "0 0 * * * *";

/// Start all scheduled tasks
pub async fn start_scheduler(deps: Arc<ServerDeps>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let sweep_job = Job::new_async(SWEEP_SCHEDULE, move |_uuid, _lock| {
        let deps = deps.clone();
        Box::pin(async move {
            if let Err(e) = sweep_expired(&deps).await {
                tracing::error!("Expired OTP sweep failed: {:#}", e);
            }
        })
    })?;

    scheduler.add(sweep_job).await?;
    scheduler.start().await?;

    tracing::info!("Scheduled tasks started (expired OTP sweep every hour)");
    Ok(scheduler)
}
