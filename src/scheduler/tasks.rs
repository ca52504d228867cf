use std::time::Duration;

use tracing::info;

use crate::config::HeartbeatConfig;
use crate::scheduler::Scheduler;

/// Register the heartbeat: one log line per interval, nothing else.
pub async fn register_builtin_tasks(
    scheduler: &Scheduler,
    heartbeat: &HeartbeatConfig,
) -> anyhow::Result<()> {
    if !heartbeat.enabled {
        info!("Heartbeat disabled");
        return Ok(());
    }

    let interval = Duration::from_secs(heartbeat.interval_secs.max(1));
    scheduler
        .add_interval_job(interval, "heartbeat", || {
            Box::pin(async {
                info!("Heartbeat: translation relay is alive");
            })
        })
        .await?;

    Ok(())
}
