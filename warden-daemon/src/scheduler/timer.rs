//! Periodic trigger
//!
//! Fires the scheduler's periodic trigger every `interval`, starting one
//! interval after boot. The boot-time run is a separate startup trigger.

use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::scheduler::job::JobScheduler;

pub fn spawn_periodic(scheduler: JobScheduler, interval: Duration) -> JoinHandle<()> {
    info!(
        "Scheduler initialized. Workflows will run every {} hours",
        interval.as_secs() / 3600
    );

    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            scheduler.set_next_run_time(
                chrono::Duration::from_std(interval)
                    .ok()
                    .map(|step| Utc::now() + step),
            );

            ticker.tick().await;

            debug!("Periodic trigger fired");
            scheduler.trigger_periodic();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::job::tests::GatedWorkflow;

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_per_interval() {
        let scheduler = JobScheduler::new(GatedWorkflow::open(|| Ok(true)));
        let timer = spawn_periodic(scheduler.clone(), Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_secs(60)).await;
        let status = scheduler.status();
        assert_eq!(status.total_runs, 0);
        assert!(status.next_run_time.is_some());

        tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
        let status = scheduler.status();
        assert_eq!(status.total_runs, 2);
        assert_eq!(status.successful_runs, 2);

        timer.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_tick_is_skipped() {
        let workflow = GatedWorkflow::new(|| Ok(true));
        let scheduler = JobScheduler::new(workflow.clone());
        let timer = spawn_periodic(scheduler.clone(), Duration::from_secs(3600));

        tokio::time::sleep(Duration::from_secs(2 * 3600 + 60)).await;
        let status = scheduler.status();
        assert_eq!(status.total_runs, 1);
        assert!(status.is_running);

        workflow.release();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!scheduler.status().is_running);

        timer.abort();
    }
}
