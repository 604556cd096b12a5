//! Cron-driven publish scheduling.
//!
//! [`PublishScheduler`] owns one tokio task per job key. Registration is
//! idempotent: re-registering under the same key aborts and replaces the
//! previous task, so at most one publish job ever fires per tick.

use std::collections::HashMap;
use std::future::Future;

use chrono::Utc;
use tokio::task::JoinHandle;

/// Fixed key of the scheduled publish job.
pub const PUBLISH_JOB_KEY: &str = "publish";

#[derive(Default)]
pub struct PublishScheduler {
    jobs: HashMap<String, JoinHandle<()>>,
}

impl PublishScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `task` to run at every fire time of `schedule`. A prior
    /// job under the same `job_key` is aborted and replaced.
    pub fn register<F, Fut>(&mut self, job_key: &str, schedule: cron::Schedule, task: F)
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let key = job_key.to_string();
        tracing::info!(job_key, schedule = %schedule, "registering scheduled job");
        let handle = tokio::spawn(run_schedule(schedule, task));
        if let Some(old) = self.jobs.insert(key, handle) {
            old.abort();
        }
    }

    /// Number of live registered jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Aborts every registered job.
    pub fn shutdown(&mut self) {
        for (_, handle) in self.jobs.drain() {
            handle.abort();
        }
    }
}

impl Drop for PublishScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_schedule<F, Fut>(schedule: cron::Schedule, task: F)
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        let Some(next) = schedule.upcoming(Utc).next() else {
            tracing::warn!("schedule has no upcoming fire times, job stops");
            break;
        };
        let wait = (next - Utc::now()).to_std().unwrap_or_default();
        tokio::time::sleep(wait).await;
        task().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn every_second() -> cron::Schedule {
        cron::Schedule::from_str("* * * * * *").unwrap()
    }

    #[tokio::test]
    async fn registered_job_fires() {
        let mut scheduler = PublishScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        scheduler.register(PUBLISH_JOB_KEY, every_second(), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(counter.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn reregistration_replaces_the_previous_job() {
        let mut scheduler = PublishScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let c = first.clone();
        scheduler.register(PUBLISH_JOB_KEY, every_second(), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        let c = second.clone();
        scheduler.register(PUBLISH_JOB_KEY, every_second(), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        assert_eq!(scheduler.job_count(), 1);

        let first_after_replace = first.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Only the replacement fires; the original task was aborted.
        assert_eq!(first.load(Ordering::SeqCst), first_after_replace);
        assert!(second.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn distinct_keys_coexist() {
        let mut scheduler = PublishScheduler::new();
        scheduler.register("a", every_second(), || async {});
        scheduler.register("b", every_second(), || async {});
        assert_eq!(scheduler.job_count(), 2);

        scheduler.shutdown();
        assert_eq!(scheduler.job_count(), 0);
    }
}
