//! Fixed-size worker pool pulling jobs from the shared feed.

use medbatch_core::{Job, JobResult};
use medbatch_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info_span, warn};

use crate::queue::JobFeed;
use crate::runner::JobRunner;

/// Handle over the spawned workers.
pub struct WorkerPool {
    tracker: TaskTracker,
    feed: JobFeed,
}

impl WorkerPool {
    /// Spawn `workers` tasks. Each loops: take a job, run it, publish the
    /// result. Cancellation is observed only between jobs.
    #[must_use]
    pub fn spawn(
        workers: usize,
        runner: &JobRunner,
        feed: &JobFeed,
        results: &mpsc::Sender<JobResult>,
        cancel: &CancellationToken,
        metrics: &Metrics,
    ) -> Self {
        let tracker = TaskTracker::new();
        for worker in 0..workers.max(1) {
            let task = worker_loop(
                runner.clone(),
                feed.clone(),
                results.clone(),
                cancel.clone(),
                metrics.clone(),
            )
            .instrument(info_span!("worker", worker));
            tracker.spawn(task);
        }
        tracker.close();
        Self {
            tracker,
            feed: feed.clone(),
        }
    }

    /// Wait for every worker to exit and return the jobs nobody picked up.
    pub async fn shutdown(self) -> Vec<Job> {
        self.tracker.wait().await;
        self.feed.drain_remaining().await
    }
}

async fn worker_loop(
    runner: JobRunner,
    feed: JobFeed,
    results: mpsc::Sender<JobResult>,
    cancel: CancellationToken,
    metrics: Metrics,
) {
    loop {
        let job = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("cancellation observed");
                break;
            }
            next = feed.next() => match next {
                Some(job) => job,
                None => break,
            },
        };

        metrics.job_started();
        let started = Instant::now();
        let result = runner.run(job).await;
        metrics.job_finished(started.elapsed());
        metrics.inc_completed(result.is_success());

        if results.send(result).await.is_err() {
            warn!("result collector closed; worker stopping");
            break;
        }
    }
    debug!("worker exiting");
}
