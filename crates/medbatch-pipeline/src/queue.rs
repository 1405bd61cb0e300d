//! Bounded FIFO handing jobs from the coordinator to the workers.

use std::sync::Arc;

use medbatch_core::Job;
use medbatch_telemetry::Metrics;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

/// Create a queue holding at most `capacity` pending jobs.
#[must_use]
pub fn work_queue(capacity: usize, metrics: Metrics) -> (WorkQueue, JobFeed) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (
        WorkQueue {
            sender,
            metrics: metrics.clone(),
        },
        JobFeed {
            receiver: Arc::new(Mutex::new(receiver)),
            metrics,
        },
    )
}

/// Producer side, owned by the coordinator.
pub struct WorkQueue {
    sender: mpsc::Sender<Job>,
    metrics: Metrics,
}

impl WorkQueue {
    /// Enqueue `job`, waiting while the queue is full.
    ///
    /// # Errors
    ///
    /// Hands the job back when `cancel` fires first or every worker is gone.
    pub async fn push(&self, job: Job, cancel: &CancellationToken) -> Result<(), Job> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(job),
            permit = self.sender.reserve() => match permit {
                Ok(permit) => {
                    permit.send(job);
                    self.metrics.set_queue_depth(self.depth());
                    Ok(())
                }
                Err(_) => Err(job),
            },
        }
    }

    /// Jobs currently waiting.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Close the queue; workers exit once it drains.
    pub fn close(self) {
        drop(self.sender);
    }
}

/// Consumer side, shared by every worker.
#[derive(Clone)]
pub struct JobFeed {
    receiver: Arc<Mutex<mpsc::Receiver<Job>>>,
    metrics: Metrics,
}

impl JobFeed {
    /// Next job in submission order; `None` once closed and empty.
    pub async fn next(&self) -> Option<Job> {
        let mut receiver = self.receiver.lock().await;
        let job = receiver.recv().await;
        self.metrics.set_queue_depth(receiver.len());
        job
    }

    /// Take every job still queued without waiting.
    pub async fn drain_remaining(&self) -> Vec<Job> {
        let mut receiver = self.receiver.lock().await;
        receiver.close();
        let mut remaining = Vec::new();
        while let Ok(job) = receiver.try_recv() {
            remaining.push(job);
        }
        self.metrics.set_queue_depth(0);
        remaining
    }
}
