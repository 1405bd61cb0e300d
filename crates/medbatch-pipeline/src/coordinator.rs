//! Batch orchestration: discover, enqueue, run, collect, export.

use std::path::PathBuf;
use std::sync::Arc;

use medbatch_core::{
    InputCatalog, Job, JobError, JobResult, PipelineConfig, ResultExporter, TaskName,
    TransferExecutor, WorkflowClient,
};
use medbatch_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, info_span, warn};

use crate::error::BatchError;
use crate::pool::WorkerPool;
use crate::queue::work_queue;
use crate::runner::JobRunner;

/// What to run and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRequest {
    /// Remote pipeline applied to every input.
    pub task: TaskName,
    /// Directory scanned for inputs.
    pub input_dir: PathBuf,
    /// Directory receiving outputs and the summary.
    pub output_dir: PathBuf,
}

/// Aggregated outcome of a batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// One result per submitted job, sorted by input path.
    pub results: Vec<JobResult>,
    /// Jobs created from discovered inputs.
    pub submitted: usize,
    /// Jobs that produced an output file.
    pub succeeded: usize,
    /// Jobs that did not.
    pub failed: usize,
    /// Location of the exported summary.
    pub summary_path: PathBuf,
}

/// Owns the collaborators and cancellation token for batch runs.
pub struct BatchCoordinator {
    runner: JobRunner,
    config: Arc<PipelineConfig>,
    metrics: Metrics,
    cancel: CancellationToken,
}

impl BatchCoordinator {
    /// Validate `config` and wire the shared collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::InvalidConfig`] when `config` is rejected.
    pub fn new(
        workflow: Arc<dyn WorkflowClient>,
        transfer: Arc<dyn TransferExecutor>,
        config: PipelineConfig,
        metrics: Metrics,
    ) -> Result<Self, BatchError> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            runner: JobRunner::new(workflow, transfer, Arc::clone(&config), metrics.clone()),
            config,
            metrics,
            cancel: CancellationToken::new(),
        })
    }

    /// Token that stops dispatching new jobs when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every input under `request.input_dir` and export the results.
    ///
    /// # Errors
    ///
    /// Only setup problems abort the batch: discovery failures, a broken
    /// result collector, or an export failure. Job failures are reported in
    /// the returned results.
    pub async fn run<C, E>(
        &self,
        request: &BatchRequest,
        catalog: &C,
        exporter: &E,
    ) -> Result<BatchReport, BatchError>
    where
        C: InputCatalog,
        E: ResultExporter,
    {
        let span = info_span!(
            "batch",
            task = %request.task,
            input_dir = %request.input_dir.display(),
            workers = self.config.workers,
        );
        self.run_inner(request, catalog, exporter)
            .instrument(span)
            .await
    }

    async fn run_inner<C, E>(
        &self,
        request: &BatchRequest,
        catalog: &C,
        exporter: &E,
    ) -> Result<BatchReport, BatchError>
    where
        C: InputCatalog,
        E: ResultExporter,
    {
        let inputs = catalog
            .discover(&request.input_dir)
            .map_err(|source| BatchError::Discover {
                path: request.input_dir.clone(),
                source: Box::new(source),
            })?;
        let jobs: Vec<Job> = inputs
            .into_iter()
            .map(|input| Job::new(request.task, input, &request.output_dir))
            .collect();
        let submitted = jobs.len();
        info!(inputs = submitted, "inputs discovered");

        let workers = self.config.workers;
        let (results_tx, mut results_rx) = mpsc::channel::<JobResult>(workers);
        let collector = tokio::spawn(async move {
            let mut collected = Vec::new();
            while let Some(result) = results_rx.recv().await {
                collected.push(result);
            }
            collected
        });

        let (queue, feed) = work_queue(workers, self.metrics.clone());
        let pool = WorkerPool::spawn(
            workers,
            &self.runner,
            &feed,
            &results_tx,
            &self.cancel,
            &self.metrics,
        );
        drop(results_tx);

        let mut undispatched = Vec::new();
        let mut pending = jobs.into_iter();
        while let Some(job) = pending.next() {
            match queue.push(job, &self.cancel).await {
                Ok(()) => self.metrics.inc_submitted(),
                Err(job) => {
                    undispatched.push(job);
                    undispatched.extend(pending.by_ref());
                    break;
                }
            }
        }
        queue.close();
        undispatched.extend(pool.shutdown().await);

        let mut results = collector
            .await
            .map_err(|source| BatchError::Collector { source })?;
        if !undispatched.is_empty() {
            warn!(jobs = undispatched.len(), "batch cancelled; recording undispatched jobs");
        }
        for mut job in undispatched {
            self.metrics.inc_completed(false);
            results.push(job.fail(&JobError::Cancelled));
        }

        if results.len() != submitted {
            return Err(BatchError::ResultCountMismatch {
                expected: submitted,
                actual: results.len(),
            });
        }
        results.sort_by(|left, right| left.input_path.cmp(&right.input_path));

        let summary_path = exporter
            .export(&request.output_dir, &results)
            .map_err(|source| BatchError::Export {
                path: request.output_dir.clone(),
                source: Box::new(source),
            })?;

        let succeeded = results.iter().filter(|result| result.is_success()).count();
        let failed = submitted - succeeded;
        info!(submitted, succeeded, failed, "batch complete");
        Ok(BatchReport {
            results,
            submitted,
            succeeded,
            failed,
            summary_path,
        })
    }
}
