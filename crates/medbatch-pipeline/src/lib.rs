//! Concurrent job pipeline for batch inference.
//!
//! Layout:
//! - `poller.rs`: bounded status polling
//! - `runner.rs`: per-job state machine
//! - `queue.rs`: bounded FIFO between coordinator and workers
//! - `pool.rs`: worker tasks on a `TaskTracker`
//! - `coordinator.rs`: discovery, dispatch, collection, export
//!
//! # Design
//! - Jobs move through the queue by value; one worker owns a job at a time.
//! - Results flow through a bounded channel into a single collector.
//! - Logging context comes from spans (batch, worker, job), not a passed logger.
#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

pub mod coordinator;
pub mod error;
pub mod poller;
pub mod pool;
pub mod queue;
pub mod runner;

pub use coordinator::{BatchCoordinator, BatchReport, BatchRequest};
pub use error::BatchError;
pub use poller::{PollOutcome, StatusPoller};
pub use pool::WorkerPool;
pub use queue::{JobFeed, WorkQueue, work_queue};
pub use runner::JobRunner;
