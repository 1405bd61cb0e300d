//! Domain types, error taxonomy, and collaborator traits for batch inference jobs.
//!
//! Layout:
//! - `model/`: jobs, phases, results, and remote protocol payloads
//! - `service/`: traits implemented by the remote client and filesystem adapters
//! - `config.rs`: pipeline tuning knobs with documented defaults
//! - `error.rs`: job-local and configuration errors
#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod model;
pub mod service;

pub use config::PipelineConfig;
pub use error::{ConfigError, FailureKind, JobError, StepResult};
pub use model::{
    DownloadedFile, Job, JobOutcome, JobPhase, JobResult, RemoteArtifacts, StatusReport,
    TaskName, UploadFields, UploadGrant, UsageId,
};
pub use service::{InputCatalog, ResultExporter, TransferExecutor, WorkflowClient};
