//! HTTP adapters for the inference service.
//!
//! Layout:
//! - `config.rs`: API root, timeouts, endpoint layout
//! - `client.rs`: bearer credential and reqwest client construction
//! - `workflow.rs`: submit-job and check-job-status calls
//! - `transfer.rs`: pre-signed upload and result download
#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod transfer;
pub mod workflow;

pub use client::{BearerToken, HEADER_REQUEST_ID};
pub use config::{
    DEFAULT_API_ROOT, DEFAULT_API_TIMEOUT, DEFAULT_TRANSFER_TIMEOUT, RemoteConfig,
    RemoteEndpoints,
};
pub use error::RemoteSetupError;
pub use transfer::{HttpTransfer, output_file_name, output_path};
pub use workflow::HttpWorkflowClient;
