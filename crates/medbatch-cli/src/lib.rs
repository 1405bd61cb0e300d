//! Batch submission CLI for the medical-AI inference service.
//!
//! Layout:
//! - `cli.rs`: argument parsing and batch execution
//! - `client.rs`: error classification and remote adapter construction
//! - `signal.rs`: Ctrl-C to cancellation token
//! - `main.rs`: thin entrypoint delegating to `run()`
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
#![allow(clippy::redundant_pub_crate)]

pub(crate) mod cli;
pub(crate) mod client;
pub(crate) mod signal;

pub use cli::run;
