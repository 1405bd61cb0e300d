//! Filesystem collaborators for batch runs: input discovery, output
//! directory preparation, and the CSV summary.
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

pub mod error;
pub mod export;
pub mod layout;
pub mod scan;

pub use error::{FsOpsError, FsOpsResult};
pub use export::{CsvExporter, SUMMARY_FILE_NAME};
pub use layout::prepare_output_dir;
pub use scan::{DEFAULT_EXTENSION, ExtensionScanner, ensure_input_dir};
