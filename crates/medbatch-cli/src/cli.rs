//! Command-line entry point for batch submissions.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use medbatch_core::PipelineConfig;
use medbatch_core::TaskName;
use medbatch_core::config::{DEFAULT_FAILURE_STATUS, DEFAULT_WORKERS};
use medbatch_fsops::{
    CsvExporter, DEFAULT_EXTENSION, ExtensionScanner, ensure_input_dir, prepare_output_dir,
};
use medbatch_pipeline::{BatchCoordinator, BatchReport, BatchRequest};
use medbatch_remote::DEFAULT_API_ROOT;
use medbatch_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, Metrics, init_logging};
use tracing::{error, info};
use url::Url;
use uuid::Uuid;

use crate::client::{CliDependencies, CliError, CliResult};
use crate::signal::spawn_interrupt_watch;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;
const DEFAULT_POLL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
const DEFAULT_TRANSFER_TIMEOUT_SECS: u64 = 300;

/// Submit every input volume in a folder to the inference service.
#[derive(Parser, Debug)]
#[command(name = "medbatch", version, about)]
pub(crate) struct Cli {
    /// Remote pipeline to run.
    #[arg(value_enum)]
    pub(crate) task: TaskArg,
    /// API token sent as a bearer credential.
    pub(crate) token: String,
    /// Folder scanned recursively for inputs.
    pub(crate) input: PathBuf,
    /// Folder receiving outputs and `results.csv`; created when missing.
    pub(crate) output: PathBuf,
    #[arg(
        long,
        env = "MEDBATCH_API_URL",
        value_parser = parse_url,
        default_value = DEFAULT_API_ROOT
    )]
    pub(crate) api_url: Url,
    #[arg(long, env = "MEDBATCH_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub(crate) workers: usize,
    #[arg(
        long,
        env = "MEDBATCH_POLL_INTERVAL_SECS",
        default_value_t = DEFAULT_POLL_INTERVAL_SECS
    )]
    pub(crate) poll_interval_secs: u64,
    #[arg(
        long,
        env = "MEDBATCH_POLL_TIMEOUT_SECS",
        default_value_t = DEFAULT_POLL_TIMEOUT_SECS
    )]
    pub(crate) poll_timeout_secs: u64,
    #[arg(
        long,
        env = "MEDBATCH_API_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = DEFAULT_API_TIMEOUT_SECS
    )]
    pub(crate) api_timeout_secs: u64,
    #[arg(
        long,
        env = "MEDBATCH_TRANSFER_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..),
        default_value_t = DEFAULT_TRANSFER_TIMEOUT_SECS
    )]
    pub(crate) transfer_timeout_secs: u64,
    /// File-name suffix selecting inputs.
    #[arg(long, env = "MEDBATCH_EXTENSION", default_value = DEFAULT_EXTENSION)]
    pub(crate) extension: String,
    /// Remote status that stops polling with a failure; repeatable.
    #[arg(
        long = "fail-status",
        env = "MEDBATCH_FAIL_STATUS",
        value_delimiter = ',',
        default_value = DEFAULT_FAILURE_STATUS
    )]
    pub(crate) fail_statuses: Vec<String>,
    #[arg(long, env = "MEDBATCH_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub(crate) log_level: String,
    /// `pretty` or `json`; defaults to pretty in debug builds.
    #[arg(long, env = "MEDBATCH_LOG_FORMAT", value_parser = parse_log_format)]
    pub(crate) log_format: Option<LogFormat>,
    /// Write the Prometheus text exposition here once the batch finishes.
    #[arg(long, env = "MEDBATCH_METRICS_FILE")]
    pub(crate) metrics_file: Option<PathBuf>,
}

/// Task names accepted on the command line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum TaskArg {
    MrProstateSeg,
    CtScanBodyPartDetection,
}

impl From<TaskArg> for TaskName {
    fn from(value: TaskArg) -> Self {
        match value {
            TaskArg::MrProstateSeg => Self::MrProstateSeg,
            TaskArg::CtScanBodyPartDetection => Self::CtScanBodyPartDetection,
        }
    }
}

impl Cli {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            workers: self.workers,
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            poll_timeout: Duration::from_secs(self.poll_timeout_secs),
            failure_statuses: self.fail_statuses.clone(),
        }
    }
}

/// Parses CLI arguments, installs logging, and runs one batch. Returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.unwrap_or_else(LogFormat::infer),
        build_sha: option_env!("MEDBATCH_BUILD_SHA").unwrap_or("dev"),
    };
    if let Err(err) = init_logging(&logging) {
        let err = CliError::failure(err);
        eprintln!("error: {}", err.display_message());
        return err.exit_code();
    }

    let trace_id = Uuid::new_v4().to_string();
    match execute(cli, &trace_id).await {
        Ok(_) => 0,
        Err(err) => {
            let message = err.display_message();
            error!(trace_id = %trace_id, error = %message, "batch aborted");
            eprintln!("error: {message}");
            err.exit_code()
        }
    }
}

pub(crate) async fn execute(cli: Cli, trace_id: &str) -> CliResult<BatchReport> {
    ensure_input_dir(&cli.input).map_err(|err| CliError::validation(err.detail()))?;
    let output_dir =
        prepare_output_dir(&cli.output).map_err(|err| CliError::validation(err.detail()))?;
    let scanner =
        ExtensionScanner::new(&cli.extension).map_err(|err| CliError::validation(err.detail()))?;

    let deps = CliDependencies::from_cli(&cli, trace_id)?;
    let metrics = Metrics::new().map_err(CliError::failure)?;
    let coordinator = BatchCoordinator::new(
        deps.workflow,
        deps.transfer,
        cli.pipeline_config(),
        metrics.clone(),
    )?;

    let request = BatchRequest {
        task: cli.task.into(),
        input_dir: cli.input.clone(),
        output_dir,
    };
    info!(
        trace_id = %trace_id,
        task = %request.task,
        api_url = %cli.api_url,
        "starting batch"
    );

    let interrupts = spawn_interrupt_watch(coordinator.cancellation_token());
    let outcome = coordinator.run(&request, &scanner, &CsvExporter).await;
    interrupts.abort();
    let report = outcome?;

    info!(
        submitted = report.submitted,
        succeeded = report.succeeded,
        failed = report.failed,
        summary = %report.summary_path.display(),
        "done"
    );

    if let Some(path) = &cli.metrics_file {
        metrics
            .write_to(path)
            .with_context(|| format!("metrics dump to {}", path.display()))
            .map_err(CliError::failure)?;
    }
    Ok(report)
}

fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

fn parse_log_format(input: &str) -> Result<LogFormat, String> {
    input.parse()
}
