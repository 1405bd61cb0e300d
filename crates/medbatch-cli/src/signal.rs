//! Ctrl-C handling for a running batch.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Exit code used when a second interrupt aborts the process.
const HARD_ABORT_EXIT_CODE: i32 = 130;

/// The first Ctrl-C stops dispatching new jobs through `cancel`; in-flight
/// jobs finish and the summary is still written. A second Ctrl-C exits
/// immediately. Abort the returned handle once the batch completes.
pub(crate) fn spawn_interrupt_watch(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("interrupt handler unavailable; batch cannot be cancelled");
            return;
        }
        warn!("interrupt received; finishing in-flight jobs");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("second interrupt received; aborting");
            std::process::exit(HARD_ABORT_EXIT_CODE);
        }
    })
}
