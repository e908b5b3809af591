//! Poll loop around [`Ingestor::run_cycle`].

use tokio::sync::watch;
use tracing::info;

use super::outcome::CycleOutcome;
use super::runner::Ingestor;

/// Creates the stop channel. Sending `true` stops the loop.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Runs cycles until a stop is requested.
///
/// Sleeps for the poll interval after a normal cycle and for the error
/// backoff after a failed one. A stop request interrupts the sleep at once.
/// Returns the number of cycles run.
pub async fn run(mut ingestor: Ingestor, mut shutdown: watch::Receiver<bool>) -> u64 {
    let poll_interval = ingestor.config().poll_interval;
    let error_backoff = ingestor.config().error_backoff;
    let mut cycles = 0;

    info!(
        folder = %ingestor.config().source_folder,
        sender_filter = ingestor.config().sender_filter.as_deref().unwrap_or("<any>"),
        printer = %ingestor.config().printer_name,
        poll_secs = poll_interval.as_secs(),
        "Watching mailbox"
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let (outcome, _report) = ingestor.run_cycle(&shutdown).await;
        cycles += 1;

        let delay = match outcome {
            CycleOutcome::Continue => poll_interval,
            CycleOutcome::Backoff => {
                info!(backoff_secs = error_backoff.as_secs(), "Backing off after failed cycle");
                error_backoff
            }
            CycleOutcome::Shutdown => break,
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = shutdown.changed() => {
                // A dropped sender can never signal again; treat it as a stop.
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!(cycles, "Poll loop stopped");
    cycles
}
