//! Quiet-period debouncing
//!
//! Values pushed into a [`DebounceInput`] come out of the paired
//! [`DebounceOutput`] only once no newer value has arrived for the whole
//! quiet period. Every new value restarts the timer and replaces the pending
//! one. Dropping every input handle tears the controller down: a pending
//! value is discarded, never emitted.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

/// Quiet period used when none is configured
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Sending half of a debounce controller
#[derive(Debug)]
pub struct DebounceInput<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for DebounceInput<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> DebounceInput<T> {
    /// Pushes a new value, restarting the quiet period
    ///
    /// Returns `false` when the controller has already shut down.
    pub fn push(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }
}

/// Receiving half of a debounce controller
///
/// Dropping it aborts the timer task.
#[derive(Debug)]
pub struct DebounceOutput<T> {
    rx: mpsc::UnboundedReceiver<T>,
    task: JoinHandle<()>,
}

impl<T> DebounceOutput<T> {
    /// Waits for the next settled value
    ///
    /// Returns `None` once every input handle is gone.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

impl<T> Drop for DebounceOutput<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Creates a debounce controller with the given quiet period
///
/// Must be called from within a Tokio runtime.
pub fn channel<T: Send + 'static>(quiet: Duration) -> (DebounceInput<T>, DebounceOutput<T>) {
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (output_tx, output_rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(run(quiet, input_rx, output_tx));

    (
        DebounceInput { tx: input_tx },
        DebounceOutput {
            rx: output_rx,
            task,
        },
    )
}

async fn run<T>(
    quiet: Duration,
    mut input: mpsc::UnboundedReceiver<T>,
    output: mpsc::UnboundedSender<T>,
) {
    // Idle until a burst starts
    while let Some(first) = input.recv().await {
        let mut pending = first;
        let mut deadline = Instant::now() + quiet;

        loop {
            tokio::select! {
                next = input.recv() => match next {
                    Some(value) => {
                        pending = value;
                        deadline = Instant::now() + quiet;
                    }
                    None => {
                        tracing::debug!("Debounce input closed, dropping pending value");
                        return;
                    }
                },
                _ = sleep_until(deadline) => {
                    if output.send(pending).is_err() {
                        return;
                    }
                    break;
                }
            }
        }
    }
}
