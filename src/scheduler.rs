use crate::error::Error;
use crate::progress::SyncReporter;
use crate::reconciler::Reconciler;
use chrono::Local;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    RunNow,
    Stop,
}

/// Runs passes on a fixed interval from a single worker thread, so passes
/// never overlap.
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    interval: Duration,
}

pub struct SchedulerHandle {
    tx: Sender<Signal>,
    worker: JoinHandle<usize>,
}

impl Scheduler {
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
        }
    }

    /// Spawn the worker. The first pass starts immediately.
    pub fn start(self, reporter: Arc<dyn SyncReporter>) -> SchedulerHandle {
        let (tx, rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            let mut passes = 0usize;
            let mut next_run = Instant::now();

            loop {
                let wait = next_run.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                    Ok(Signal::RunNow) | Err(RecvTimeoutError::Timeout) => {}
                }

                let pass_start = Instant::now();
                if self.run_pass(reporter.as_ref()) {
                    passes += 1;
                }

                // Triggers that arrived during the pass collapse into one.
                let mut queued = false;
                let mut stop = false;
                while let Ok(signal) = rx.try_recv() {
                    match signal {
                        Signal::RunNow => queued = true,
                        Signal::Stop => stop = true,
                    }
                }
                if stop {
                    break;
                }

                next_run = if queued {
                    Instant::now()
                } else {
                    pass_start + self.interval
                };
            }

            debug!("Scheduler stopped after {} passes", passes);
            passes
        });

        SchedulerHandle { tx, worker }
    }

    fn run_pass(&self, reporter: &dyn SyncReporter) -> bool {
        match self.reconciler.reconcile(reporter) {
            Ok(report) => {
                info!(
                    "Folders synchronized at {} ({} actions, {} failed)",
                    Local::now().format("%Y-%m-%d %H:%M:%S"),
                    report.applied(),
                    report.failed()
                );
                true
            }
            Err(Error::PassInProgress) => {
                warn!("Previous pass still running, skipping trigger");
                false
            }
            Err(err) => {
                error!("Error synchronizing folders: {}", err);
                false
            }
        }
    }
}

impl SchedulerHandle {
    /// Request a pass now. At most one request is queued behind a running pass.
    pub fn trigger(&self) {
        let _ = self.tx.send(Signal::RunNow);
    }

    /// Stop triggering. An in-flight pass runs to completion first. Returns
    /// the number of completed passes.
    pub fn stop(self) -> usize {
        let _ = self.tx.send(Signal::Stop);
        match self.worker.join() {
            Ok(passes) => passes,
            Err(_) => {
                error!("Scheduler worker panicked");
                0
            }
        }
    }
}
