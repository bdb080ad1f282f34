pub mod config;
pub mod error;
pub mod fingerprint;
pub mod plan;
pub mod progress;
pub mod reconciler;
pub mod scanner;
pub mod scheduler;
pub mod sink;

pub use crate::config::{AppConfig, SyncSettings};
pub use error::Error;
pub use fingerprint::{fingerprint_file, Fingerprint};
pub use plan::{Action, Phase, SyncPlan, TreePair};
pub use progress::{SilentReporter, SyncReporter};
pub use reconciler::{PassReport, Reconciler};
pub use scheduler::{Scheduler, SchedulerHandle};
pub use sink::{FileLogSink, LogSink, MemoryLogSink};
