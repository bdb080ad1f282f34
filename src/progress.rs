use crate::plan::{Action, Phase};
use crate::reconciler::PassReport;

/// Trait for observing a synchronization pass.
///
/// CLI implements with an indicatif spinner. All methods have default no-op
/// implementations.
pub trait SyncReporter: Send + Sync {
    fn on_pass_start(&self) {}
    fn on_phase_start(&self, _phase: Phase) {}
    fn on_action(&self, _action: &Action) {}
    fn on_failure(&self, _message: &str) {}
    fn on_pass_complete(&self, _report: &PassReport) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl SyncReporter for SilentReporter {}
