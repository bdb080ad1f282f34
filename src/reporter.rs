use indicatif::{ProgressBar, ProgressStyle};
use mirror_sync::{Action, PassReport, Phase, SyncReporter};
use std::sync::Mutex;
use std::time::Duration;

/// CLI pass reporter: one spinner per pass showing the phase and the last
/// applied action.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl SyncReporter for CliReporter {
    fn on_pass_start(&self) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold} {msg}") {
            pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
        }
        pb.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn on_phase_start(&self, phase: Phase) {
        self.with_bar(|pb| {
            pb.set_prefix(phase.to_string());
            pb.set_message("");
        });
    }

    fn on_action(&self, action: &Action) {
        let message = action.to_string();
        self.with_bar(|pb| pb.set_message(message));
    }

    fn on_pass_complete(&self, _report: &PassReport) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}
