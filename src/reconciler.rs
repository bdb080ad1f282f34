use crate::error::Error;
use crate::plan::{self, Action, Phase, SyncPlan, TreePair};
use crate::progress::SyncReporter;
use crate::sink::LogSink;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An action or enumeration step that failed during a pass.
#[derive(Debug)]
pub struct ActionFailure {
    pub action: Option<Action>,
    pub message: String,
    pub error: Error,
}

/// Outcome of one pass: what was applied, in order, and what failed.
#[derive(Debug)]
pub struct PassReport {
    pub started_at: DateTime<Local>,
    pub duration: Duration,
    pub applied: Vec<Action>,
    pub failures: Vec<ActionFailure>,
}

impl PassReport {
    fn new() -> Self {
        Self {
            started_at: Local::now(),
            duration: Duration::ZERO,
            applied: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn applied(&self) -> usize {
        self.applied.len()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn copies(&self) -> usize {
        self.applied.iter().filter(|a| a.is_copy()).count()
    }
}

/// Held for the duration of a pass; a second pass cannot start until it drops.
pub(crate) struct PassGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> PassGuard<'a> {
    pub(crate) fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PassGuard { running })
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Makes the replica tree an exact copy of the source tree.
pub struct Reconciler {
    trees: TreePair,
    sink: Arc<dyn LogSink>,
    running: AtomicBool,
}

impl Reconciler {
    pub fn new(
        source: impl Into<PathBuf>,
        replica: impl Into<PathBuf>,
        sink: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            trees: TreePair::new(source, replica),
            sink,
            running: AtomicBool::new(false),
        }
    }

    pub fn trees(&self) -> &TreePair {
        &self.trees
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Compute every action a pass would take right now, without touching the
    /// replica or the log.
    pub fn plan(&self) -> Result<SyncPlan, Error> {
        self.check_source()?;

        // Without a replica there is nothing to delete.
        let phase_count = if self.trees.replica.is_dir() {
            Phase::ALL.len()
        } else {
            2
        };

        let mut sync_plan = SyncPlan::new();
        for phase in Phase::ALL.iter().take(phase_count) {
            for action in plan::plan_phase(*phase, &self.trees).actions {
                sync_plan.push(action);
            }
        }
        Ok(sync_plan)
    }

    /// Run one full pass:
    /// 1. Create missing directories
    /// 2. Copy new files, overwrite changed files
    /// 3. Delete replica files absent from the source
    /// 4. Delete replica directories absent from the source
    ///
    /// A failing action is logged and skipped. Only setup problems are
    /// returned as errors.
    pub fn reconcile(&self, reporter: &dyn SyncReporter) -> Result<PassReport, Error> {
        let _guard = PassGuard::acquire(&self.running).ok_or(Error::PassInProgress)?;
        let start = Instant::now();

        self.check_source()?;
        self.ensure_replica_root()?;

        let mut report = PassReport::new();
        reporter.on_pass_start();
        self.log(&format!(
            "Synchronization started: {} to {}",
            self.trees.source.display(),
            self.trees.replica.display()
        ));

        for phase in Phase::ALL {
            debug!("{}...", phase);
            reporter.on_phase_start(phase);

            let phase_plan = plan::plan_phase(phase, &self.trees);
            for err in phase_plan.errors {
                self.record_failure(&mut report, None, err, reporter);
            }
            for action in phase_plan.actions {
                match self.apply(&action) {
                    Ok(()) => {
                        let message = action.describe(&self.trees);
                        info!("{}", message);
                        self.log(&message);
                        reporter.on_action(&action);
                        report.applied.push(action);
                    }
                    Err(err) => self.record_failure(&mut report, Some(action), err, reporter),
                }
            }
        }

        report.duration = start.elapsed();
        self.log(&format!(
            "Synchronization finished: {} actions applied, {} failed",
            report.applied(),
            report.failed()
        ));
        reporter.on_pass_complete(&report);

        Ok(report)
    }

    fn check_source(&self) -> Result<(), Error> {
        if self.trees.source.is_dir() {
            Ok(())
        } else {
            Err(Error::SourceMissing(self.trees.source.clone()))
        }
    }

    fn ensure_replica_root(&self) -> Result<(), Error> {
        let replica = &self.trees.replica;
        if !replica.is_dir() {
            fs::create_dir_all(replica).map_err(|e| Error::io(replica, e))?;
            info!("Replica folder created: {}", replica.display());
        }
        Ok(())
    }

    fn apply(&self, action: &Action) -> Result<(), Error> {
        match action {
            Action::CreateDir(path) => {
                let target = self.trees.replica_path(path);
                fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))
            }
            Action::CopyFile { path, .. } => copy_replace(
                &self.trees.source_path(path),
                &self.trees.replica_path(path),
            ),
            Action::DeleteFile(path) => {
                let target = self.trees.replica_path(path);
                fs::remove_file(&target).map_err(|e| Error::io(&target, e))
            }
            Action::DeleteDir(path) => {
                let target = self.trees.replica_path(path);
                fs::remove_dir_all(&target).map_err(|e| Error::io(&target, e))
            }
        }
    }

    fn record_failure(
        &self,
        report: &mut PassReport,
        action: Option<Action>,
        error: Error,
        reporter: &dyn SyncReporter,
    ) {
        let message = match &action {
            Some(action) => format!("Error: {}: {}", action.describe(&self.trees), error),
            None => format!("Error: {}", error),
        };
        error!("{}", message);
        self.log(&message);
        reporter.on_failure(&message);
        report.failures.push(ActionFailure {
            action,
            message,
            error,
        });
    }

    fn log(&self, message: &str) {
        if let Err(e) = self.sink.append(message) {
            error!("Failed to write action log: {}", e);
        }
    }
}

/// Copy `source` next to `target` under a hidden temporary name, then rename
/// it over `target`. Readers see either the old bytes or the new ones.
///
/// The temporary name has a fixed length so that targets whose names are
/// already at the filesystem limit can still be written.
pub fn copy_replace(source: &Path, target: &Path) -> Result<(), Error> {
    let temp_path = target.with_file_name(format!(
        ".mirror-{}-{}.tmp",
        process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    if let Err(e) = fs::copy(source, &temp_path) {
        let _ = fs::remove_file(&temp_path);
        // Report the side that actually failed.
        let failed = if source.is_file() { &temp_path } else { source };
        return Err(Error::io(failed, e));
    }

    if let Err(e) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(target, e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::SilentReporter;
    use crate::sink::MemoryLogSink;
    use tempfile::tempdir;

    #[test]
    fn test_pass_guard_rejects_second_holder() {
        let running = AtomicBool::new(false);

        let first = PassGuard::acquire(&running);
        assert!(first.is_some());
        assert!(PassGuard::acquire(&running).is_none());

        drop(first);
        assert!(PassGuard::acquire(&running).is_some());
    }

    #[test]
    fn test_copy_replace_overwrites_and_leaves_no_temp() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("src.txt");
        let target = tmp.path().join("dst.txt");
        fs::write(&source, "new").unwrap();
        fs::write(&target, "old").unwrap();

        copy_replace(&source, &target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().starts_with(".mirror-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_copy_replace_name_at_filesystem_limit() {
        let tmp = tempdir().unwrap();
        let name = "n".repeat(250);
        let source = tmp.path().join("source");
        let replica = tmp.path().join("replica");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&replica).unwrap();
        fs::write(source.join(&name), "long").unwrap();

        copy_replace(&source.join(&name), &replica.join(&name)).unwrap();
        assert_eq!(fs::read_to_string(replica.join(&name)).unwrap(), "long");

        fs::write(source.join(&name), "longer").unwrap();
        copy_replace(&source.join(&name), &replica.join(&name)).unwrap();
        assert_eq!(fs::read_to_string(replica.join(&name)).unwrap(), "longer");
        assert_eq!(fs::read_dir(&replica).unwrap().count(), 1);
    }

    #[test]
    fn test_copy_replace_missing_source_fails_cleanly() {
        let tmp = tempdir().unwrap();
        let target = tmp.path().join("dst.txt");
        fs::write(&target, "old").unwrap();

        let result = copy_replace(&tmp.path().join("missing.txt"), &target);
        assert!(matches!(result, Err(Error::Io { .. })));
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    }

    #[test]
    fn test_failed_action_does_not_stop_the_pass() {
        let tmp = tempdir().unwrap();
        let source = tmp.path().join("source");
        let replica = tmp.path().join("replica");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&replica).unwrap();
        fs::write(source.join("ok.txt"), "fine").unwrap();

        let sink = Arc::new(MemoryLogSink::new());
        let reconciler = Reconciler::new(&source, &replica, sink.clone());

        // A copy whose source vanished fails; the next action still runs.
        let mut report = PassReport::new();
        let actions = vec![
            Action::CopyFile {
                path: "vanished.txt".into(),
                overwrite: false,
            },
            Action::CopyFile {
                path: "ok.txt".into(),
                overwrite: false,
            },
        ];
        for action in actions {
            match reconciler.apply(&action) {
                Ok(()) => report.applied.push(action),
                Err(err) => {
                    reconciler.record_failure(&mut report, Some(action), err, &SilentReporter)
                }
            }
        }

        assert_eq!(report.applied(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(fs::read_to_string(replica.join("ok.txt")).unwrap(), "fine");
        let lines = sink.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Error: File copied: "), "got {:?}", lines[0]);
    }

    #[test]
    fn test_missing_source_is_fatal() {
        let tmp = tempdir().unwrap();
        let reconciler = Reconciler::new(
            tmp.path().join("absent"),
            tmp.path().join("replica"),
            Arc::new(MemoryLogSink::new()),
        );

        let result = reconciler.reconcile(&SilentReporter);
        assert!(matches!(result, Err(Error::SourceMissing(_))));
        assert!(!tmp.path().join("replica").exists());
        assert!(!reconciler.is_running());
    }
}
