use crate::error::Error;
use crate::fingerprint::fingerprint_file;
use crate::scanner::{self, EntryKind};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// The source and replica roots of one synchronization job.
#[derive(Debug, Clone)]
pub struct TreePair {
    pub source: PathBuf,
    pub replica: PathBuf,
}

impl TreePair {
    pub fn new(source: impl Into<PathBuf>, replica: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            replica: replica.into(),
        }
    }

    pub fn source_path(&self, relative: &Path) -> PathBuf {
        self.source.join(relative)
    }

    pub fn replica_path(&self, relative: &Path) -> PathBuf {
        self.replica.join(relative)
    }
}

/// One filesystem mutation on the replica. Paths are relative to the roots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    CreateDir(PathBuf),
    CopyFile { path: PathBuf, overwrite: bool },
    DeleteFile(PathBuf),
    /// Recursive.
    DeleteDir(PathBuf),
}

impl Action {
    pub fn path(&self) -> &Path {
        match self {
            Action::CreateDir(path)
            | Action::CopyFile { path, .. }
            | Action::DeleteFile(path)
            | Action::DeleteDir(path) => path,
        }
    }

    pub fn is_copy(&self) -> bool {
        matches!(self, Action::CopyFile { .. })
    }

    /// Human readable log line with absolute paths.
    pub fn describe(&self, trees: &TreePair) -> String {
        match self {
            Action::CreateDir(path) => {
                format!("Directory created: {}", trees.replica_path(path).display())
            }
            Action::CopyFile { path, overwrite } => format!(
                "{}: {} to {}",
                if *overwrite { "File overwriting" } else { "File copied" },
                trees.source_path(path).display(),
                trees.replica_path(path).display()
            ),
            Action::DeleteFile(path) => format!(
                "File deleted from replica: {}",
                trees.replica_path(path).display()
            ),
            Action::DeleteDir(path) => format!(
                "Directory deleted from replica: {}",
                trees.replica_path(path).display()
            ),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::CreateDir(path) => write!(f, "create dir  {}", path.display()),
            Action::CopyFile {
                path,
                overwrite: false,
            } => write!(f, "copy        {}", path.display()),
            Action::CopyFile {
                path,
                overwrite: true,
            } => write!(f, "overwrite   {}", path.display()),
            Action::DeleteFile(path) => write!(f, "delete file {}", path.display()),
            Action::DeleteDir(path) => write!(f, "delete dir  {}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    CreateDirectories,
    SyncFiles,
    DeleteFiles,
    DeleteDirectories,
}

impl Phase {
    /// Execution order. Each phase needs the replica state left by the
    /// previous one.
    pub const ALL: [Phase; 4] = [
        Phase::CreateDirectories,
        Phase::SyncFiles,
        Phase::DeleteFiles,
        Phase::DeleteDirectories,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::CreateDirectories => "Creating directories",
            Phase::SyncFiles => "Synchronizing files",
            Phase::DeleteFiles => "Deleting stale files",
            Phase::DeleteDirectories => "Deleting stale directories",
        };
        f.write_str(name)
    }
}

/// Ordered list of actions. Exact duplicates are collapsed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncPlan {
    actions: Vec<Action>,
    seen: HashSet<Action>,
}

impl SyncPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        if self.seen.insert(action.clone()) {
            self.actions.push(action);
        }
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }
}

impl IntoIterator for SyncPlan {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

/// Actions for one phase, plus the entries that could not be examined.
#[derive(Debug, Default)]
pub struct PhasePlan {
    pub actions: Vec<Action>,
    pub errors: Vec<Error>,
}

pub fn plan_phase(phase: Phase, trees: &TreePair) -> PhasePlan {
    match phase {
        Phase::CreateDirectories => plan_directories(trees),
        Phase::SyncFiles => plan_files(trees),
        Phase::DeleteFiles => plan_file_deletions(trees),
        Phase::DeleteDirectories => plan_directory_deletions(trees),
    }
}

/// Listings are pre-order, so a path is below a marked directory exactly
/// when its parent is marked (marks propagate to descendants).
fn parent_marked(path: &Path, marked: &HashSet<PathBuf>) -> bool {
    path.parent().map_or(false, |parent| marked.contains(parent))
}

/// Phase 1: every source directory missing from the replica is created.
/// A replica file standing where the source has a directory is deleted first.
pub fn plan_directories(trees: &TreePair) -> PhasePlan {
    let listing = scanner::scan_tree(&trees.source, EntryKind::Directory, false);
    let mut plan = PhasePlan {
        actions: Vec::new(),
        errors: listing.errors,
    };
    let mut created: HashSet<PathBuf> = HashSet::new();

    for entry in listing.entries {
        // Below a directory this phase creates, nothing exists yet.
        if parent_marked(&entry.relative, &created) {
            created.insert(entry.relative.clone());
            plan.actions.push(Action::CreateDir(entry.relative));
            continue;
        }

        match scanner::kind_at(&trees.replica_path(&entry.relative), true) {
            Ok(Some(EntryKind::Directory)) => {}
            Ok(Some(EntryKind::File)) => {
                plan.actions.push(Action::DeleteFile(entry.relative.clone()));
                created.insert(entry.relative.clone());
                plan.actions.push(Action::CreateDir(entry.relative));
            }
            Ok(None) => {
                created.insert(entry.relative.clone());
                plan.actions.push(Action::CreateDir(entry.relative));
            }
            Err(err) => {
                error!("{}", err);
                plan.errors.push(err);
            }
        }
    }

    plan
}

/// Phase 2: copy missing files, overwrite files whose fingerprints differ.
/// A replica directory standing where the source has a file is deleted first.
pub fn plan_files(trees: &TreePair) -> PhasePlan {
    let listing = scanner::scan_tree(&trees.source, EntryKind::File, false);
    let mut plan = PhasePlan {
        actions: Vec::new(),
        errors: listing.errors,
    };

    for entry in listing.entries {
        let source_file = trees.source_path(&entry.relative);
        let replica_file = trees.replica_path(&entry.relative);

        match scanner::kind_at(&replica_file, true) {
            Ok(None) => plan.actions.push(Action::CopyFile {
                path: entry.relative,
                overwrite: false,
            }),
            Ok(Some(EntryKind::Directory)) => {
                plan.actions.push(Action::DeleteDir(entry.relative.clone()));
                plan.actions.push(Action::CopyFile {
                    path: entry.relative,
                    overwrite: false,
                });
            }
            Ok(Some(EntryKind::File)) => {
                if content_differs(&source_file, &replica_file) {
                    plan.actions.push(Action::CopyFile {
                        path: entry.relative,
                        overwrite: true,
                    });
                } else {
                    debug!("Unchanged: {}", entry.relative.display());
                }
            }
            Err(err) => {
                error!("{}", err);
                plan.errors.push(err);
            }
        }
    }

    plan
}

/// Both fingerprints are computed side by side. A file that cannot be
/// fingerprinted is treated as changed.
fn content_differs(source_file: &Path, replica_file: &Path) -> bool {
    let (source_fp, replica_fp) = rayon::join(
        || fingerprint_file(source_file),
        || fingerprint_file(replica_file),
    );

    match (source_fp, replica_fp) {
        (Ok(source_fp), Ok(replica_fp)) => source_fp != replica_fp,
        (Err(err), _) | (_, Err(err)) => {
            warn!("Treating {} as changed: {}", replica_file.display(), err);
            true
        }
    }
}

/// Phase 3: replica files with no file at the same relative path in the
/// source are deleted. Source symlinks are never mirrored, so they count as
/// absent here too.
pub fn plan_file_deletions(trees: &TreePair) -> PhasePlan {
    let listing = scanner::scan_tree(&trees.replica, EntryKind::File, true);
    let mut plan = PhasePlan {
        actions: Vec::new(),
        errors: listing.errors,
    };

    for entry in listing.entries {
        match scanner::kind_at(&trees.source_path(&entry.relative), false) {
            Ok(Some(EntryKind::File)) => {}
            Ok(_) => plan.actions.push(Action::DeleteFile(entry.relative)),
            Err(err) => {
                error!("{}", err);
                plan.errors.push(err);
            }
        }
    }

    plan
}

/// Phase 4: replica directories with no directory at the same relative path
/// in the source are deleted recursively. Descendants of a deleted directory
/// are not listed again.
pub fn plan_directory_deletions(trees: &TreePair) -> PhasePlan {
    let listing = scanner::scan_tree(&trees.replica, EntryKind::Directory, true);
    let mut plan = PhasePlan {
        actions: Vec::new(),
        errors: listing.errors,
    };
    let mut deleted: HashSet<PathBuf> = HashSet::new();

    for entry in listing.entries {
        if parent_marked(&entry.relative, &deleted) {
            deleted.insert(entry.relative);
            continue;
        }

        match scanner::kind_at(&trees.source_path(&entry.relative), false) {
            Ok(Some(EntryKind::Directory)) => {}
            Ok(_) => {
                deleted.insert(entry.relative.clone());
                plan.actions.push(Action::DeleteDir(entry.relative));
            }
            Err(err) => {
                error!("{}", err);
                plan.errors.push(err);
            }
        }
    }

    plan
}
