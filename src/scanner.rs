use crate::error::Error;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
}

/// A tree entry keyed by its path relative to the tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathEntry {
    pub relative: PathBuf,
    pub kind: EntryKind,
}

#[derive(Debug, Default)]
pub struct TreeListing {
    pub entries: Vec<PathEntry>,
    pub errors: Vec<Error>,
}

/// Strip `root` from `path` by whole path segments.
///
/// `/data/src-old/x` is not below `/data/src`, even though the strings share
/// a prefix.
pub fn relative_path(root: &Path, path: &Path) -> Result<PathBuf, Error> {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .map_err(|_| Error::Path {
            root: root.to_path_buf(),
            path: path.to_path_buf(),
        })
}

/// Recursively list every entry of `kind` below `root`, parents before
/// children, siblings sorted by name. The root itself is not listed.
///
/// Symlinks are never followed. In a source tree they are skipped; when
/// `links_as_files` is set (replica trees) they are reported as files so
/// that stale links get removed.
pub fn scan_tree(root: &Path, kind: EntryKind, links_as_files: bool) -> TreeListing {
    let mut listing = TreeListing::default();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                error!("Error reading entry below {}: {}", root.display(), err);
                listing.errors.push(Error::io(&path, io::Error::from(err)));
                continue;
            }
        };

        let file_type = entry.file_type();
        let entry_kind = if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() || (file_type.is_symlink() && links_as_files) {
            EntryKind::File
        } else {
            debug!("Skipping non-regular entry {}", entry.path().display());
            continue;
        };

        if entry_kind != kind {
            continue;
        }

        match relative_path(root, entry.path()) {
            Ok(relative) => listing.entries.push(PathEntry {
                relative,
                kind: entry_kind,
            }),
            Err(err) => {
                error!("{}", err);
                listing.errors.push(err);
            }
        }
    }

    listing
}

/// Report what currently exists at `path` without following symlinks.
///
/// Symlinks follow the same rule as `scan_tree`: a file when
/// `links_as_files` is set (replica trees), absent otherwise. A path whose
/// parent is missing or is not a directory simply does not exist.
pub fn kind_at(path: &Path, links_as_files: bool) -> Result<Option<EntryKind>, Error> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(Some(EntryKind::Directory)),
        Ok(metadata) if metadata.file_type().is_symlink() && !links_as_files => Ok(None),
        Ok(_) => Ok(Some(EntryKind::File)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => {
            if path.parent().map_or(false, |parent| !parent.is_dir()) {
                Ok(None)
            } else {
                Err(Error::io(path, err))
            }
        }
    }
}
