//! Directory traversal for backup runs.
//!
//! Walks a source tree top-down in a deterministic order and hands each
//! directory to the caller together with the files it directly contains.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Options for directory walking
#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Exact file or directory names to leave out
    pub exclude_patterns: Vec<String>,

    /// Directories never descended into (e.g. a backup root inside the source)
    pub skip_paths: Vec<PathBuf>,
}

/// Information about a file discovered during walking
#[derive(Debug, Clone)]
pub struct FileInfo {
    /// Full path to the file
    pub path: PathBuf,

    /// Is this a symlink?
    pub is_symlink: bool,
}

impl FileInfo {
    /// Create FileInfo from a DirEntry.
    /// Returns None if a symlink points to a directory or cannot be resolved.
    fn from_entry(entry: &DirEntry) -> std::io::Result<Option<Self>> {
        let raw_metadata = entry.metadata()?;
        let path = entry.path().to_path_buf();
        let is_symlink = raw_metadata.is_symlink();

        if is_symlink {
            match std::fs::metadata(&path) {
                Ok(resolved) if resolved.is_dir() => {
                    debug!("Skipping symlink to directory: {}", path.display());
                    return Ok(None);
                }
                Ok(_) => {}
                Err(_) => {
                    debug!("Skipping broken symlink: {}", path.display());
                    return Ok(None);
                }
            }
        }

        Ok(Some(Self { path, is_symlink }))
    }
}

/// One directory of the walk and the files directly inside it
#[derive(Debug, Clone)]
pub struct DirVisit {
    pub path: PathBuf,
    pub files: Vec<FileInfo>,
}

/// Counters for a finished walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub directories: usize,
    /// Entries that could not be read; the walk continued past them
    pub errors: usize,
}

/// Walk a directory tree, calling `visit` once per directory.
///
/// Directories are visited parent-first; within a directory, entries are
/// ordered by file name and a directory's files are all reported before any
/// of its subdirectories is entered.
///
/// # Returns
/// * `Ok(WalkSummary)` - Walk finished; unreadable entries below the root are
///   logged and counted instead of aborting
/// * `Err(io::Error)` - The root itself cannot be listed
pub fn walk_tree<F>(root: &Path, options: &WalkOptions, mut visit: F) -> std::io::Result<WalkSummary>
where
    F: FnMut(DirVisit),
{
    // Fail up front rather than reporting an unlistable root as a skipped entry.
    std::fs::read_dir(root)?;

    let mut summary = WalkSummary::default();
    let mut current: Option<DirVisit> = None;

    let entries = WalkDir::new(root)
        .sort_by(files_first)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !should_exclude(entry, options));

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                summary.errors += 1;
                continue;
            }
        };

        if entry.file_type().is_dir() {
            if let Some(done) = current.take() {
                visit(done);
            }
            summary.directories += 1;
            current = Some(DirVisit {
                path: entry.path().to_path_buf(),
                files: Vec::new(),
            });
            continue;
        }

        match FileInfo::from_entry(&entry) {
            Ok(Some(file_info)) => {
                if let Some(dir) = current.as_mut() {
                    dir.files.push(file_info);
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Cannot stat {}: {}", entry.path().display(), e);
                summary.errors += 1;
            }
        }
    }

    if let Some(done) = current.take() {
        visit(done);
    }

    Ok(summary)
}

/// Non-directories sort before directories, then by name.
fn files_first(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Check if a directory entry should be excluded
fn should_exclude(entry: &DirEntry, options: &WalkOptions) -> bool {
    if options.skip_paths.iter().any(|p| entry.path() == p) {
        return true;
    }

    let file_name = entry.file_name().to_string_lossy();
    options
        .exclude_patterns
        .iter()
        .any(|pattern| file_name == pattern.as_str())
}
