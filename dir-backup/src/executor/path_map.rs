//! Maps directories of a source tree onto the mirrored tree in the backup.

use crate::utils::errors::{BackupError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Maps walked source directories to their mirror under a target's backup
/// directory.
///
/// For source `/home/u/project` mirrored at `/backups/proj/project`, the
/// walked directory `/home/u/project/src` maps to `/backups/proj/project/src`.
#[derive(Debug, Clone)]
pub struct PathMapper {
    mirrored_root: PathBuf,
    source_depth: usize,
}

impl PathMapper {
    pub fn new(source_root: &Path, mirrored_root: impl Into<PathBuf>) -> Self {
        Self {
            mirrored_root: mirrored_root.into(),
            source_depth: source_root.components().count(),
        }
    }

    /// Destination for `walked_dir` without touching the filesystem.
    ///
    /// The segments of `walked_dir` past the source root's depth are appended
    /// to the mirrored root. A path no deeper than the source root maps to the
    /// mirrored root itself.
    pub fn map_segments(&self, walked_dir: &Path) -> PathBuf {
        let mut mapped = self.mirrored_root.clone();
        for segment in walked_dir.components().skip(self.source_depth) {
            mapped.push(segment);
        }
        mapped
    }

    /// Destination for `walked_dir`, created along with any missing parents.
    pub fn backup_dir_for(&self, walked_dir: &Path) -> Result<PathBuf> {
        let mapped = self.map_segments(walked_dir);
        fs::create_dir_all(&mapped).map_err(|e| BackupError::resource(&mapped, e))?;
        Ok(mapped)
    }
}
