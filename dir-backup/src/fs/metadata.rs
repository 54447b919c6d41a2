//! File metadata handling for backup operations.
//!
//! Captures the timestamps and permission bits of a source file so a copy can
//! carry them, and answers whether a file changed since the last backup.

use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// File metadata preserved across a copy
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Last modified time
    pub modified: SystemTime,

    /// Last access time, when the platform reports one
    pub accessed: Option<SystemTime>,

    /// File permissions (Unix mode bits)
    pub permissions: Option<u32>,
}

impl FileMetadata {
    /// Extract metadata from a file path (symlinks are followed)
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = fs::metadata(path)?;

        #[cfg(unix)]
        let permissions = {
            use std::os::unix::fs::PermissionsExt;
            Some(metadata.permissions().mode())
        };

        #[cfg(not(unix))]
        let permissions = None;

        Ok(Self {
            modified: metadata.modified()?,
            accessed: metadata.accessed().ok(),
            permissions,
        })
    }

    /// Apply this metadata to a file
    #[cfg(unix)]
    pub fn apply_to_path(&self, path: &Path) -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        // Times are set through a writable handle, so a read-only mode is
        // applied last.
        if let Some(mode) = self.permissions {
            fs::set_permissions(path, fs::Permissions::from_mode(mode | 0o200))?;
        }

        self.apply_times(path)?;

        if let Some(mode) = self.permissions {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }

        Ok(())
    }

    #[cfg(not(unix))]
    pub fn apply_to_path(&self, path: &Path) -> std::io::Result<()> {
        self.apply_times(path)
    }

    fn apply_times(&self, path: &Path) -> std::io::Result<()> {
        let mut times = fs::FileTimes::new().set_modified(self.modified);
        if let Some(accessed) = self.accessed {
            times = times.set_accessed(accessed);
        }
        fs::OpenOptions::new().write(true).open(path)?.set_times(times)
    }
}

/// Last modification time of `path`, in local time.
pub fn modified_time(path: &Path) -> std::io::Result<DateTime<Local>> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(DateTime::<Local>::from(modified))
}

/// True iff `path` was modified strictly after `since`.
///
/// Fails if the file disappeared after it was discovered.
pub fn is_newer(path: &Path, since: &DateTime<Local>) -> std::io::Result<bool> {
    let modified = modified_time(path)?;
    tracing::debug!("file mtime: {}, last backup: {}", modified, since);
    Ok(modified > *since)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_extract_metadata() -> std::io::Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        temp_file.write_all(b"test content")?;
        temp_file.flush()?;

        let metadata = FileMetadata::from_path(temp_file.path())?;

        assert!(metadata.modified > SystemTime::UNIX_EPOCH);
        #[cfg(unix)]
        assert!(metadata.permissions.is_some());

        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_permissions_preservation() -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let source = NamedTempFile::new()?;
        let target = NamedTempFile::new()?;

        fs::set_permissions(source.path(), fs::Permissions::from_mode(0o640))?;

        let metadata = FileMetadata::from_path(source.path())?;
        metadata.apply_to_path(target.path())?;

        let mode = fs::metadata(target.path())?.permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);

        Ok(())
    }

    #[test]
    fn test_mtime_preservation() -> std::io::Result<()> {
        let source = NamedTempFile::new()?;
        let target = NamedTempFile::new()?;

        let past = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_600_000_000);
        source.as_file().set_modified(past)?;

        FileMetadata::from_path(source.path())?.apply_to_path(target.path())?;

        assert_eq!(fs::metadata(target.path())?.modified()?, past);

        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_mtime_preservation_on_read_only_file() -> std::io::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let source = NamedTempFile::new()?;
        let target = NamedTempFile::new()?;

        let past = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_500_000_000);
        source.as_file().set_modified(past)?;
        fs::set_permissions(source.path(), fs::Permissions::from_mode(0o444))?;
        fs::set_permissions(target.path(), fs::Permissions::from_mode(0o444))?;

        FileMetadata::from_path(source.path())?.apply_to_path(target.path())?;

        let metadata = fs::metadata(target.path())?;
        assert_eq!(metadata.modified()?, past);
        assert_eq!(metadata.permissions().mode() & 0o777, 0o444);

        Ok(())
    }

    #[test]
    fn test_is_newer_is_strict() -> std::io::Result<()> {
        let file = NamedTempFile::new()?;
        let mtime = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000);
        file.as_file().set_modified(mtime)?;

        let at = DateTime::<Local>::from(mtime);
        assert!(!is_newer(file.path(), &at)?);
        assert!(is_newer(file.path(), &(at - Duration::seconds(1)))?);
        assert!(!is_newer(file.path(), &(at + Duration::seconds(1)))?);

        Ok(())
    }

    #[test]
    fn test_is_newer_than_epoch() -> std::io::Result<()> {
        let file = NamedTempFile::new()?;
        let epoch = DateTime::<Local>::from(SystemTime::UNIX_EPOCH);
        assert!(is_newer(file.path(), &epoch)?);
        Ok(())
    }

    #[test]
    fn test_is_newer_missing_file_errors() {
        let epoch = DateTime::<Local>::from(SystemTime::UNIX_EPOCH);
        let result = is_newer(Path::new("/nonexistent/dir-backup/file"), &epoch);
        assert!(result.is_err());
    }
}
