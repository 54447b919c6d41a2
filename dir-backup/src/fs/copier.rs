//! Copies a single file into a backup directory, keeping its metadata.

use crate::fs::metadata::FileMetadata;
use crate::utils::errors::{BackupError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Copy `source` into `destination_dir` under its own file name.
///
/// An existing file of the same name is overwritten. Returns the path of the
/// new copy together with the number of bytes written.
pub fn copy_to_dir(source: &Path, destination_dir: &Path) -> Result<(PathBuf, u64)> {
    let file_name = source.file_name().ok_or_else(|| BackupError::Copy {
        path: source.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
    })?;
    let destination = destination_dir.join(file_name);

    let copy_err = |source_err: std::io::Error| BackupError::Copy {
        path: source.to_path_buf(),
        source: source_err,
    };

    let metadata = FileMetadata::from_path(source).map_err(copy_err)?;

    // A previous copy keeps the source's permission bits, which may be read-only.
    if let Ok(existing) = fs::metadata(&destination) {
        if existing.permissions().readonly() {
            let mut perms = existing.permissions();
            #[allow(clippy::permissions_set_readonly_false)]
            perms.set_readonly(false);
            fs::set_permissions(&destination, perms).map_err(copy_err)?;
        }
    }

    let bytes = fs::copy(source, &destination).map_err(copy_err)?;
    metadata.apply_to_path(&destination).map_err(copy_err)?;

    Ok((destination, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn test_copy_preserves_content_and_mtime() -> Result<()> {
        let src_dir = TempDir::new()?;
        let dst_dir = TempDir::new()?;

        let source = src_dir.path().join("a.txt");
        fs::write(&source, b"hello backup")?;
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(1_650_000_000);
        fs::File::options().write(true).open(&source)?.set_modified(mtime)?;

        let (copied, bytes) = copy_to_dir(&source, dst_dir.path())?;

        assert_eq!(copied, dst_dir.path().join("a.txt"));
        assert_eq!(bytes, 12);
        assert_eq!(fs::read(&copied)?, b"hello backup");
        assert_eq!(fs::metadata(&copied)?.modified()?, mtime);

        Ok(())
    }

    #[test]
    fn test_copy_overwrites_existing() -> Result<()> {
        let src_dir = TempDir::new()?;
        let dst_dir = TempDir::new()?;

        let source = src_dir.path().join("a.txt");
        fs::write(&source, b"new")?;
        fs::write(dst_dir.path().join("a.txt"), b"old contents")?;

        let (copied, _) = copy_to_dir(&source, dst_dir.path())?;
        assert_eq!(fs::read(copied)?, b"new");

        Ok(())
    }

    #[test]
    #[cfg(unix)]
    fn test_copy_overwrites_read_only_copy() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let src_dir = TempDir::new()?;
        let dst_dir = TempDir::new()?;

        let source = src_dir.path().join("ro.txt");
        fs::write(&source, b"v1")?;
        fs::set_permissions(&source, fs::Permissions::from_mode(0o444))?;
        copy_to_dir(&source, dst_dir.path())?;

        fs::set_permissions(&source, fs::Permissions::from_mode(0o644))?;
        fs::write(&source, b"v2")?;
        fs::set_permissions(&source, fs::Permissions::from_mode(0o444))?;
        let (copied, _) = copy_to_dir(&source, dst_dir.path())?;

        assert_eq!(fs::read(&copied)?, b"v2");
        assert_eq!(fs::metadata(&copied)?.permissions().mode() & 0o777, 0o444);

        Ok(())
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let dst_dir = TempDir::new().unwrap();
        let result = copy_to_dir(Path::new("/nonexistent/dir-backup/x.txt"), dst_dir.path());
        assert!(matches!(result, Err(BackupError::Copy { .. })));
    }

    #[test]
    fn test_copy_into_missing_directory_fails() -> Result<()> {
        let src_dir = TempDir::new()?;
        let source = src_dir.path().join("a.txt");
        fs::write(&source, b"x")?;

        let result = copy_to_dir(&source, &src_dir.path().join("missing"));
        assert!(matches!(result, Err(BackupError::Copy { .. })));

        Ok(())
    }
}
