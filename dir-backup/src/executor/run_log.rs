//! Per-run log file recording every copied file.

use crate::executor::timestamp::{format_log_name, logs_dir};
use crate::utils::errors::{BackupError, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// First line of every run log, kept even when records follow.
pub const PLACEHOLDER_LINE: &str = "No files were updated.";

/// Format of the timestamp prefixing each copy record.
pub const RECORD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// An open run log. The file is flushed and closed when this is dropped,
/// so every exit path out of a run leaves a complete log behind.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLog {
    /// Create `backup_dir/logs/<started_at>.log`, seeded with the placeholder line.
    pub fn open(backup_dir: &Path, started_at: &DateTime<Local>) -> Result<Self> {
        let logs = logs_dir(backup_dir);
        fs::create_dir_all(&logs).map_err(|e| BackupError::resource(&logs, e))?;

        let path = logs.join(format_log_name(started_at));
        let file = File::create(&path).map_err(|e| BackupError::resource(&path, e))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", PLACEHOLDER_LINE).map_err(|e| BackupError::resource(&path, e))?;
        writer.flush().map_err(|e| BackupError::resource(&path, e))?;

        info!("writing to: {}", path.display());

        Ok(Self {
            path,
            writer,
        })
    }

    /// Append `<copied_at> <source> -> <destination>`.
    pub fn record(&mut self, copied_at: &DateTime<Local>, source: &Path, destination: &Path) -> Result<()> {
        writeln!(
            self.writer,
            "{} {} -> {}",
            copied_at.format(RECORD_TIME_FORMAT),
            source.display(),
            destination.display()
        )?;
        // Keep the log current in case the run is interrupted.
        self.writer.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close and delete the log of a run that could not walk its source,
    /// so it does not count as a completed backup.
    pub fn discard(self) -> std::io::Result<()> {
        let path = self.path.clone();
        drop(self);
        fs::remove_file(path)
    }
}

impl Drop for RunLog {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush run log {}: {}", self.path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::timestamp::parse_log_name;
    use tempfile::TempDir;

    #[test]
    fn test_open_seeds_placeholder() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let started = parse_log_name("20240102T030405.log")?;

        let path = {
            let log = RunLog::open(temp_dir.path(), &started)?;
            log.path().to_path_buf()
        };

        assert_eq!(path, temp_dir.path().join("logs/20240102T030405.log"));
        assert_eq!(fs::read_to_string(&path)?, "No files were updated.\n");
        Ok(())
    }

    #[test]
    fn test_records_follow_placeholder() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let started = parse_log_name("20240102T030405.log")?;
        let copied = parse_log_name("20240102T030406.log")?;

        let path = {
            let mut log = RunLog::open(temp_dir.path(), &started)?;
            log.record(&copied, Path::new("/src/a.txt"), Path::new("/dst/a.txt"))?;
            log.record(&copied, Path::new("/src/b.txt"), Path::new("/dst/b.txt"))?;
            log.path().to_path_buf()
        };

        let content = fs::read_to_string(path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "No files were updated.",
                "2024-01-02 03:04:06.000000 /src/a.txt -> /dst/a.txt",
                "2024-01-02 03:04:06.000000 /src/b.txt -> /dst/b.txt",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_open_truncates_existing_log() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let started = parse_log_name("20240102T030405.log")?;
        fs::create_dir_all(temp_dir.path().join("logs"))?;
        fs::write(temp_dir.path().join("logs/20240102T030405.log"), "stale\nstale\n")?;

        let log = RunLog::open(temp_dir.path(), &started)?;
        assert_eq!(fs::read_to_string(log.path())?, "No files were updated.\n");
        Ok(())
    }

    #[test]
    fn test_discard_removes_log() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let started = parse_log_name("20240102T030405.log")?;

        let log = RunLog::open(temp_dir.path(), &started)?;
        let path = log.path().to_path_buf();
        log.discard()?;

        assert!(!path.exists());
        assert!(temp_dir.path().join("logs").is_dir());
        Ok(())
    }

    #[test]
    fn test_open_fails_when_logs_cannot_be_created() -> Result<()> {
        let temp_dir = TempDir::new()?;
        // A regular file where the backup directory should be.
        let blocker = temp_dir.path().join("docs");
        fs::write(&blocker, "")?;

        let started = parse_log_name("20240102T030405.log")?;
        let result = RunLog::open(&blocker, &started);
        assert!(matches!(result, Err(BackupError::Resource { .. })));
        Ok(())
    }
}
