//! Last-backup time, persisted as the names of run log files.
//!
//! Log names are fixed-width and zero-padded, so sorting them as strings
//! sorts them chronologically.

use crate::utils::errors::{BackupError, Result};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Timelike};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// `chrono` format of a run log file name.
pub const LOG_NAME_FORMAT: &str = "%Y%m%dT%H%M%S.log";

/// Directory holding the run logs of one target.
pub const LOGS_DIR: &str = "logs";

pub fn logs_dir(backup_dir: &Path) -> PathBuf {
    backup_dir.join(LOGS_DIR)
}

/// Render the log file name for a run started at `at`.
pub fn format_log_name(at: &DateTime<Local>) -> String {
    at.format(LOG_NAME_FORMAT).to_string()
}

/// Parse a log file name back into the local time it was created at.
pub fn parse_log_name(name: &str) -> Result<DateTime<Local>> {
    let invalid = || BackupError::LogFormat {
        name: name.to_string(),
    };

    // Reject anything that would not sort correctly next to formatted names.
    if name.len() != "YYYYMMDDTHHMMSS.log".len() {
        return Err(invalid());
    }

    let naive = NaiveDateTime::parse_from_str(name, LOG_NAME_FORMAT).map_err(|_| invalid())?;

    // A name from a DST fold is ambiguous; the earlier instant keeps files
    // modified in the repeated hour eligible for the next run.
    Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(invalid)
}

/// Drop sub-second precision so a run time matches its log name exactly.
pub fn truncate_to_seconds(at: DateTime<Local>) -> DateTime<Local> {
    at.with_nanosecond(0).unwrap_or(at)
}

/// The beginning of time: everything is newer than this.
pub fn epoch() -> DateTime<Local> {
    DateTime::<Local>::from(SystemTime::UNIX_EPOCH)
}

/// Time of the most recent run recorded under `backup_dir/logs/`.
///
/// Creates the logs directory if needed. Entries whose names do not follow
/// [`LOG_NAME_FORMAT`] are skipped with a warning. Without any run log the
/// epoch is returned, which makes every source file eligible.
pub fn last_backup_time(backup_dir: &Path) -> Result<DateTime<Local>> {
    let logs = logs_dir(backup_dir);
    fs::create_dir_all(&logs).map_err(|e| BackupError::resource(&logs, e))?;

    let entries = fs::read_dir(&logs).map_err(|e| BackupError::resource(&logs, e))?;

    let mut latest: Option<(String, DateTime<Local>)> = None;
    for entry in entries {
        let entry = entry.map_err(|e| BackupError::resource(&logs, e))?;
        let name = entry.file_name().to_string_lossy().into_owned();

        match parse_log_name(&name) {
            Ok(at) => {
                if latest.as_ref().map_or(true, |(best, _)| name > *best) {
                    latest = Some((name, at));
                }
            }
            Err(e) => warn!("Ignoring {} in {}: {}", name, logs.display(), e),
        }
    }

    match latest {
        Some((name, at)) => {
            debug!("Latest run log: {}", name);
            Ok(at)
        }
        None => Ok(epoch()),
    }
}
