//! Backup executor - Orchestrates the incremental copy of each target.
//!
//! For every configured target this ties together:
//! - the last-backup time derived from the target's run logs
//! - the source tree walk
//! - mtime-based change detection and copying
//! - the run log recording what was copied

pub mod path_map;
pub mod run_log;
pub mod timestamp;

use crate::config::{BackupTarget, Config};
use crate::fs::copier::copy_to_dir;
use crate::fs::metadata::is_newer;
use crate::fs::walker::{walk_tree, DirVisit, WalkOptions};
use crate::utils::errors::{BackupError, Result};
use chrono::{DateTime, Local};
use path_map::PathMapper;
use run_log::RunLog;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of backing up one target
#[derive(Debug, Clone)]
pub struct BackupResult {
    pub target: String,
    pub log_path: PathBuf,
    pub last_backup: DateTime<Local>,
    pub directories: usize,
    pub scanned_files: usize,
    pub copied_files: usize,
    pub copied_bytes: u64,
    pub unchanged_files: usize,
    /// Files or directories that failed and were skipped
    pub failed_files: usize,
    pub duration: Duration,
}

impl BackupResult {
    fn new(target: &str, log_path: PathBuf, last_backup: DateTime<Local>) -> Self {
        Self {
            target: target.to_string(),
            log_path,
            last_backup,
            directories: 0,
            scanned_files: 0,
            copied_files: 0,
            copied_bytes: 0,
            unchanged_files: 0,
            failed_files: 0,
            duration: Duration::ZERO,
        }
    }
}

/// Outcome of a whole run over every target
#[derive(Debug, Default)]
pub struct RunReport {
    pub results: Vec<BackupResult>,
    /// Targets that could not be processed, by name
    pub failures: Vec<(String, BackupError)>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Main backup executor
#[derive(Debug, Clone)]
pub struct BackupExecutor {
    backup_root: PathBuf,
    delay: Duration,
    exclude: Vec<String>,
}

impl BackupExecutor {
    pub fn new(backup_root: impl Into<PathBuf>) -> Self {
        Self {
            backup_root: backup_root.into(),
            delay: Duration::ZERO,
            exclude: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.backup_root())
            .with_delay(config.delay())
            .with_exclude(config.backup.exclude.clone())
    }

    /// Pause after each copied file to limit I/O pressure
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Directory holding the logs and mirrored tree of `target`
    pub fn backup_dir(&self, target: &BackupTarget) -> PathBuf {
        self.backup_root.join(&target.name)
    }

    /// Back up every target in order. A failing target does not stop the others.
    pub fn run(&self, targets: &[BackupTarget]) -> RunReport {
        debug!("BackupTo: {}", self.backup_root.display());

        let mut report = RunReport::default();
        for target in targets {
            match self.run_target(target) {
                Ok(result) => {
                    info!(
                        "Backed up {}: {} directories, {} copied ({} bytes), {} unchanged, {} failed in {:.2}s",
                        result.target,
                        result.directories,
                        result.copied_files,
                        result.copied_bytes,
                        result.unchanged_files,
                        result.failed_files,
                        result.duration.as_secs_f64()
                    );
                    report.results.push(result);
                }
                Err(e) => {
                    error!("Backup of {} failed: {}", target.name, e);
                    report.failures.push((target.name.clone(), e));
                }
            }
        }
        report
    }

    /// Back up one target, timestamping the run with the current time
    pub fn run_target(&self, target: &BackupTarget) -> Result<BackupResult> {
        self.run_target_at(target, timestamp::truncate_to_seconds(Local::now()))
    }

    /// Back up one target as a run started at `started_at`
    pub fn run_target_at(&self, target: &BackupTarget, started_at: DateTime<Local>) -> Result<BackupResult> {
        let start_time = Instant::now();
        let source = &target.source_path;
        debug!("Scanning: {}", source.display());

        match std::fs::metadata(source) {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(BackupError::resource(
                    source,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
                ))
            }
            Err(e) => return Err(BackupError::resource(source, e)),
        }

        let backup_dir = self.backup_dir(target);
        let mirror = mirrored_name(target);
        // The mirror shares the target directory with the run logs.
        if mirror == Path::new(timestamp::LOGS_DIR) {
            return Err(BackupError::Config(format!(
                "source {} of target {} would be mirrored into {}",
                source.display(),
                target.name,
                timestamp::logs_dir(&backup_dir).display()
            )));
        }

        let last_backup = timestamp::last_backup_time(&backup_dir)?;
        debug!("Last Log Time: {}", last_backup);

        let mapper = PathMapper::new(source, backup_dir.join(mirror));

        let options = WalkOptions {
            exclude_patterns: self.exclude.clone(),
            skip_paths: nested_backup_root(source, &self.backup_root).into_iter().collect(),
        };

        let mut log = RunLog::open(&backup_dir, &started_at)?;
        let mut result = BackupResult::new(&target.name, log.path().to_path_buf(), last_backup);

        let walked = walk_tree(source, &options, |visit| {
            self.process_dir(visit, &mapper, &last_backup, &mut log, &mut result)
        });

        let summary = match walked {
            Ok(summary) => summary,
            Err(e) => {
                // Nothing was walked, so this run must not become the next
                // run's last-backup time.
                if let Err(remove_err) = log.discard() {
                    warn!("Failed to remove run log {}: {}", result.log_path.display(), remove_err);
                }
                return Err(BackupError::resource(source, e));
            }
        };

        result.directories = summary.directories;
        result.failed_files += summary.errors;
        result.duration = start_time.elapsed();
        Ok(result)
    }

    /// Copy every file of one visited directory that changed since `last_backup`
    fn process_dir(
        &self,
        visit: DirVisit,
        mapper: &PathMapper,
        last_backup: &DateTime<Local>,
        log: &mut RunLog,
        result: &mut BackupResult,
    ) {
        let backup_dir = match mapper.backup_dir_for(&visit.path) {
            Ok(dir) => dir,
            Err(e) => {
                warn!("Skipping {}: {}", visit.path.display(), e);
                result.failed_files += visit.files.len();
                return;
            }
        };
        debug!("BackupDir: {}", backup_dir.display());

        for file in visit.files {
            if file.is_symlink {
                debug!("Checking: {} (symlink)", file.path.display());
            } else {
                debug!("Checking: {}", file.path.display());
            }
            result.scanned_files += 1;

            match is_newer(&file.path, last_backup) {
                Ok(true) => {}
                Ok(false) => {
                    result.unchanged_files += 1;
                    continue;
                }
                Err(e) => {
                    warn!("Cannot read {}: {}", file.path.display(), e);
                    result.failed_files += 1;
                    continue;
                }
            }

            match copy_to_dir(&file.path, &backup_dir) {
                Ok((copied, bytes)) => {
                    result.copied_files += 1;
                    result.copied_bytes += bytes;
                    if let Err(e) = log.record(&Local::now(), &file.path, &copied) {
                        warn!("Failed to record {} in {}: {}", copied.display(), log.path().display(), e);
                    }
                    // Slow down to lower impact at runtime.
                    if !self.delay.is_zero() {
                        std::thread::sleep(self.delay);
                    }
                }
                Err(e) => {
                    warn!("{}", e);
                    result.failed_files += 1;
                }
            }
        }
    }
}

/// Name of the mirrored tree under the target's backup directory: the
/// source's own basename, so a symlinked source keeps the configured name.
fn mirrored_name(target: &BackupTarget) -> PathBuf {
    let source = &target.source_path;
    source
        .file_name()
        .map(PathBuf::from)
        .or_else(|| {
            // `..`, `.` or `/` carry no basename of their own.
            source
                .canonicalize()
                .ok()
                .and_then(|p| p.file_name().map(PathBuf::from))
        })
        .unwrap_or_else(|| PathBuf::from(&target.name))
}

/// The backup root as seen from inside `source`, when the backups live
/// within the tree being backed up.
fn nested_backup_root(source: &Path, backup_root: &Path) -> Option<PathBuf> {
    let source_abs = source.canonicalize().ok()?;
    let backup_abs = backup_root.canonicalize().ok()?;
    let relative = backup_abs.strip_prefix(&source_abs).ok()?;
    Some(source.join(relative))
}
