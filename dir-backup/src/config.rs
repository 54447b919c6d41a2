//! Configuration management for the backup tool.
//!
//! Loads the TOML configuration and the directory list file it points to.

use crate::utils::errors::{BackupError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "configs.toml";

/// Environment variable overriding [`DEFAULT_CONFIG_FILE`].
pub const CONFIG_ENV_VAR: &str = "DIR_BACKUP_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backup: BackupConfig,

    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Root under which one directory per target is kept (`~` allowed)
    pub backup_root: String,

    /// Path to the directory list file (`~` allowed)
    pub directories: String,

    /// Pause after each copied file, in milliseconds
    #[serde(default)]
    pub delay_in_ms: u64,

    /// File or directory names skipped while walking a source tree
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// A named source directory mirrored under the backup root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    pub name: String,
    pub source_path: PathBuf,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BackupError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.backup.backup_root.trim().is_empty() {
            return Err(BackupError::Config("backup_root is empty".into()));
        }
        if config.backup.directories.trim().is_empty() {
            return Err(BackupError::Config("directories is empty".into()));
        }
        Ok(config)
    }

    /// Resolve which configuration file to read.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    pub fn backup_root(&self) -> PathBuf {
        expand_home(&self.backup.backup_root)
    }

    pub fn directories_file(&self) -> PathBuf {
        expand_home(&self.backup.directories)
    }

    pub fn delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.backup.delay_in_ms)
    }

    /// Read and validate every target from the directory list file.
    pub fn load_targets(&self) -> Result<Vec<BackupTarget>> {
        let path = self.directories_file();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            BackupError::Config(format!(
                "cannot read directory list {}: {}",
                path.display(),
                e
            ))
        })?;
        parse_targets(&content)
    }
}

/// Parse a directory list: one `name:path` entry per line.
///
/// Blank lines and lines starting with `#` are ignored. The entry is split on
/// the first `:` only, so Windows-style paths survive.
pub fn parse_targets(content: &str) -> Result<Vec<BackupTarget>> {
    let mut targets = Vec::new();
    let mut seen = HashSet::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line_no = index + 1;

        let (name, path) = line.split_once(':').ok_or_else(|| {
            BackupError::Config(format!("line {}: expected `name:path`, got {:?}", line_no, line))
        })?;
        let name = name.trim();
        let path = path.trim();

        if name.is_empty() {
            return Err(BackupError::Config(format!("line {}: empty target name", line_no)));
        }
        if path.is_empty() {
            return Err(BackupError::Config(format!(
                "line {}: empty path for target {}",
                line_no, name
            )));
        }
        // The name becomes a directory next to `logs/` under the backup root.
        if name == "logs" || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(BackupError::Config(format!(
                "line {}: invalid target name {:?}",
                line_no, name
            )));
        }
        if !seen.insert(name.to_string()) {
            return Err(BackupError::Config(format!(
                "line {}: duplicate target name {}",
                line_no, name
            )));
        }

        targets.push(BackupTarget {
            name: name.to_string(),
            source_path: expand_home(path),
        });
    }

    if targets.is_empty() {
        return Err(BackupError::Config("directory list has no entries".into()));
    }

    Ok(targets)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        ""
    } else if let Some(rest) = path.strip_prefix("~/") {
        rest
    } else {
        return PathBuf::from(path);
    };

    match home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
}
