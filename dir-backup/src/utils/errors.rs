//! Custom error types for the backup tool.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed log file name: {name}")]
    LogFormat { name: String },

    #[error("Cannot prepare {}: {source}", .path.display())]
    Resource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to copy {}: {source}", .path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration file: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl BackupError {
    /// Wrap an I/O failure on a resource the run cannot proceed without.
    pub fn resource(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BackupError::Resource {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_names_path() {
        let err = BackupError::resource(
            "/backups/docs/logs",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/backups/docs/logs"));
        assert!(msg.contains("denied"));
    }
}
