//! Directory Backup Library
//!
//! Incremental, mtime-based backups of a few directories into a mirrored tree,
//! with one run log per target and run.

pub mod config;
pub mod executor;
pub mod fs;
pub mod utils;

// Re-export commonly used types
pub use config::{BackupTarget, Config};
pub use executor::{BackupExecutor, BackupResult, RunReport};
pub use utils::errors::BackupError;
pub type Result<T> = std::result::Result<T, BackupError>;
