//! File system helpers: tree walking, change detection and copying.

pub mod copier;
pub mod metadata;
pub mod walker;
