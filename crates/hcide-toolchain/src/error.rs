//! Error taxonomy for the toolchain engine.
//!
//! Public operations report failure through their return values (bool, Option,
//! terminal session state). These errors travel internally and surface as the
//! message text in status events, logs and `SessionState::Failed`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolchainError {
    /// Programmer error: a kind name outside the closed set. Fail-fast.
    #[error("Unknown runtime kind: '{0}' (expected python, node or go)")]
    UnknownKind(String),

    #[error("Interpreter not found: {0}")]
    Discovery(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Failed to start process: {0}")]
    Spawn(String),

    #[error("Entry file not found: {}", .0.display())]
    EntryNotFound(PathBuf),

    #[error("Failed to parse package list: {0}")]
    Parse(String),

    #[error("Invalid package name: '{0}'")]
    InvalidPackage(String),

    #[error(transparent)]
    Fs(#[from] hcide_fs::FsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ToolchainError>;
