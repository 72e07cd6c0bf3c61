use std::path::{Path, PathBuf};

use crate::error::{Result, ToolchainError};
use crate::kind::RuntimeKind;

/// A runtime binary confirmed to exist on disk.
///
/// Immutable; re-resolve and replace it rather than mutating. Existence is
/// re-checked with [`RuntimeHandle::verify`] before every use, and a binary
/// removed between that check and the spawn surfaces as a spawn error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeHandle {
    kind: RuntimeKind,
    executable_path: PathBuf,
}

impl RuntimeHandle {
    pub fn new(kind: RuntimeKind, executable_path: impl Into<PathBuf>) -> Result<Self> {
        let handle = Self {
            kind,
            executable_path: executable_path.into(),
        };
        handle.verify()?;
        Ok(handle)
    }

    pub fn kind(&self) -> RuntimeKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.executable_path
    }

    pub fn verify(&self) -> Result<()> {
        if self.executable_path.is_file() {
            Ok(())
        } else {
            Err(ToolchainError::Discovery(format!(
                "{} executable missing at {}",
                self.kind,
                self.executable_path.display()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("python3");
        assert!(matches!(
            RuntimeHandle::new(RuntimeKind::Python, &missing),
            Err(ToolchainError::Discovery(_))
        ));

        std::fs::write(&missing, "").unwrap();
        let handle = RuntimeHandle::new(RuntimeKind::Python, &missing).unwrap();
        assert_eq!(handle.path(), missing.as_path());

        std::fs::remove_file(&missing).unwrap();
        assert!(handle.verify().is_err());
    }

    #[test]
    fn test_directory_is_not_a_runtime() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RuntimeHandle::new(RuntimeKind::Go, dir.path()).is_err());
    }
}
