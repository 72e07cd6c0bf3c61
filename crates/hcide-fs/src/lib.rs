//! File-system collaborator used by the toolchain engine and its callers.
//!
//! [`FileSystem`] is the seam; [`LocalFs`] is the real disk implementation.
//! Writes create missing parent directories; deletes are recursive.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors returned by file operations. Each variant carries the path involved.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("Failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to delete '{}': {source}", .path.display())]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, FsError>;

/// Minimal file-system surface consumed by the engine.
pub trait FileSystem: Send + Sync {
    /// Read the whole file as UTF-8 text.
    fn read_all_text(&self, path: &Path) -> Result<String>;

    /// Write text, creating parent directories as needed. Overwrites existing files.
    fn write_all_text(&self, path: &Path, content: &str) -> Result<()>;

    /// Create a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    fn file_exists(&self, path: &Path) -> bool;

    fn dir_exists(&self, path: &Path) -> bool;

    /// Delete a file, or a directory with everything under it.
    /// Returns `false` when nothing existed at `path`.
    fn remove_all(&self, path: &Path) -> Result<bool>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileSystem for LocalFs {
    fn read_all_text(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(|source| FsError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_all_text(&self, path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|source| FsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|source| FsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn remove_all(&self, path: &Path) -> Result<bool> {
        let metadata = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(FsError::Delete {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let result = if metadata.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        result.map_err(|source| FsError::Delete {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_creates_parents_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("note.txt");
        LocalFs.write_all_text(&path, "hello").unwrap();
        assert!(LocalFs.file_exists(&path));
        assert!(LocalFs.dir_exists(&dir.path().join("a").join("b")));
        assert_eq!(LocalFs.read_all_text(&path).unwrap(), "hello");
    }

    #[test]
    fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        LocalFs.write_all_text(&path, "first").unwrap();
        LocalFs.write_all_text(&path, "second").unwrap();
        assert_eq!(LocalFs.read_all_text(&path).unwrap(), "second");
    }

    #[test]
    fn test_remove_all_is_recursive_and_tolerates_missing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("tree");
        LocalFs
            .write_all_text(&root.join("x").join("y.txt"), "data")
            .unwrap();
        assert!(LocalFs.remove_all(&root).unwrap());
        assert!(!root.exists());
        assert!(!LocalFs.remove_all(&root).unwrap());
    }

    #[test]
    fn test_read_missing_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");
        let err = LocalFs.read_all_text(&missing).unwrap_err();
        assert!(err.to_string().contains("nope.txt"));
    }
}
