//! ToolchainLocator: find an installed runtime binary for a kind.
//!
//! Lookup order, first success wins:
//! 1. Run the kind's version command by name (OS program search, no shell).
//!    On success resolve the absolute path with `which` (first match).
//! 2. Check the profile's well-known install paths in order.
//! 3. Not found.
//!
//! Never fails: every error degrades to `None` plus a diagnostic.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::handle::RuntimeHandle;
use crate::kind::RuntimeKind;
use crate::process::{self, PROBE_TIMEOUT_SECS};

#[derive(Debug, Clone, Default)]
pub struct ToolchainLocator {
    search_path: Option<OsString>,
    well_known: Option<Vec<PathBuf>>,
}

impl ToolchainLocator {
    /// Locator using the process `PATH` and the platform well-known list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the probe and the path lookup to `path` (same syntax as `PATH`).
    pub fn with_search_path(mut self, path: impl Into<OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    /// Replace the well-known install list for every kind.
    pub fn with_well_known(mut self, paths: Vec<PathBuf>) -> Self {
        self.well_known = Some(paths);
        self
    }

    pub async fn find_interpreter(&self, kind: RuntimeKind) -> Option<PathBuf> {
        if let Some(path) = self.probe_search_path(kind).await {
            tracing::debug!("Found {} on search path: {}", kind, path.display());
            return Some(path);
        }

        let found = self
            .well_known_paths(kind)
            .into_iter()
            .find(|candidate| candidate.is_file());
        match &found {
            Some(path) => tracing::debug!("Found {} at well-known path: {}", kind, path.display()),
            None => tracing::info!("{} interpreter not found", kind.profile().display_name),
        }
        found
    }

    /// [`find_interpreter`](Self::find_interpreter) wrapped in a verified handle.
    pub async fn find_handle(&self, kind: RuntimeKind) -> Option<RuntimeHandle> {
        let path = self.find_interpreter(kind).await?;
        RuntimeHandle::new(kind, path).ok()
    }

    /// Version text reported by a concrete binary. Python 2 prints to stderr.
    pub async fn version(&self, kind: RuntimeKind, path: &Path) -> Option<String> {
        let out = self.run_version(kind, path).await?;
        if !out.success() {
            return None;
        }
        let text = if out.stdout.trim().is_empty() {
            out.stderr.trim()
        } else {
            out.stdout.trim()
        };
        (!text.is_empty()).then(|| text.to_string())
    }

    /// True when `path` exists and its version command exits 0.
    pub async fn validate(&self, kind: RuntimeKind, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        self.run_version(kind, path)
            .await
            .map(|out| out.success())
            .unwrap_or(false)
    }

    async fn probe_search_path(&self, kind: RuntimeKind) -> Option<PathBuf> {
        let binary = kind.profile().binary;
        let out = self.run_version(kind, Path::new(binary)).await?;
        if !out.success() {
            tracing::debug!("{} version probe exited with {:?}", binary, out.exit_code);
            return None;
        }

        let resolved = match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().ok()?;
                which::which_in(binary, Some(paths), cwd)
            }
            None => which::which(binary),
        };
        match resolved {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::debug!("{} ran but could not be located: {}", binary, e);
                None
            }
        }
    }

    async fn run_version(&self, kind: RuntimeKind, program: &Path) -> Option<process::Captured> {
        let args: Vec<String> = kind
            .profile()
            .version_args
            .iter()
            .map(|a| a.to_string())
            .collect();
        let mut cmd = process::piped_command(program, &args, None);
        if let Some(paths) = &self.search_path {
            cmd.env("PATH", paths);
        }
        match process::capture(cmd, Some(Duration::from_secs(PROBE_TIMEOUT_SECS))).await {
            Ok(out) => Some(out),
            Err(e) => {
                tracing::debug!("{} version probe failed: {}", program.display(), e);
                None
            }
        }
    }

    fn well_known_paths(&self, kind: RuntimeKind) -> Vec<PathBuf> {
        match &self.well_known {
            Some(paths) => paths.clone(),
            None => kind.profile().well_known_paths(),
        }
    }
}
