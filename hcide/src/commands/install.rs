//! `hcide install <kind> [--dir D]`

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hcide_core::config::ToolchainConfig;
use hcide_toolchain::{EventSink, RuntimeKind, ToolchainInstaller};

use super::{spawn_renderer, RenderMode};

pub async fn cmd_install(kind: RuntimeKind, dir: Option<PathBuf>, config: &ToolchainConfig) -> Result<bool> {
    let target = dir.unwrap_or_else(|| config.install_dir(kind.as_str()));
    match install_runtime(kind, &target, config).await? {
        Some(exe) => {
            println!("{}", exe.display());
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Install into `target` with terminal progress. Returns the runtime binary on success.
pub(crate) async fn install_runtime(
    kind: RuntimeKind,
    target: &Path,
    config: &ToolchainConfig,
) -> Result<Option<PathBuf>> {
    let installer = ToolchainInstaller::new(config).context("Failed to set up downloader")?;
    let (sink, rx) = EventSink::channel();
    let renderer = spawn_renderer(rx, RenderMode::Command);

    let ok = installer.install(kind, target, &sink).await;
    drop(sink);
    let _ = renderer.await;

    if !ok {
        return Ok(None);
    }
    Ok(ToolchainInstaller::installed_handle(kind, target).map(|h| h.path().to_path_buf()))
}
