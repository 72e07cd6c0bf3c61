//! `hcide new <name> <kind>`: scaffold a project, then make sure a runtime exists.

use std::path::PathBuf;

use anyhow::{Context, Result};
use hcide_core::config::ToolchainConfig;
use hcide_fs::LocalFs;
use hcide_toolchain::scaffold::create_project;
use hcide_toolchain::{RuntimeKind, ToolchainInstaller, ToolchainLocator};

use super::install::install_runtime;

pub async fn cmd_new(
    name: &str,
    kind: RuntimeKind,
    dir: Option<PathBuf>,
    no_install: bool,
    config: &ToolchainConfig,
) -> Result<()> {
    let root = dir.unwrap_or_else(|| PathBuf::from(name));
    let project = create_project(&LocalFs, name, &root, kind)
        .with_context(|| format!("Failed to create project in {}", root.display()))?;
    eprintln!(
        "✓ Created {} project '{}' in {}",
        kind.profile().display_name,
        project.name,
        project.root.display()
    );
    for file in &project.files {
        eprintln!("  • {}", file.display());
    }

    if ToolchainLocator::new().find_interpreter(kind).await.is_some() {
        return Ok(());
    }
    let managed = config.install_dir(kind.as_str());
    if ToolchainInstaller::installed_handle(kind, &managed).is_some() {
        return Ok(());
    }
    if no_install {
        eprintln!(
            "⚠ No {} interpreter found. Install one with `hcide install {}`",
            kind.profile().display_name,
            kind
        );
        return Ok(());
    }

    eprintln!("No {} interpreter found, installing a portable one...", kind.profile().display_name);
    if install_runtime(kind, &managed, config).await?.is_none() {
        eprintln!("⚠ Runtime install failed; the project was still created.");
    }
    Ok(())
}
