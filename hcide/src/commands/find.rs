//! `hcide find` and `hcide version`

use std::path::PathBuf;

use anyhow::{bail, Result};
use hcide_toolchain::{RuntimeKind, ToolchainLocator};

/// `hcide find <kind>`: prints the path, or returns false when nothing is installed.
pub async fn cmd_find(kind: RuntimeKind) -> Result<bool> {
    match ToolchainLocator::new().find_interpreter(kind).await {
        Some(path) => {
            println!("{}", path.display());
            Ok(true)
        }
        None => {
            eprintln!(
                "{} interpreter not found. Install one with `hcide install {}`",
                kind.profile().display_name,
                kind
            );
            Ok(false)
        }
    }
}

/// `hcide version <kind> [--path P]`
pub async fn cmd_version(kind: RuntimeKind, path: Option<PathBuf>) -> Result<()> {
    let locator = ToolchainLocator::new();
    let path = match path {
        Some(p) => p,
        None => match locator.find_interpreter(kind).await {
            Some(p) => p,
            None => bail!("{} interpreter not found", kind.profile().display_name),
        },
    };
    match locator.version(kind, &path).await {
        Some(version) => {
            println!("{}", version);
            Ok(())
        }
        None => bail!("{} did not report a version", path.display()),
    }
}
