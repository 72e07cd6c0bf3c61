//! `hcide packages <list|install|uninstall|update|search>`

use anyhow::{Context, Result};
use hcide_core::config::ToolchainConfig;
use hcide_toolchain::{EventSink, PackageManager, PackageOp, PackageRecord, RuntimeKind};

use super::{project_dir, resolve_interpreter, spawn_renderer, RenderMode};
use crate::cli::TargetArgs;

pub async fn cmd_list(
    kind: RuntimeKind,
    target: TargetArgs,
    json: bool,
    config: &ToolchainConfig,
) -> Result<()> {
    let project = project_dir(target.project)?;
    let interpreter = resolve_interpreter(kind, target.interpreter.as_deref(), config).await?;
    let records = PackageManager::new().list(kind, &project, &interpreter).await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).context("Failed to serialize packages")?
        );
    } else {
        print_table(&records);
    }
    Ok(())
}

fn print_table(records: &[PackageRecord]) {
    if records.is_empty() {
        eprintln!("No packages installed.");
        return;
    }
    let width = records.iter().map(|r| r.name.len()).max().unwrap_or(0).max(7);
    println!("{:<width$}  VERSION", "PACKAGE", width = width);
    for r in records {
        match &r.latest_version {
            Some(latest) if r.needs_update() => {
                println!("{:<width$}  {} (latest {})", r.name, r.version, latest, width = width)
            }
            _ => println!("{:<width$}  {}", r.name, r.version, width = width),
        }
    }
}

/// Returns the tool's success flag.
pub async fn cmd_mutate(
    op: PackageOp,
    kind: RuntimeKind,
    package: &str,
    target: TargetArgs,
    config: &ToolchainConfig,
) -> Result<bool> {
    let project = project_dir(target.project)?;
    let interpreter = resolve_interpreter(kind, target.interpreter.as_deref(), config).await?;

    let (sink, rx) = EventSink::channel();
    let renderer = spawn_renderer(rx, RenderMode::Command);
    let outcome = PackageManager::new()
        .run(op, kind, package, &project, &interpreter, &sink)
        .await;
    drop(sink);
    let _ = renderer.await;

    if !outcome.success {
        if let Some(line) = &outcome.last_line {
            tracing::debug!("{} {} failed: {}", op.as_str(), package, line);
        }
    }
    Ok(outcome.success)
}

pub async fn cmd_search(kind: RuntimeKind, query: &str) -> Result<()> {
    let results = PackageManager::new().search(kind, query).await;
    if results.is_empty() {
        eprintln!("Package search is not supported for {}.", kind.profile().display_name);
    }
    for r in results {
        println!("{}  {}", r.name, r.version);
    }
    Ok(())
}
