//! Command handlers. Each one drives the toolchain engine and renders its
//! event stream on the terminal: output lines on stdout (stderr lines on
//! stderr), progress and status text on stderr.

pub mod find;
pub mod install;
pub mod new;
pub mod packages;
pub mod run;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use hcide_core::config::ToolchainConfig;
use hcide_toolchain::{
    OutputStream, RuntimeKind, ToolchainEvent, ToolchainInstaller, ToolchainLocator,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// Interpreter for `kind`: explicit path, then the located one, then the managed install.
pub(crate) async fn resolve_interpreter(
    kind: RuntimeKind,
    explicit: Option<&Path>,
    config: &ToolchainConfig,
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("Interpreter not found: {}", path.display());
        }
        return Ok(path.to_path_buf());
    }
    if let Some(path) = ToolchainLocator::new().find_interpreter(kind).await {
        return Ok(path);
    }
    if let Some(handle) =
        ToolchainInstaller::installed_handle(kind, &config.install_dir(kind.as_str()))
    {
        return Ok(handle.path().to_path_buf());
    }
    bail!(
        "{} interpreter not found. Install one with `hcide install {}`",
        kind.profile().display_name,
        kind
    )
}

pub(crate) fn project_dir(project: Option<PathBuf>) -> Result<PathBuf> {
    match project {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}

/// How the renderer treats the end of the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RenderMode {
    /// Package tool output: stderr lines are tagged `[ERROR]`.
    Command,
    /// User program output, passed through untouched. Stops at `Exited`.
    Program,
}

pub(crate) fn spawn_renderer(
    mut rx: UnboundedReceiver<ToolchainEvent>,
    mode: RenderMode,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut progress_open = false;
        while let Some(event) = rx.recv().await {
            match event {
                ToolchainEvent::Progress(percent) => {
                    eprint!("\r  {:5.1}% {}", percent, progress_bar(percent));
                    let _ = std::io::stderr().flush();
                    progress_open = true;
                }
                ToolchainEvent::Status(message) => {
                    if progress_open {
                        eprintln!();
                        progress_open = false;
                    }
                    eprintln!("{}", message);
                }
                ToolchainEvent::Output { stream, line } => match (stream, mode) {
                    (OutputStream::Stdout, _) => println!("{}", line),
                    (OutputStream::Stderr, RenderMode::Command) => eprintln!("[ERROR] {}", line),
                    (OutputStream::Stderr, RenderMode::Program) => eprintln!("{}", line),
                },
                ToolchainEvent::Exited { .. } => {
                    if mode == RenderMode::Program {
                        break;
                    }
                }
            }
        }
        if progress_open {
            eprintln!();
        }
    })
}

fn progress_bar(percent: f64) -> String {
    const WIDTH: usize = 30;
    let filled = ((percent / 100.0) * WIDTH as f64).round() as usize;
    let filled = filled.min(WIDTH);
    format!("[{}{}]", "#".repeat(filled), " ".repeat(WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_bounds() {
        assert_eq!(progress_bar(0.0), format!("[{}]", " ".repeat(30)));
        assert_eq!(progress_bar(100.0), format!("[{}]", "#".repeat(30)));
        assert_eq!(progress_bar(50.0).matches('#').count(), 15);
    }

    #[tokio::test]
    async fn test_explicit_interpreter_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolchainConfig {
            tools_dir: dir.path().to_path_buf(),
            download_timeout_secs: 1,
        };
        let missing = dir.path().join("python3");
        assert!(resolve_interpreter(RuntimeKind::Python, Some(&missing), &config)
            .await
            .is_err());

        std::fs::write(&missing, "").unwrap();
        assert_eq!(
            resolve_interpreter(RuntimeKind::Python, Some(&missing), &config)
                .await
                .unwrap(),
            missing
        );
    }

    #[tokio::test]
    async fn test_renderer_stops_at_exit_for_programs() {
        let (sink, rx) = hcide_toolchain::EventSink::channel();
        let renderer = spawn_renderer(rx, RenderMode::Program);
        sink.output(OutputStream::Stdout, "hello");
        sink.send(ToolchainEvent::Exited {
            session_id: uuid_nil(),
            state: hcide_toolchain::SessionState::Completed(0),
        });
        // The sink stays alive; the renderer must still finish.
        tokio::time::timeout(std::time::Duration::from_secs(2), renderer)
            .await
            .unwrap()
            .unwrap();
        drop(sink);
    }

    fn uuid_nil() -> hcide_toolchain::SessionId {
        Default::default()
    }
}
