//! `hcide run <kind>`: supervise one program. Ctrl-C or `--timeout` cancels
//! the whole process tree.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{bail, Result};
use hcide_core::config::ToolchainConfig;
use hcide_toolchain::supervisor::entry_or_default;
use hcide_toolchain::{EventSink, ProcessSupervisor, RuntimeKind, SessionState};

use super::{project_dir, resolve_interpreter, spawn_renderer, RenderMode};
use crate::cli::TargetArgs;

/// Exit status reported after a cancelled run (shell convention for SIGINT).
pub const CANCELLED_EXIT_CODE: i32 = 130;

static RUN_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Held for the lifetime of the one active run in this process.
#[derive(Debug)]
pub struct RunGuard(());

impl RunGuard {
    pub fn acquire() -> Option<Self> {
        RUN_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(()))
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        RUN_ACTIVE.store(false, Ordering::Release);
    }
}

/// Returns the exit code to report.
pub async fn cmd_run(
    kind: RuntimeKind,
    entry: Option<String>,
    target: TargetArgs,
    timeout: Option<u64>,
    config: &ToolchainConfig,
) -> Result<i32> {
    let Some(_guard) = RunGuard::acquire() else {
        bail!("A program is already running");
    };
    let project = project_dir(target.project)?;
    let interpreter = resolve_interpreter(kind, target.interpreter.as_deref(), config).await?;
    let entry = entry_or_default(kind, entry.as_deref());

    let (sink, rx) = EventSink::channel();
    let renderer = spawn_renderer(rx, RenderMode::Program);
    let supervisor = ProcessSupervisor::new();
    let session = supervisor.run(kind, &interpreter, entry, &project, sink).await;

    let deadline = async {
        match timeout {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        _ = session.wait() => {}
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nCancelling...");
            supervisor.cancel(&session).await;
        }
        _ = deadline => {
            eprintln!("\nTimed out after {}s, cancelling...", timeout.unwrap_or_default());
            supervisor.cancel(&session).await;
        }
    }

    let state = session.wait().await;
    let _ = renderer.await;
    match state {
        SessionState::Completed(code) => Ok(code),
        SessionState::Cancelled => {
            eprintln!("Cancelled.");
            Ok(CANCELLED_EXIT_CODE)
        }
        SessionState::Failed(msg) => bail!(msg),
        SessionState::Pending | SessionState::Running => bail!("Run ended in a non-terminal state"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The guard is process-wide; tests that take it must not overlap.
    static GUARD_LOCK: tokio::sync::Mutex<()> = tokio::sync::Mutex::const_new(());

    #[test]
    fn test_run_guard_is_exclusive_and_released_on_drop() {
        let _lock = GUARD_LOCK.blocking_lock();
        let first = RunGuard::acquire().unwrap();
        assert!(RunGuard::acquire().is_none());
        drop(first);
        let again = RunGuard::acquire();
        assert!(again.is_some());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_program_exit_code() {
        let _lock = GUARD_LOCK.lock().await;
        let project = tempfile::tempdir().unwrap();
        std::fs::write(project.path().join("main.py"), "exit 4\n").unwrap();
        let config = ToolchainConfig {
            tools_dir: project.path().join("tools"),
            download_timeout_secs: 1,
        };
        let target = TargetArgs {
            project: Some(project.path().to_path_buf()),
            interpreter: Some("/bin/sh".into()),
        };
        let code = cmd_run(RuntimeKind::Python, None, target, Some(30), &config)
            .await
            .unwrap();
        assert_eq!(code, 4);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_cancels() {
        let _lock = GUARD_LOCK.lock().await;
        let project = tempfile::tempdir().unwrap();
        std::fs::write(project.path().join("main.py"), "sleep 10\n").unwrap();
        let config = ToolchainConfig {
            tools_dir: project.path().join("tools"),
            download_timeout_secs: 1,
        };
        let target = TargetArgs {
            project: Some(project.path().to_path_buf()),
            interpreter: Some("/bin/sh".into()),
        };
        let code = cmd_run(RuntimeKind::Python, None, target, Some(1), &config)
            .await
            .unwrap();
        assert_eq!(code, CANCELLED_EXIT_CODE);
    }
}
