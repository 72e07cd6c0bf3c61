//! ProcessSupervisor: run user programs and tear down their process trees.
//!
//! The spawned process leads its own process group on Unix so cancellation
//! reaches everything it started (`go run` compiles and then execs a child).
//! Windows uses `taskkill /T`. No limit on concurrent sessions here: the
//! caller owns the "one active run" rule.

use std::path::Path;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::ToolchainError;
use crate::events::{EventSink, OutputStream};
use crate::handle::RuntimeHandle;
use crate::info_log;
use crate::kind::RuntimeKind;
use crate::process;
use crate::profile::ENTRY_FILE_PLACEHOLDER;
use crate::session::{ProcessSession, SessionState};

/// How long to keep draining output after the root process exits.
/// Orphaned grandchildren may hold the pipes open indefinitely.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSupervisor;

impl ProcessSupervisor {
    pub fn new() -> Self {
        Self
    }

    /// Start `entry_file` (relative to `working_dir`) under `interpreter`.
    ///
    /// The returned session is already `Running`, or `Failed` when the entry
    /// file is missing or the OS refused to start the process. Output and the
    /// final `Exited` event go to `sink`.
    pub async fn run(
        &self,
        kind: RuntimeKind,
        interpreter: &Path,
        entry_file: &str,
        working_dir: &Path,
        sink: EventSink,
    ) -> ProcessSession {
        let args = kind.profile().run.render(ENTRY_FILE_PLACEHOLDER, entry_file);
        let session =
            ProcessSession::new(kind, working_dir, interpreter.to_path_buf(), args, sink);

        let entry_path = working_dir.join(entry_file);
        if !entry_path.is_file() {
            let err = ToolchainError::EntryNotFound(entry_path);
            tracing::warn!("{}", err);
            session.finish(SessionState::Failed(err.to_string()));
            return session;
        }
        if let Err(e) = RuntimeHandle::new(kind, interpreter) {
            session.finish(SessionState::Failed(e.to_string()));
            return session;
        }

        let mut cmd = process::piped_command(interpreter, session.args(), Some(working_dir));
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let err = ToolchainError::Spawn(e.to_string());
                tracing::warn!("{}: {}", interpreter.display(), err);
                session.finish(SessionState::Failed(err.to_string()));
                return session;
            }
        };

        let (kill_tx, kill_rx) = oneshot::channel();
        session.mark_running(child.id(), kill_tx);
        info_log!(
            "Session {} started: {} {} (pid {:?})",
            session.id(),
            interpreter.display(),
            session.args().join(" "),
            session.pid()
        );

        let lines = process::pump_lines(&mut child);
        tokio::spawn(supervise(session.clone(), child, lines, kill_rx));
        session
    }

    /// Kill the session's whole process tree and mark it `Cancelled`.
    /// A no-op for sessions that already ended.
    pub async fn cancel(&self, session: &ProcessSession) {
        if !session.finish(SessionState::Cancelled) {
            tracing::debug!("Session {} already {}", session.id(), session.state().as_str());
            return;
        }
        info_log!("Cancelling session {}", session.id());
        if let Some(pid) = session.pid() {
            kill_tree(pid).await;
        }
        session.trip_kill_switch();
    }
}

async fn supervise(
    session: ProcessSession,
    mut child: Child,
    mut lines: mpsc::UnboundedReceiver<(OutputStream, String)>,
    kill_rx: oneshot::Receiver<()>,
) {
    let forward = {
        let session = session.clone();
        tokio::spawn(async move {
            while let Some((stream, line)) = lines.recv().await {
                session.forward_output(stream, line);
            }
        })
    };

    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = kill_rx => {
            let _ = child.start_kill();
            child.wait().await
        }
    };

    if !drain_or_abort(forward, OUTPUT_DRAIN_GRACE).await {
        tracing::debug!("Session {}: output still open after exit, stopped forwarding", session.id());
    }

    let terminal = match status {
        Ok(status) => SessionState::Completed(exit_code(&status)),
        Err(e) => SessionState::Failed(format!("Failed to wait for process: {}", e)),
    };
    if session.finish(terminal) {
        info_log!("Session {} {}", session.id(), session.state().as_str());
    }
}

/// Wait up to `grace` for the output task, aborting it when the time runs out.
/// Returns whether it finished on its own.
async fn drain_or_abort(mut task: JoinHandle<()>, grace: Duration) -> bool {
    if tokio::time::timeout(grace, &mut task).await.is_ok() {
        return true;
    }
    task.abort();
    false
}

/// Exit code, or `128 + signal` when a signal ended the process (shell convention).
fn exit_code(status: &std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(unix)]
async fn kill_tree(pid: u32) {
    use nix::sys::signal::{kill, killpg, Signal};
    use nix::unistd::Pid;

    let pid = Pid::from_raw(pid as i32);
    if let Err(e) = killpg(pid, Signal::SIGKILL) {
        tracing::debug!("killpg({}) failed: {}, killing process only", pid, e);
        let _ = kill(pid, Signal::SIGKILL);
    }
}

#[cfg(windows)]
async fn kill_tree(pid: u32) {
    let args = vec![
        "/T".to_string(),
        "/F".to_string(),
        "/PID".to_string(),
        pid.to_string(),
    ];
    let cmd = process::piped_command(Path::new("taskkill"), &args, None);
    match process::capture(cmd, Some(Duration::from_secs(process::PROBE_TIMEOUT_SECS))).await {
        Ok(out) if out.success() => {}
        Ok(out) => tracing::debug!("taskkill {} exited with {:?}: {}", pid, out.exit_code, out.stderr.trim()),
        Err(e) => tracing::debug!("taskkill {} failed: {}", pid, e),
    }
}

#[cfg(not(any(unix, windows)))]
async fn kill_tree(_pid: u32) {}

/// `entry_file` or the kind's default entry file.
pub fn entry_or_default(kind: RuntimeKind, entry_file: Option<&str>) -> &str {
    entry_file.unwrap_or_else(|| kind.default_entry_file())
}
