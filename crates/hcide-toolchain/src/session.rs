//! ProcessSession: caller-held handle to one supervised run.
//!
//! State lives in a `watch` channel. Transitions go through
//! `send_if_modified`, so a cancel racing a natural exit resolves to exactly
//! one terminal state, and the first one recorded wins.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use hcide_core::observability;
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

use crate::events::{EventSink, OutputStream, ToolchainEvent};
use crate::kind::RuntimeKind;

pub type SessionId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "lowercase")]
pub enum SessionState {
    Pending,
    Running,
    Completed(i32),
    Cancelled,
    Failed(String),
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed(_) | SessionState::Cancelled | SessionState::Failed(_)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Pending => "pending",
            SessionState::Running => "running",
            SessionState::Completed(_) => "completed",
            SessionState::Cancelled => "cancelled",
            SessionState::Failed(_) => "failed",
        }
    }
}

#[derive(Clone)]
pub struct ProcessSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: SessionId,
    kind: RuntimeKind,
    working_dir: PathBuf,
    command: PathBuf,
    args: Vec<String>,
    state: watch::Sender<SessionState>,
    pid: OnceLock<u32>,
    kill_switch: Mutex<Option<oneshot::Sender<()>>>,
    sink: EventSink,
    created: Instant,
}

impl std::fmt::Debug for ProcessSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSession")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("command", &self.inner.command)
            .field("args", &self.inner.args)
            .field("state", &self.state())
            .finish()
    }
}

impl ProcessSession {
    pub(crate) fn new(
        kind: RuntimeKind,
        working_dir: &Path,
        command: PathBuf,
        args: Vec<String>,
        sink: EventSink,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Pending);
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                kind,
                working_dir: working_dir.to_path_buf(),
                command,
                args,
                state,
                pid: OnceLock::new(),
                kill_switch: Mutex::new(None),
                sink,
                created: Instant::now(),
            }),
        }
    }

    pub fn id(&self) -> SessionId {
        self.inner.id
    }

    pub fn kind(&self) -> RuntimeKind {
        self.inner.kind
    }

    pub fn working_dir(&self) -> &Path {
        &self.inner.working_dir
    }

    pub fn command(&self) -> &Path {
        &self.inner.command
    }

    pub fn args(&self) -> &[String] {
        &self.inner.args
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn exit_code(&self) -> Option<i32> {
        match *self.inner.state.borrow() {
            SessionState::Completed(code) => Some(code),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.inner.state.borrow().is_terminal()
    }

    /// OS process id of the spawned root process, once spawned.
    pub fn pid(&self) -> Option<u32> {
        self.inner.pid.get().copied()
    }

    /// Resolves with the terminal state.
    pub async fn wait(&self) -> SessionState {
        let mut rx = self.inner.state.subscribe();
        let state = match rx.wait_for(SessionState::is_terminal).await {
            Ok(state) => (*state).clone(),
            Err(_) => self.state(),
        };
        state
    }

    pub(crate) fn mark_running(&self, pid: Option<u32>, kill_switch: oneshot::Sender<()>) {
        if let Some(pid) = pid {
            let _ = self.inner.pid.set(pid);
        }
        if let Ok(mut slot) = self.inner.kill_switch.lock() {
            *slot = Some(kill_switch);
        }
        self.inner.state.send_if_modified(|state| {
            if *state == SessionState::Pending {
                *state = SessionState::Running;
                true
            } else {
                false
            }
        });
        observability::audit_run_started(
            &self.inner.id.to_string(),
            self.inner.kind.as_str(),
            &self.inner.command.to_string_lossy(),
            &self.inner.args,
            &self.inner.working_dir.to_string_lossy(),
        );
    }

    /// Record a terminal state unless one is already recorded.
    /// Returns whether this call won. The winner emits the `Exited` event.
    pub(crate) fn finish(&self, terminal: SessionState) -> bool {
        let won = self.inner.state.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = terminal.clone();
            self.inner.sink.send(ToolchainEvent::Exited {
                session_id: self.inner.id,
                state: terminal.clone(),
            });
            true
        });
        if won {
            let exit_code = match terminal {
                SessionState::Completed(code) => Some(code),
                _ => None,
            };
            observability::audit_run_finished(
                &self.inner.id.to_string(),
                terminal.as_str(),
                exit_code,
                self.inner.created.elapsed().as_millis() as u64,
            );
        }
        won
    }

    /// Forward a line unless the session already ended. The state is
    /// borrowed while sending so no line can follow the `Exited` event.
    pub(crate) fn forward_output(&self, stream: OutputStream, line: String) {
        let state = self.inner.state.borrow();
        if !state.is_terminal() {
            self.inner.sink.output(stream, line);
        }
    }

    /// Ask the waiter task to kill the root process directly.
    pub(crate) fn trip_kill_switch(&self) {
        let switch = self.inner.kill_switch.lock().ok().and_then(|mut s| s.take());
        if let Some(tx) = switch {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(sink: EventSink) -> ProcessSession {
        ProcessSession::new(
            RuntimeKind::Python,
            Path::new("."),
            PathBuf::from("python3"),
            vec!["main.py".into()],
            sink,
        )
    }

    #[test]
    fn test_first_terminal_state_wins() {
        let (sink, mut rx) = EventSink::channel();
        let s = session(sink);
        assert_eq!(s.state(), SessionState::Pending);
        assert!(!s.is_terminal());

        assert!(s.finish(SessionState::Cancelled));
        assert!(!s.finish(SessionState::Completed(0)));
        assert_eq!(s.state(), SessionState::Cancelled);
        assert_eq!(s.exit_code(), None);

        assert!(matches!(
            rx.try_recv().unwrap(),
            ToolchainEvent::Exited { state: SessionState::Cancelled, .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_output_after_terminal_is_dropped() {
        let (sink, mut rx) = EventSink::channel();
        let s = session(sink);
        s.forward_output(OutputStream::Stdout, "before".into());
        s.finish(SessionState::Completed(0));
        s.forward_output(OutputStream::Stdout, "after".into());

        assert!(matches!(rx.try_recv().unwrap(), ToolchainEvent::Output { .. }));
        assert!(matches!(rx.try_recv().unwrap(), ToolchainEvent::Exited { .. }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wait_resolves_on_terminal() {
        let s = session(EventSink::discard());
        let (tx, _rx) = oneshot::channel();
        s.mark_running(Some(42), tx);
        assert_eq!(s.state(), SessionState::Running);
        assert_eq!(s.pid(), Some(42));

        let waiter = {
            let s = s.clone();
            tokio::spawn(async move { s.wait().await })
        };
        tokio::task::yield_now().await;
        s.finish(SessionState::Completed(7));
        assert_eq!(waiter.await.unwrap(), SessionState::Completed(7));
        assert_eq!(s.exit_code(), Some(7));
    }

    #[tokio::test]
    async fn test_wait_on_finished_session_returns_immediately() {
        let s = session(EventSink::discard());
        s.finish(SessionState::Failed("boom".into()));
        let state = tokio::time::timeout(std::time::Duration::from_secs(1), s.wait())
            .await
            .unwrap();
        assert_eq!(state, SessionState::Failed("boom".into()));
    }

    #[test]
    fn test_state_serializes_with_tag() {
        let json = serde_json::to_value(SessionState::Completed(3)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "completed", "detail": 3}));
    }
}
