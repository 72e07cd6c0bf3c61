//! Event stream replacing progress/status/output callbacks.
//!
//! Long-running operations push [`ToolchainEvent`]s into an [`EventSink`].
//! The receiver side is drained by the caller on whatever context it owns;
//! the engine never assumes a dispatch thread.

use serde::Serialize;
use tokio::sync::mpsc;

use crate::session::{SessionId, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolchainEvent {
    /// Download percentage in `[0, 100]`, non-decreasing within one install.
    Progress(f64),
    /// Human-readable phase text.
    Status(String),
    /// One line of child output, without its line terminator.
    Output { stream: OutputStream, line: String },
    /// Sent once when a run session reaches a terminal state.
    Exited { session_id: SessionId, state: SessionState },
}

/// Sending half of an event stream. Cloning shares the same receiver.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<ToolchainEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ToolchainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops every event.
    pub fn discard() -> Self {
        Self { tx: None }
    }

    /// Events sent after the receiver is dropped are silently discarded.
    pub fn send(&self, event: ToolchainEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }

    pub fn progress(&self, percent: f64) {
        self.send(ToolchainEvent::Progress(percent));
    }

    pub fn status(&self, message: impl Into<String>) {
        self.send(ToolchainEvent::Status(message.into()));
    }

    pub fn output(&self, stream: OutputStream, line: impl Into<String>) {
        self.send(ToolchainEvent::Output {
            stream,
            line: line.into(),
        });
    }
}
