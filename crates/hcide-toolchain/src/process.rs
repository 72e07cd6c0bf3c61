//! Shared child-process plumbing for the package manager and the supervisor.
//!
//! Both stdout and stderr are read concurrently on their own tasks. Reading
//! only one pipe while the child fills the other (>64KB pipe buffer) would
//! block the child and deadlock the wait.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;

use crate::error::{Result, ToolchainError};
use crate::events::OutputStream;

/// Upper bound for short probe commands (`--version`).
pub const PROBE_TIMEOUT_SECS: u64 = 10;

/// Command with piped stdout/stderr and null stdin, run directly (no shell).
pub(crate) fn piped_command(program: &Path, args: &[String], cwd: Option<&Path>) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    cmd
}

/// Captured result of a short command.
#[derive(Debug)]
pub(crate) struct Captured {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl Captured {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run to completion and capture both streams as lossy UTF-8.
/// The child is killed if `timeout` elapses.
pub(crate) async fn capture(mut cmd: Command, timeout: Option<Duration>) -> Result<Captured> {
    cmd.kill_on_drop(true);
    let child = cmd
        .spawn()
        .map_err(|e| ToolchainError::Spawn(e.to_string()))?;
    let output = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| {
                ToolchainError::Spawn(format!("timed out after {}s", limit.as_secs()))
            })??,
        None => child.wait_with_output().await?,
    };
    Ok(Captured {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Take the child's pipes and forward every line, tagged by stream, into one channel.
///
/// The receiver yields `None` once both pipes reach EOF.
pub(crate) fn pump_lines(child: &mut Child) -> mpsc::UnboundedReceiver<(OutputStream, String)> {
    let (tx, rx) = mpsc::unbounded_channel();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(read_lines(stdout, OutputStream::Stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(read_lines(stderr, OutputStream::Stderr, tx));
    }
    rx
}

async fn read_lines<R>(
    reader: R,
    stream: OutputStream,
    tx: mpsc::UnboundedSender<(OutputStream, String)>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end_matches(['\n', '\r']).to_string();
                if tx.send((stream, line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!("{:?} read error: {}", stream, e);
                break;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        piped_command(
            Path::new("/bin/sh"),
            &["-c".to_string(), script.to_string()],
            None,
        )
    }

    #[tokio::test]
    async fn test_capture_collects_both_streams() {
        let out = capture(sh("echo out; echo err >&2; exit 3"), None)
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
        assert!(!out.success());
    }

    #[tokio::test]
    async fn test_capture_times_out() {
        let result = capture(sh("sleep 5"), Some(Duration::from_millis(200))).await;
        assert!(matches!(result, Err(ToolchainError::Spawn(_))));
    }

    #[tokio::test]
    async fn test_pump_lines_keeps_per_stream_order() {
        let mut child = sh("printf 'a\\r\\nb\\n'; echo c >&2; printf 'tail'")
            .spawn()
            .unwrap();
        let mut rx = pump_lines(&mut child);
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        while let Some((stream, line)) = rx.recv().await {
            match stream {
                OutputStream::Stdout => stdout.push(line),
                OutputStream::Stderr => stderr.push(line),
            }
        }
        child.wait().await.unwrap();
        assert_eq!(stdout, vec!["a", "b", "tail"]);
        assert_eq!(stderr, vec!["c"]);
    }
}
