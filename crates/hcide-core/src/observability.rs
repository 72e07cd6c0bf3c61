//! Observability: tracing init and the JSONL audit log.
//!
//! Uses config::ObservabilityConfig for HCIDE_QUIET, HCIDE_LOG_LEVEL, HCIDE_AUDIT_LOG, etc.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

static AUDIT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Initialize tracing. Call at process startup.
/// When HCIDE_QUIET=1, only WARN and above are logged.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "hcide=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
}

fn get_audit_path() -> Option<String> {
    {
        let guard = AUDIT_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = ObservabilityConfig::from_env().audit_log.clone()?;
    if path.is_empty() {
        return None;
    }
    // Ensure parent dir exists
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = AUDIT_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

fn append_jsonl(path: &str, record: &serde_json::Value) {
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| writeln!(f, "{}", record));
    if let Err(e) = result {
        tracing::warn!("Audit log write to {} failed: {}", path, e);
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn audit(record: serde_json::Value) {
    if let Some(path) = get_audit_path() {
        append_jsonl(&path, &record);
    }
}

/// Audit: runtime_install (one record per Install call, success or not)
pub fn audit_runtime_install(kind: &str, url: &str, target_dir: &str, success: bool, error: Option<&str>) {
    audit(json!({
        "ts": now(),
        "event": "runtime_install",
        "kind": kind,
        "url": url,
        "target_dir": target_dir,
        "success": success,
        "error": error,
    }));
}

/// Audit: package_command (install / uninstall / update)
pub fn audit_package_command(
    kind: &str,
    operation: &str,
    package: &str,
    exit_code: Option<i32>,
    duration_ms: u64,
) {
    audit(json!({
        "ts": now(),
        "event": "package_command",
        "kind": kind,
        "operation": operation,
        "package": package,
        "exit_code": exit_code,
        "duration_ms": duration_ms,
        "success": exit_code == Some(0),
    }));
}

/// Audit: run_started (right after spawn)
pub fn audit_run_started(session_id: &str, kind: &str, cmd: &str, args: &[String], cwd: &str) {
    audit(json!({
        "ts": now(),
        "event": "run_started",
        "session_id": session_id,
        "kind": kind,
        "cmd": cmd,
        "args": args,
        "cwd": cwd,
    }));
}

/// Audit: `run_<outcome>`, where `outcome` is completed, cancelled or failed
pub fn audit_run_finished(
    session_id: &str,
    outcome: &str,
    exit_code: Option<i32>,
    duration_ms: u64,
) {
    audit(json!({
        "ts": now(),
        "event": format!("run_{}", outcome),
        "session_id": session_id,
        "exit_code": exit_code,
        "duration_ms": duration_ms,
    }));
}
