//! PackageManager: drive each ecosystem's native package tool.
//!
//! Commands come from the kind's profile and run with the project directory
//! as working directory. Listing normalises output via [`parse`]; mutating
//! commands stream every output line to the caller and succeed exactly when
//! the tool exits 0.

mod parse;

use std::path::Path;
use std::time::Instant;

use hcide_core::observability;

use crate::events::EventSink;
use crate::handle::RuntimeHandle;
use crate::info_log;
use crate::kind::RuntimeKind;
use crate::process;
use crate::profile::{CommandTemplate, RuntimeProfile, PACKAGE_PLACEHOLDER};

pub use parse::{parse_package_list, PackageRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageOp {
    Install,
    Uninstall,
    Update,
}

impl PackageOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageOp::Install => "install",
            PackageOp::Uninstall => "uninstall",
            PackageOp::Update => "update",
        }
    }

    fn template(&self, profile: &RuntimeProfile) -> CommandTemplate {
        match self {
            PackageOp::Install => profile.install,
            PackageOp::Uninstall => profile.uninstall,
            PackageOp::Update => profile.update,
        }
    }

    fn progressive(&self) -> &'static str {
        match self {
            PackageOp::Install => "Installing",
            PackageOp::Uninstall => "Uninstalling",
            PackageOp::Update => "Updating",
        }
    }

    fn past(&self) -> &'static str {
        match self {
            PackageOp::Install => "installed",
            PackageOp::Uninstall => "uninstalled",
            PackageOp::Update => "updated",
        }
    }
}

/// Result of a mutating package command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Last non-empty line the tool printed, or the reason it never ran.
    pub last_line: Option<String>,
}

impl CommandOutcome {
    fn not_run(reason: String) -> Self {
        Self {
            success: false,
            exit_code: None,
            last_line: Some(reason),
        }
    }
}

/// Stateless; safe to share and call concurrently.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageManager;

impl PackageManager {
    pub fn new() -> Self {
        Self
    }

    /// Installed packages in `project_dir`. Empty when the tool cannot run,
    /// fails, or prints something unparseable.
    pub async fn list(
        &self,
        kind: RuntimeKind,
        project_dir: &Path,
        interpreter: &Path,
    ) -> Vec<PackageRecord> {
        let handle = match RuntimeHandle::new(kind, interpreter) {
            Ok(h) => h,
            Err(e) => {
                tracing::warn!("{}", e);
                return Vec::new();
            }
        };
        let profile = kind.profile();
        let program = profile.list.resolve_program(handle.path());
        let args = profile.list.render(PACKAGE_PLACEHOLDER, "");
        let cmd = process::piped_command(&program, &args, Some(project_dir));

        let out = match process::capture(cmd, None).await {
            Ok(out) => out,
            Err(e) => {
                tracing::warn!("Failed to list {} packages: {}", kind, e);
                return Vec::new();
            }
        };
        // npm exits non-zero on peer/extraneous problems but still prints the tree.
        if !out.success() && !(kind == RuntimeKind::Node && !out.stdout.trim().is_empty()) {
            tracing::warn!(
                "{} list exited with {:?}: {}",
                program.display(),
                out.exit_code,
                out.stderr.trim()
            );
            return Vec::new();
        }
        parse_package_list(profile.list_format, &out.stdout)
    }

    pub async fn install(
        &self,
        kind: RuntimeKind,
        package: &str,
        project_dir: &Path,
        interpreter: &Path,
        sink: &EventSink,
    ) -> CommandOutcome {
        self.run(PackageOp::Install, kind, package, project_dir, interpreter, sink)
            .await
    }

    pub async fn uninstall(
        &self,
        kind: RuntimeKind,
        package: &str,
        project_dir: &Path,
        interpreter: &Path,
        sink: &EventSink,
    ) -> CommandOutcome {
        self.run(PackageOp::Uninstall, kind, package, project_dir, interpreter, sink)
            .await
    }

    pub async fn update(
        &self,
        kind: RuntimeKind,
        package: &str,
        project_dir: &Path,
        interpreter: &Path,
        sink: &EventSink,
    ) -> CommandOutcome {
        self.run(PackageOp::Update, kind, package, project_dir, interpreter, sink)
            .await
    }

    /// Registry search is not implemented; always empty.
    pub async fn search(&self, kind: RuntimeKind, query: &str) -> Vec<PackageRecord> {
        tracing::debug!("Package search for {} ('{}') is not supported", kind, query);
        Vec::new()
    }

    pub async fn run(
        &self,
        op: PackageOp,
        kind: RuntimeKind,
        package: &str,
        project_dir: &Path,
        interpreter: &Path,
        sink: &EventSink,
    ) -> CommandOutcome {
        let failed = format!("✗ Failed to {} {}", op.as_str(), package);

        if let Err(reason) = validate_package_name(package) {
            sink.status(failed);
            return CommandOutcome::not_run(reason);
        }
        let handle = match RuntimeHandle::new(kind, interpreter) {
            Ok(h) => h,
            Err(e) => {
                sink.status(failed);
                return CommandOutcome::not_run(e.to_string());
            }
        };

        let template = op.template(kind.profile());
        let program = template.resolve_program(handle.path());
        let args = template.render(PACKAGE_PLACEHOLDER, package);

        sink.status(format!("{} {}...", op.progressive(), package));
        info_log!("{} {} {}", program.display(), args.join(" "), project_dir.display());
        let start = Instant::now();

        let mut child = match process::piped_command(&program, &args, Some(project_dir)).spawn() {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!("Failed to start {}: {}", program.display(), e);
                sink.status(failed);
                return CommandOutcome::not_run(format!("Failed to start process: {}", e));
            }
        };

        let mut lines = process::pump_lines(&mut child);
        let mut last_line = None;
        while let Some((stream, line)) = lines.recv().await {
            if !line.trim().is_empty() {
                last_line = Some(line.clone());
            }
            sink.output(stream, line);
        }

        let exit_code = match child.wait().await {
            Ok(status) => status.code(),
            Err(e) => {
                tracing::warn!("Failed to wait for {}: {}", program.display(), e);
                None
            }
        };
        let success = exit_code == Some(0);
        observability::audit_package_command(
            kind.as_str(),
            op.as_str(),
            package,
            exit_code,
            start.elapsed().as_millis() as u64,
        );

        if success {
            sink.status(format!("✓ {} {} successfully", package, op.past()));
        } else {
            tracing::warn!("{} {} exited with {:?}", op.as_str(), package, exit_code);
            sink.status(failed);
        }
        CommandOutcome {
            success,
            exit_code,
            last_line,
        }
    }
}

/// A package name must not be empty, contain whitespace, or look like a flag.
fn validate_package_name(name: &str) -> Result<(), String> {
    if name.is_empty() || name.chars().any(char::is_whitespace) || name.starts_with('-') {
        Err(format!("Invalid package name: '{}'", name))
    } else {
        Ok(())
    }
}
