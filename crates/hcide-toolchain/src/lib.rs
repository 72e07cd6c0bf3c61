//! hcide-toolchain: toolchain orchestration engine for HC IDE.
//!
//! Four independent components, leaves first:
//! - [`ToolchainLocator`]: find an installed runtime binary for a [`RuntimeKind`]
//! - [`ToolchainInstaller`]: download and unpack a pinned portable runtime
//! - [`PackageManager`]: list / install / uninstall / update through the native package tool
//! - [`ProcessSupervisor`]: run a program, stream its output, kill its process tree
//!
//! They share no mutable state. Progress, status and output are delivered as
//! [`ToolchainEvent`]s through an [`EventSink`].

pub mod error;
pub mod events;
pub mod handle;
pub mod installer;
pub mod kind;
pub mod locator;
pub mod log;
pub mod packages;
pub mod profile;
pub mod scaffold;
pub mod session;
pub mod supervisor;

mod process;

pub use error::{Result, ToolchainError};
pub use events::{EventSink, OutputStream, ToolchainEvent};
pub use handle::RuntimeHandle;
pub use installer::{DownloadTask, ToolchainInstaller};
pub use kind::RuntimeKind;
pub use locator::ToolchainLocator;
pub use packages::{CommandOutcome, PackageManager, PackageOp, PackageRecord};
pub use profile::{ArchiveFormat, DownloadSpec, ListFormat, RuntimeProfile};
pub use session::{ProcessSession, SessionId, SessionState};
pub use supervisor::ProcessSupervisor;
