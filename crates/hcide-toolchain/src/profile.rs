//! Per-kind strategy table.
//!
//! Every difference between ecosystems (binary name, version probe, install
//! locations, package command templates, list output format, run template,
//! pinned download) is data in [`PROFILES`]. Adding an ecosystem means adding
//! a row here plus a [`RuntimeKind`] variant; the engine code stays unchanged.

use std::path::{Path, PathBuf};

use crate::kind::RuntimeKind;

/// Placeholder replaced by the package name in package command templates.
pub const PACKAGE_PLACEHOLDER: &str = "{package}";
/// Placeholder replaced by the entry file in run templates.
pub const ENTRY_FILE_PLACEHOLDER: &str = "{entryFile}";

/// Which executable a command template runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Program {
    /// The resolved runtime binary itself (`python -m pip`, `go get`).
    Interpreter,
    /// A companion tool shipped with the runtime (`npm` next to `node`).
    Tool(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: Program,
    pub args: &'static [&'static str],
}

impl CommandTemplate {
    const fn interpreter(args: &'static [&'static str]) -> Self {
        Self {
            program: Program::Interpreter,
            args,
        }
    }

    const fn tool(name: &'static str, args: &'static [&'static str]) -> Self {
        Self {
            program: Program::Tool(name),
            args,
        }
    }

    /// Expand `placeholder` with `value` in every argument.
    pub fn render(&self, placeholder: &str, value: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(placeholder, value))
            .collect()
    }

    /// Executable to spawn for this template given the resolved interpreter.
    ///
    /// Companion tools are looked up beside the interpreter first (portable
    /// installs ship `npm` in the same directory as `node`), then on `PATH`.
    /// Falls back to the bare name so the spawn error names the missing tool.
    pub fn resolve_program(&self, interpreter: &Path) -> PathBuf {
        match self.program {
            Program::Interpreter => interpreter.to_path_buf(),
            Program::Tool(name) => {
                if let Some(dir) = interpreter.parent() {
                    for candidate in tool_file_names(name) {
                        let path = dir.join(&candidate);
                        if path.is_file() {
                            return path;
                        }
                    }
                }
                which::which(name).unwrap_or_else(|_| PathBuf::from(name))
            }
        }
    }
}

#[cfg(windows)]
fn tool_file_names(name: &str) -> Vec<String> {
    vec![
        format!("{}.cmd", name),
        format!("{}.exe", name),
        name.to_string(),
    ]
}

#[cfg(not(windows))]
fn tool_file_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

/// Structured output shape of a kind's list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// `[{"name": "...", "version": "..."}, ...]` (pip)
    JsonArray,
    /// `{"dependencies": {"<name>": {"version": "..."}}}` (npm)
    DependencyMap,
    /// Concatenated objects carrying `Path` and `Version` (go list -m -json)
    JsonLines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

/// Pinned portable build for the current platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSpec {
    pub url: &'static str,
    pub archive: ArchiveFormat,
    /// Runtime binary relative to the extraction directory.
    pub executable: &'static str,
}

#[derive(Debug)]
pub struct RuntimeProfile {
    pub kind: RuntimeKind,
    pub display_name: &'static str,
    /// Name probed on the search path.
    pub binary: &'static str,
    pub version_args: &'static [&'static str],
    /// Absolute install locations checked in order after the search-path probe.
    pub well_known: &'static [&'static str],
    /// Per-user install location, relative to the local data directory.
    pub user_well_known: Option<&'static str>,
    pub list: CommandTemplate,
    pub list_format: ListFormat,
    pub install: CommandTemplate,
    pub uninstall: CommandTemplate,
    pub update: CommandTemplate,
    pub run: CommandTemplate,
    pub entry_file: &'static str,
    pub download: Option<DownloadSpec>,
}

impl RuntimeProfile {
    /// Well-known install paths for this platform, in lookup order.
    pub fn well_known_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.well_known.iter().map(PathBuf::from).collect();
        if let (Some(rel), Some(base)) = (self.user_well_known, dirs::data_local_dir()) {
            paths.push(base.join(rel));
        }
        paths
    }
}

static PROFILES: [RuntimeProfile; 3] = [
    RuntimeProfile {
        kind: RuntimeKind::Python,
        display_name: "Python",
        binary: PYTHON_BINARY,
        version_args: &["--version"],
        well_known: well_known::PYTHON,
        user_well_known: well_known::PYTHON_USER,
        list: CommandTemplate::interpreter(&["-m", "pip", "list", "--format=json"]),
        list_format: ListFormat::JsonArray,
        install: CommandTemplate::interpreter(&["-m", "pip", "install", "{package}"]),
        uninstall: CommandTemplate::interpreter(&["-m", "pip", "uninstall", "-y", "{package}"]),
        update: CommandTemplate::interpreter(&["-m", "pip", "install", "--upgrade", "{package}"]),
        run: CommandTemplate::interpreter(&["{entryFile}"]),
        entry_file: "main.py",
        download: pinned::PYTHON,
    },
    RuntimeProfile {
        kind: RuntimeKind::Node,
        display_name: "Node.js",
        binary: "node",
        version_args: &["--version"],
        well_known: well_known::NODE,
        user_well_known: None,
        list: CommandTemplate::tool("npm", &["list", "--json", "--depth=0"]),
        list_format: ListFormat::DependencyMap,
        install: CommandTemplate::tool("npm", &["install", "{package}"]),
        uninstall: CommandTemplate::tool("npm", &["uninstall", "{package}"]),
        update: CommandTemplate::tool("npm", &["update", "{package}"]),
        run: CommandTemplate::interpreter(&["{entryFile}"]),
        entry_file: "index.js",
        download: pinned::NODE,
    },
    RuntimeProfile {
        kind: RuntimeKind::Go,
        display_name: "Go",
        binary: "go",
        version_args: &["version"],
        well_known: well_known::GO,
        user_well_known: None,
        list: CommandTemplate::interpreter(&["list", "-m", "-json", "all"]),
        list_format: ListFormat::JsonLines,
        install: CommandTemplate::interpreter(&["get", "{package}"]),
        uninstall: CommandTemplate::interpreter(&["mod", "edit", "-droprequire", "{package}"]),
        update: CommandTemplate::interpreter(&["get", "-u", "{package}"]),
        run: CommandTemplate::interpreter(&["run", "{entryFile}"]),
        entry_file: "main.go",
        download: pinned::GO,
    },
];

pub(crate) fn lookup(kind: RuntimeKind) -> &'static RuntimeProfile {
    match kind {
        RuntimeKind::Python => &PROFILES[0],
        RuntimeKind::Node => &PROFILES[1],
        RuntimeKind::Go => &PROFILES[2],
    }
}

#[cfg(windows)]
const PYTHON_BINARY: &str = "python";
// Most unix distributions no longer ship a bare `python`.
#[cfg(not(windows))]
const PYTHON_BINARY: &str = "python3";

#[cfg(windows)]
mod well_known {
    pub const PYTHON: &[&str] = &[
        r"C:\Python312\python.exe",
        r"C:\Python311\python.exe",
        r"C:\Python310\python.exe",
    ];
    pub const PYTHON_USER: Option<&str> = Some(r"Programs\Python\Python312\python.exe");
    pub const NODE: &[&str] = &[
        r"C:\Program Files\nodejs\node.exe",
        r"C:\Program Files (x86)\nodejs\node.exe",
    ];
    pub const GO: &[&str] = &[r"C:\Go\bin\go.exe", r"C:\Program Files\Go\bin\go.exe"];
}

#[cfg(not(windows))]
mod well_known {
    pub const PYTHON: &[&str] = &[
        "/usr/local/bin/python3",
        "/usr/bin/python3",
        "/opt/homebrew/bin/python3",
    ];
    pub const PYTHON_USER: Option<&str> = None;
    pub const NODE: &[&str] = &[
        "/usr/local/bin/node",
        "/usr/bin/node",
        "/opt/homebrew/bin/node",
    ];
    pub const GO: &[&str] = &["/usr/local/go/bin/go", "/usr/lib/go/bin/go", "/opt/homebrew/bin/go"];
}

// Pinned: Python 3.12.0, Node.js 20.10.0, Go 1.21.5

#[cfg(all(windows, target_arch = "x86_64"))]
mod pinned {
    use super::{ArchiveFormat, DownloadSpec};

    pub const PYTHON: Option<DownloadSpec> = Some(DownloadSpec {
        url: "https://www.python.org/ftp/python/3.12.0/python-3.12.0-embed-amd64.zip",
        archive: ArchiveFormat::Zip,
        executable: "python.exe",
    });
    pub const NODE: Option<DownloadSpec> = Some(DownloadSpec {
        url: "https://nodejs.org/dist/v20.10.0/node-v20.10.0-win-x64.zip",
        archive: ArchiveFormat::Zip,
        executable: r"node-v20.10.0-win-x64\node.exe",
    });
    pub const GO: Option<DownloadSpec> = Some(DownloadSpec {
        url: "https://go.dev/dl/go1.21.5.windows-amd64.zip",
        archive: ArchiveFormat::Zip,
        executable: r"go\bin\go.exe",
    });
}

macro_rules! unix_pinned {
    ($py_triple:literal, $node_platform:literal, $go_platform:literal) => {
        mod pinned {
            use super::{ArchiveFormat, DownloadSpec};

            pub const PYTHON: Option<DownloadSpec> = Some(DownloadSpec {
                url: concat!(
                    "https://github.com/indygreg/python-build-standalone/releases/download/20231002/cpython-3.12.0+20231002-",
                    $py_triple,
                    "-install_only.tar.gz"
                ),
                archive: ArchiveFormat::TarGz,
                executable: "python/bin/python3",
            });
            pub const NODE: Option<DownloadSpec> = Some(DownloadSpec {
                url: concat!("https://nodejs.org/dist/v20.10.0/node-v20.10.0-", $node_platform, ".tar.gz"),
                archive: ArchiveFormat::TarGz,
                executable: concat!("node-v20.10.0-", $node_platform, "/bin/node"),
            });
            pub const GO: Option<DownloadSpec> = Some(DownloadSpec {
                url: concat!("https://go.dev/dl/go1.21.5.", $go_platform, ".tar.gz"),
                archive: ArchiveFormat::TarGz,
                executable: "go/bin/go",
            });
        }
    };
}

#[cfg(all(target_os = "linux", target_arch = "x86_64"))]
unix_pinned!("x86_64-unknown-linux-gnu", "linux-x64", "linux-amd64");
#[cfg(all(target_os = "linux", target_arch = "aarch64"))]
unix_pinned!("aarch64-unknown-linux-gnu", "linux-arm64", "linux-arm64");
#[cfg(all(target_os = "macos", target_arch = "x86_64"))]
unix_pinned!("x86_64-apple-darwin", "darwin-x64", "darwin-amd64");
#[cfg(all(target_os = "macos", target_arch = "aarch64"))]
unix_pinned!("aarch64-apple-darwin", "darwin-arm64", "darwin-arm64");

#[cfg(not(any(
    all(windows, target_arch = "x86_64"),
    all(target_os = "linux", any(target_arch = "x86_64", target_arch = "aarch64")),
    all(target_os = "macos", any(target_arch = "x86_64", target_arch = "aarch64")),
)))]
mod pinned {
    use super::DownloadSpec;

    pub const PYTHON: Option<DownloadSpec> = None;
    pub const NODE: Option<DownloadSpec> = None;
    pub const GO: Option<DownloadSpec> = None;
}
