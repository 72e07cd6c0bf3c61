use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hcide_toolchain::RuntimeKind;

/// HC IDE - toolchain shell for Python, Node.js and Go projects
#[derive(Parser, Debug)]
#[command(name = "hcide")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the path of an installed interpreter (exit 1 when none is found)
    Find {
        /// Runtime kind: python | node | go
        #[arg(value_name = "KIND")]
        kind: RuntimeKind,
    },

    /// Print the version reported by an interpreter
    Version {
        #[arg(value_name = "KIND")]
        kind: RuntimeKind,

        /// Interpreter to query (default: the located one)
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Download and unpack the pinned portable runtime
    Install {
        #[arg(value_name = "KIND")]
        kind: RuntimeKind,

        /// Target directory (default: $HCIDE_TOOLS_DIR/<kind>)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Create a new project with starter files
    New {
        /// Project name
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(value_name = "KIND")]
        kind: RuntimeKind,

        /// Project directory (default: ./<name>)
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Do not install a runtime when none is found
        #[arg(long, default_value = "false")]
        no_install: bool,
    },

    /// Manage project packages through the runtime's package tool
    Packages {
        #[command(subcommand)]
        action: PackagesAction,
    },

    /// Run a project's entry file; Ctrl-C cancels the whole process tree
    Run {
        #[arg(value_name = "KIND")]
        kind: RuntimeKind,

        /// Entry file relative to the project (default: main.py / index.js / main.go)
        #[arg(long, value_name = "FILE")]
        entry: Option<String>,

        #[command(flatten)]
        target: TargetArgs,

        /// Cancel after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct TargetArgs {
    /// Project directory (default: current directory)
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Interpreter to use (default: located, then the managed install)
    #[arg(long, value_name = "PATH")]
    pub interpreter: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum PackagesAction {
    /// List installed packages
    List {
        #[arg(value_name = "KIND")]
        kind: RuntimeKind,

        #[command(flatten)]
        target: TargetArgs,

        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Install a package
    Install {
        #[arg(value_name = "KIND")]
        kind: RuntimeKind,

        #[arg(value_name = "PACKAGE")]
        package: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Uninstall a package
    Uninstall {
        #[arg(value_name = "KIND")]
        kind: RuntimeKind,

        #[arg(value_name = "PACKAGE")]
        package: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Update a package to its latest version
    Update {
        #[arg(value_name = "KIND")]
        kind: RuntimeKind,

        #[arg(value_name = "PACKAGE")]
        package: String,

        #[command(flatten)]
        target: TargetArgs,
    },

    /// Search the package registry (not supported; always empty)
    Search {
        #[arg(value_name = "KIND")]
        kind: RuntimeKind,

        #[arg(value_name = "QUERY")]
        query: String,
    },
}
