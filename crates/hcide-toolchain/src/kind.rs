//! RuntimeKind: the closed set of supported program ecosystems.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ToolchainError;
use crate::profile::{self, RuntimeProfile};

/// Supported ecosystems. Everything kind-specific lives in [`RuntimeProfile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// Dynamic-interpreted (CPython 3.12)
    Python,
    /// Scripted-JIT (Node.js 20)
    Node,
    /// Compiled (Go 1.21)
    Go,
}

impl RuntimeKind {
    pub const ALL: [RuntimeKind; 3] = [RuntimeKind::Python, RuntimeKind::Node, RuntimeKind::Go];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuntimeKind::Python => "python",
            RuntimeKind::Node => "node",
            RuntimeKind::Go => "go",
        }
    }

    /// Strategy bundle for this kind.
    pub fn profile(&self) -> &'static RuntimeProfile {
        profile::lookup(*self)
    }

    /// Entry file a new project starts from (`main.py`, `index.js`, `main.go`).
    pub fn default_entry_file(&self) -> &'static str {
        self.profile().entry_file
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeKind {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" | "py" => Ok(RuntimeKind::Python),
            "node" | "javascript" | "js" => Ok(RuntimeKind::Node),
            "go" | "golang" => Ok(RuntimeKind::Go),
            _ => Err(ToolchainError::UnknownKind(s.to_string())),
        }
    }
}
