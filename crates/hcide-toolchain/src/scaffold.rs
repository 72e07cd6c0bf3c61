//! New-project starter files per kind.

use std::path::{Path, PathBuf};

use hcide_fs::FileSystem;
use serde_json::json;

use crate::error::{Result, ToolchainError};
use crate::info_log;
use crate::kind::RuntimeKind;

/// Per-project metadata directory.
pub const METADATA_DIR: &str = ".hcide";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaffoldedProject {
    pub name: String,
    pub kind: RuntimeKind,
    pub root: PathBuf,
    pub entry_file: String,
    pub files: Vec<PathBuf>,
}

/// Create `dir` with the starter files for `kind`.
/// Refuses to overwrite an existing entry file.
pub fn create_project(
    fs: &dyn FileSystem,
    name: &str,
    dir: &Path,
    kind: RuntimeKind,
) -> Result<ScaffoldedProject> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ToolchainError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "project name is empty",
        )));
    }
    let entry_file = kind.default_entry_file();
    if fs.file_exists(&dir.join(entry_file)) {
        return Err(ToolchainError::Io(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("{} already exists in {}", entry_file, dir.display()),
        )));
    }

    fs.create_dir_all(&dir.join(METADATA_DIR))?;
    let mut files = Vec::new();
    for (file, content) in starter_files(name, kind) {
        let path = dir.join(file);
        fs.write_all_text(&path, &content)?;
        files.push(path);
    }
    info_log!("Created {} project '{}' at {}", kind, name, dir.display());

    Ok(ScaffoldedProject {
        name: name.to_string(),
        kind,
        root: dir.to_path_buf(),
        entry_file: entry_file.to_string(),
        files,
    })
}

fn starter_files(name: &str, kind: RuntimeKind) -> Vec<(&'static str, String)> {
    let created = chrono::Local::now().format("%Y-%m-%d");
    let readme = format!(
        "# {}\n\n{} project created with HC IDE.\n",
        name,
        match kind {
            RuntimeKind::Python => "Python 3.12",
            RuntimeKind::Node => "JavaScript (Node.js)",
            RuntimeKind::Go => "Go 1.21",
        }
    );

    match kind {
        RuntimeKind::Python => vec![
            (
                "main.py",
                format!(
                    "# {name}\n# Created: {created}\n\n\
                     def main():\n    print('Hello, World!')\n\n\n\
                     if __name__ == '__main__':\n    main()\n"
                ),
            ),
            (
                "requirements.txt",
                "# Python dependencies, one per line\n# requests==2.31.0\n".to_string(),
            ),
            ("README.md", readme),
        ],
        RuntimeKind::Node => {
            let package = json!({
                "name": name.to_lowercase().replace(' ', "-"),
                "version": "1.0.0",
                "description": format!("{} - created with HC IDE", name),
                "main": "index.js",
                "type": "module",
                "scripts": { "start": "node index.js" },
                "keywords": [],
                "license": "ISC",
            });
            vec![
                (
                    "index.js",
                    format!(
                        "// {name}\n// Created: {created}\n\n\
                         function main() {{\n    console.log('Hello, World!');\n}}\n\nmain();\n"
                    ),
                ),
                (
                    "package.json",
                    serde_json::to_string_pretty(&package).unwrap_or_default() + "\n",
                ),
                ("README.md", readme),
            ]
        }
        RuntimeKind::Go => vec![
            (
                "main.go",
                format!(
                    "// {name}\n// Created: {created}\n\n\
                     package main\n\nimport \"fmt\"\n\n\
                     func main() {{\n\tfmt.Println(\"Hello, World!\")\n}}\n"
                ),
            ),
            (
                "go.mod",
                format!("module {}\n\ngo 1.21\n", name.to_lowercase().replace(' ', "")),
            ),
            ("README.md", readme),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcide_fs::LocalFs;

    #[test]
    fn test_python_project_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("demo");
        let project = create_project(&LocalFs, "Demo", &root, RuntimeKind::Python).unwrap();

        assert_eq!(project.entry_file, "main.py");
        assert!(root.join(METADATA_DIR).is_dir());
        for file in ["main.py", "requirements.txt", "README.md"] {
            assert!(root.join(file).is_file(), "{}", file);
        }
        let main = std::fs::read_to_string(root.join("main.py")).unwrap();
        assert!(main.contains("if __name__ == '__main__':"));
    }

    #[test]
    fn test_node_package_json() {
        let dir = tempfile::tempdir().unwrap();
        create_project(&LocalFs, "My Cool App", dir.path(), RuntimeKind::Node).unwrap();
        let text = std::fs::read_to_string(dir.path().join("package.json")).unwrap();
        let pkg: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(pkg["name"], "my-cool-app");
        assert_eq!(pkg["main"], "index.js");
        assert_eq!(pkg["scripts"]["start"], "node index.js");
    }

    #[test]
    fn test_go_module_name() {
        let dir = tempfile::tempdir().unwrap();
        create_project(&LocalFs, "Hello World", dir.path(), RuntimeKind::Go).unwrap();
        let go_mod = std::fs::read_to_string(dir.path().join("go.mod")).unwrap();
        assert_eq!(go_mod, "module helloworld\n\ngo 1.21\n");
        assert!(dir.path().join("main.go").is_file());
    }

    #[test]
    fn test_refuses_to_overwrite_entry_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.js"), "keep me").unwrap();
        assert!(create_project(&LocalFs, "x", dir.path(), RuntimeKind::Node).is_err());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("index.js")).unwrap(),
            "keep me"
        );
    }

    #[test]
    fn test_empty_name_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(create_project(&LocalFs, "  ", dir.path(), RuntimeKind::Go).is_err());
    }
}
