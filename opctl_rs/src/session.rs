//! Session records in the optional output file.
//!
//! When `OPCTL_OUTPUT_FILE_PATH` (or `OPCTL_OUTPUT_FILE_DIRECTORY`) is set,
//! every invocation appends one JSON line describing itself. Write-only.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::env::EnvStore;

#[derive(Debug, Clone, Serialize)]
pub struct SessionEntry {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub version: u32,
    pub tool_version: String,
    pub command_line_args: Vec<String>,
    pub log_file_path: Option<String>,
    pub timestamp: String,
}

impl SessionEntry {
    pub fn new(tool_version: &str, argv: &[String], log_file_path: Option<&Path>) -> Self {
        Self {
            kind: "session",
            version: 1,
            tool_version: tool_version.to_string(),
            command_line_args: argv.to_vec(),
            log_file_path: log_file_path.map(|p| p.display().to_string()),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Resolve the output file for this process, if one is configured.
pub fn output_file(env: &dyn EnvStore) -> Option<PathBuf> {
    if let Some(path) = env.get("OPCTL_OUTPUT_FILE_PATH").filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    env.get("OPCTL_OUTPUT_FILE_DIRECTORY")
        .filter(|d| !d.is_empty())
        .map(|dir| {
            let stamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S_%3f");
            PathBuf::from(dir).join(format!("opctl-output-{stamp}.json"))
        })
}

/// Append `entry` as one JSON line to `path`.
pub fn append(path: &Path, entry: &SessionEntry) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let line = serde_json::to_string(entry)?;
    writeln!(file, "{line}").with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnv;
    use tempfile::TempDir;

    #[test]
    fn test_append_writes_json_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("session.json");
        let argv = vec!["kv".to_string(), "list".to_string()];
        append(&path, &SessionEntry::new("1.2.3", &argv, Some(Path::new("/tmp/x.log")))).unwrap();
        append(&path, &SessionEntry::new("1.2.3", &argv, None)).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "session");
        assert_eq!(lines[0]["command_line_args"][1], "list");
        assert_eq!(lines[0]["log_file_path"], "/tmp/x.log");
        assert!(lines[1]["log_file_path"].is_null());
    }

    #[test]
    fn test_output_file_resolution() {
        assert_eq!(output_file(&MemoryEnv::new()), None);
        let env = MemoryEnv::from_pairs([("OPCTL_OUTPUT_FILE_PATH", "/tmp/out.json")]);
        assert_eq!(output_file(&env), Some(PathBuf::from("/tmp/out.json")));
        let env = MemoryEnv::from_pairs([("OPCTL_OUTPUT_FILE_DIRECTORY", "/tmp/outs")]);
        assert!(output_file(&env).unwrap().starts_with("/tmp/outs"));
    }
}
