//! Durable dynamic-arsenal store — JSONL, one record per registered tool.
//!
//! Tools are persisted immediately on registration so a crash afterwards
//! does not lose them; the whole file is loaded and merged into the
//! catalog at startup. Corrupt lines are skipped with a warning rather
//! than poisoning the load.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use overwatch_core::arsenal::DynamicTool;
use overwatch_core::error::ArsenalError;
use tracing::{debug, warn};

/// File-backed record of every dynamic tool ever registered.
pub struct DynamicArsenalStore {
    path: PathBuf,
}

impl DynamicArsenalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all persisted tools. A missing file is an empty store.
    pub fn load(&self) -> Vec<DynamicTool> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        let tools: Vec<DynamicTool> = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<DynamicTool>(line) {
                Ok(tool) => Some(tool),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted dynamic arsenal record");
                    None
                }
            })
            .collect();

        debug!(path = %self.path.display(), count = tools.len(), "Dynamic arsenal loaded");
        tools
    }

    /// Append one tool and flush before returning.
    ///
    /// Failure is a `PersistenceFailure` — the caller logs it as a warning
    /// and keeps the tool in-memory for the session.
    pub fn append(&self, tool: &DynamicTool) -> Result<(), ArsenalError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ArsenalError::PersistenceFailure(e.to_string()))?;
        }

        let line = serde_json::to_string(tool)
            .map_err(|e| ArsenalError::PersistenceFailure(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ArsenalError::PersistenceFailure(e.to_string()))?;

        writeln!(file, "{line}").map_err(|e| ArsenalError::PersistenceFailure(e.to_string()))?;
        file.flush().map_err(|e| ArsenalError::PersistenceFailure(e.to_string()))?;

        debug!(tool = %tool.name, path = %self.path.display(), "Dynamic tool persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use overwatch_core::arsenal::Provenance;

    fn tool(name: &str) -> DynamicTool {
        DynamicTool {
            name: name.into(),
            raw_command: "httpx -u {url}".into(),
            provenance: Provenance {
                mission_id: "m-1".into(),
                target: "example.com".into(),
                iteration: 1,
                registered_at: Utc::now(),
            },
        }
    }

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = DynamicArsenalStore::new(dir.path().join("arsenal.jsonl"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn append_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = DynamicArsenalStore::new(dir.path().join("arsenal.jsonl"));

        store.append(&tool("probe_a")).unwrap();
        store.append(&tool("probe_b")).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "probe_a");
        assert_eq!(loaded[1].name, "probe_b");
        assert_eq!(loaded[0].provenance.target, "example.com");
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arsenal.jsonl");
        let store = DynamicArsenalStore::new(&path);
        store.append(&tool("good")).unwrap();

        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("this is not json\n");
        std::fs::write(&path, content).unwrap();
        store.append(&tool("also_good")).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = DynamicArsenalStore::new(dir.path().join("nested/dir/arsenal.jsonl"));
        store.append(&tool("probe")).unwrap();
        assert_eq!(store.load().len(), 1);
    }
}
