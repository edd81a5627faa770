//! StateStore - durable load/commit for the run state

use crate::models::RunState;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Durable store for the single `RunState` of a monitored ledger.
///
/// Runs are serialized by the caller, so atomic replace-on-write is the only
/// commit discipline required.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last persisted state.
    ///
    /// A missing file yields a fresh empty state. An unreadable or corrupt
    /// file is backed up with a `.bak` extension and also yields a fresh
    /// state, so a bad save file costs the baseline but never the run.
    pub fn load(&self) -> RunState {
        if !self.path.exists() {
            return RunState::default();
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    "failed to read state file {}: {}; starting fresh",
                    self.path.display(),
                    e
                );
                return RunState::default();
            }
        };

        match serde_yaml::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    "state file {} is corrupt ({}); backing it up and starting fresh",
                    self.path.display(),
                    e
                );
                let backup = self.path.with_extension("yaml.bak");
                if let Err(rename_err) = fs::rename(&self.path, &backup) {
                    tracing::warn!("failed to back up corrupt state file: {}", rename_err);
                }
                RunState::default()
            }
        }
    }

    /// Atomically persist the full state, replacing the prior value.
    ///
    /// Writes to a temp file in the same directory and persists it over the
    /// target, so an interrupted commit leaves the old state intact.
    pub fn commit(&self, state: &RunState) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let content = serde_yaml::to_string(state).context("failed to serialize run state")?;

        let mut temp_file = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
        temp_file.write_all(content.as_bytes())?;
        temp_file.flush()?;
        temp_file
            .persist(&self.path)
            .with_context(|| format!("failed to persist state to {}", self.path.display()))?;

        tracing::debug!("run state committed to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_missing_gives_fresh_state() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path().join("state.yaml"));

        let state = store.load();
        assert!(state.baseline.is_none());
        assert!(state.failure_log.is_empty());
    }

    #[test]
    fn test_commit_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path().join("state.yaml"));

        let mut state = RunState::default();
        state.record_failure("the converter fell over");
        state.last_change_notification = Some("<msg-1@test>".to_string());
        store.commit(&state).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.consecutive_failures(), 1);
        assert_eq!(loaded.failure_log[0].cause, "the converter fell over");
        assert_eq!(
            loaded.last_change_notification.as_deref(),
            Some("<msg-1@test>")
        );
    }

    #[test]
    fn test_commit_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path().join("nested/deeper/state.yaml"));

        store.commit(&RunState::default()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_corrupt_state_is_backed_up_not_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.yaml");
        fs::write(&path, "{ this is not: [valid yaml").unwrap();

        let store = StateStore::new(&path);
        let state = store.load();
        assert!(state.baseline.is_none());

        let backup = path.with_extension("yaml.bak");
        assert!(backup.exists());
        assert!(!path.exists());
    }

    #[test]
    fn test_commit_replaces_prior_value() {
        let temp_dir = TempDir::new().unwrap();
        let store = StateStore::new(temp_dir.path().join("state.yaml"));

        let mut state = RunState::default();
        state.record_failure("first");
        store.commit(&state).unwrap();

        state.mark_success();
        store.commit(&state).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.consecutive_failures(), 0);
        assert!(loaded.last_success.is_some());
    }
}
