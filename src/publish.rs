//! Snapshot publication.
//!
//! The dashboard reads one flat JSON file. Each successful cycle fully
//! replaces it; the write goes to a temp file in the same directory and
//! is renamed into place so the consumer never sees a partial snapshot.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};

use crate::db::models::UiSnapshot;

pub struct SnapshotPublisher {
    path: PathBuf,
}

impl SnapshotPublisher {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn publish(&self, snapshot: &UiSnapshot) -> Result<()> {
        let serialized = serde_json::to_string_pretty(snapshot)
            .context("failed to serialize ui snapshot")?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create snapshot directory {}", parent.display())
                })?;
            }
        }

        let mut tmp_path = self.path.clone();
        tmp_path.set_extension("json.tmp");
        fs::write(&tmp_path, serialized)
            .with_context(|| format!("failed to write snapshot to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path).with_context(|| {
            format!("failed to move snapshot into place at {}", self.path.display())
        })?;

        Ok(())
    }
}
