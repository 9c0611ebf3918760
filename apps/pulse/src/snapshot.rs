//! # Pulse Snapshots
//!
//! Persists a computed pulse as pretty JSON under
//! `<dir>/<project_id>/<YYYYMMDDTHHMMSSZ>-<trigger>.json`.
//!
//! Writing is fire-and-forget: a failed write is logged and never changes the
//! pulse the caller already has.

use chrono::{DateTime, Utc};
use pulse_core::{ProjectPulse, PulseError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

/// Timestamp layout used in snapshot file names.
pub const SNAPSHOT_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// A pulse together with the key it is stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseSnapshot {
    pub project_id: String,
    pub computed_at: DateTime<Utc>,
    pub trigger: String,
    pub pulse: ProjectPulse,
}

impl PulseSnapshot {
    #[must_use]
    pub fn new(
        project_id: impl Into<String>,
        computed_at: DateTime<Utc>,
        trigger: impl Into<String>,
        pulse: ProjectPulse,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            computed_at,
            trigger: trigger.into(),
            pulse,
        }
    }

    /// Where this snapshot lives below `dir`.
    #[must_use]
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(path_component(&self.project_id)).join(format!(
            "{}-{}.json",
            self.computed_at.format(SNAPSHOT_TIME_FORMAT),
            path_component(&self.trigger)
        ))
    }
}

/// Reduce an identifier to `[A-Za-z0-9_-]` so it cannot escape `dir`.
#[must_use]
pub fn path_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned
    }
}

/// Write a snapshot, creating the project directory as needed.
pub async fn write_snapshot(dir: &Path, snapshot: &PulseSnapshot) -> Result<PathBuf, PulseError> {
    let path = snapshot.path_in(dir);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            PulseError::IoError(format!("Create '{}': {}", parent.display(), e))
        })?;
    }

    let json = serde_json::to_vec_pretty(snapshot)
        .map_err(|e| PulseError::SerializationError(format!("Snapshot: {}", e)))?;
    tokio::fs::write(&path, json)
        .await
        .map_err(|e| PulseError::IoError(format!("Write '{}': {}", path.display(), e)))?;

    Ok(path)
}

/// Read a snapshot back.
pub async fn read_snapshot(path: &Path) -> Result<PulseSnapshot, PulseError> {
    let contents = tokio::fs::read(path)
        .await
        .map_err(|e| PulseError::IoError(format!("Read '{}': {}", path.display(), e)))?;
    serde_json::from_slice(&contents)
        .map_err(|e| PulseError::DeserializationError(format!("Snapshot: {}", e)))
}

/// Write a snapshot in the background. Failures are logged and swallowed.
pub fn spawn_snapshot_write(dir: PathBuf, snapshot: PulseSnapshot) -> JoinHandle<()> {
    tokio::spawn(async move {
        match write_snapshot(&dir, &snapshot).await {
            Ok(path) => tracing::info!(path = %path.display(), "snapshot written"),
            Err(e) => tracing::warn!(
                project_id = %snapshot.project_id,
                error = %e,
                "snapshot write failed"
            ),
        }
    })
}
