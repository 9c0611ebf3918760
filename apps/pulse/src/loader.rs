//! # Boundary Loaders
//!
//! Reads the engine's inputs from disk. The `try_*` functions report what went
//! wrong; the plain ones log it and hand back the safe default instead.

use chrono::{DateTime, Utc};
use pulse_core::{PulseConfig, PulseError, PulseInput};
use serde::Deserialize;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a config file (1 MB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// Maximum size of an input or events file (100 MB).
pub const MAX_INPUT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Project id used when neither the input nor the command line names one.
pub const UNKNOWN_PROJECT: &str = "unknown";

/// Read a whole file after checking that it is a regular file within `max_size`.
pub async fn read_bounded(path: &Path, max_size: u64) -> Result<String, PulseError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        PulseError::IoError(format!("Cannot read metadata of '{}': {}", path.display(), e))
    })?;

    if !metadata.is_file() {
        return Err(PulseError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    if metadata.len() > max_size {
        return Err(PulseError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }

    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PulseError::IoError(format!("Read '{}': {}", path.display(), e)))
}

// =============================================================================
// CONFIG
// =============================================================================

/// On-disk config encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// `.toml` files are TOML; everything else is read as JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// Parse and validate a config document.
pub fn parse_config(contents: &str, format: ConfigFormat) -> Result<PulseConfig, PulseError> {
    let config: PulseConfig = match format {
        ConfigFormat::Toml => toml::from_str(contents)
            .map_err(|e| PulseError::DeserializationError(format!("TOML config: {}", e)))?,
        ConfigFormat::Json => serde_json::from_str(contents)
            .map_err(|e| PulseError::DeserializationError(format!("JSON config: {}", e)))?,
    };
    config.validate()?;
    Ok(config)
}

/// Load and validate a config file.
pub async fn try_load_config(path: &Path) -> Result<PulseConfig, PulseError> {
    let contents = read_bounded(path, MAX_CONFIG_FILE_SIZE).await?;
    parse_config(&contents, ConfigFormat::from_path(path))
}

/// Load the config at `path`, or the built-in default when there is no path
/// or the file cannot be used.
pub async fn load_config(path: Option<&Path>) -> PulseConfig {
    let Some(path) = path else {
        return PulseConfig::default();
    };

    match try_load_config(path).await {
        Ok(config) => {
            tracing::info!(path = %path.display(), version = %config.version, "config loaded");
            config
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config unusable, using defaults");
            PulseConfig::default()
        }
    }
}

/// Serialize a config as TOML.
pub fn config_to_toml(config: &PulseConfig) -> Result<String, PulseError> {
    toml::to_string_pretty(config)
        .map_err(|e| PulseError::SerializationError(format!("TOML config: {}", e)))
}

// =============================================================================
// INPUT
// =============================================================================

/// Load a project input document.
pub async fn try_load_input(path: &Path) -> Result<PulseInput, PulseError> {
    let contents = read_bounded(path, MAX_INPUT_FILE_SIZE).await?;
    serde_json::from_str(&contents)
        .map_err(|e| PulseError::DeserializationError(format!("Input '{}': {}", path.display(), e)))
}

/// Load a project input, or an empty one for `fallback_project` when the file
/// cannot be used.
pub async fn load_input(path: &Path, fallback_project: &str) -> PulseInput {
    match try_load_input(path).await {
        Ok(input) => input,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "inventory unusable, computing with an empty inventory"
            );
            PulseInput::empty(fallback_project)
        }
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// One signal event: a bare RFC 3339 timestamp or an object carrying one.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum EventRecord {
    Timestamp(DateTime<Utc>),
    Signal {
        #[serde(alias = "timestamp")]
        created_at: DateTime<Utc>,
    },
}

impl EventRecord {
    fn at(&self) -> DateTime<Utc> {
        match self {
            EventRecord::Timestamp(at) | EventRecord::Signal { created_at: at } => *at,
        }
    }
}

/// Parse a JSON array of signal events into timestamps.
pub fn parse_events(contents: &str) -> Result<Vec<DateTime<Utc>>, PulseError> {
    let records: Vec<EventRecord> = serde_json::from_str(contents)
        .map_err(|e| PulseError::DeserializationError(format!("Events: {}", e)))?;
    Ok(records.iter().map(EventRecord::at).collect())
}

/// Load signal event timestamps.
pub async fn try_load_events(path: &Path) -> Result<Vec<DateTime<Utc>>, PulseError> {
    let contents = read_bounded(path, MAX_INPUT_FILE_SIZE).await?;
    parse_events(&contents)
}

/// Load event timestamps if a file was given. `None` (no velocity, targets
/// unscaled) when there is no file or it cannot be used.
pub async fn load_events(path: Option<PathBuf>) -> Option<Vec<DateTime<Utc>>> {
    let path = path?;
    match try_load_events(&path).await {
        Ok(events) => Some(events),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "events unusable, assuming steady velocity");
            None
        }
    }
}
