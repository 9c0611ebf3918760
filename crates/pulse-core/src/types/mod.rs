//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of the Pulse Engine:
//! - Inputs supplied by collaborators (`EntityRecord`, `EntityInventory`,
//!   `OpenQuestion`, `BusinessDriver`)
//! - The entity-type key (`EntityType`)
//! - Closed classifications (`PulseStage`, `CoverageLevel`, `EntityDirective`)
//! - Error types (`PulseError`)
//!
//! ## Determinism Guarantees
//!
//! All keyed collections use `BTreeMap`/`BTreeSet` so that iteration order is
//! defined by the key, never by insertion order or hashing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// =============================================================================
// ENTITY TYPE
// =============================================================================

/// Key identifying a family of extracted entities (`feature`, `persona`, ...).
///
/// The set is open: extraction may introduce new keys without a code change,
/// so this is a string newtype rather than an enum.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(pub String);

impl EntityType {
    /// Create a new entity type from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the entity type as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable label (`workflow_step` -> `workflow step`).
    #[must_use]
    pub fn label(&self) -> String {
        self.0.replace('_', " ")
    }
}

impl From<&str> for EntityType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// COLLABORATOR INPUTS
// =============================================================================

/// One extracted entity, reduced to the attributes the engine reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Free-form status; any value starting with `confirmed` counts as confirmed.
    #[serde(default)]
    pub confirmation_status: String,
    /// Whether the supporting evidence is considered out of date.
    #[serde(default)]
    pub is_stale: bool,
}

impl EntityRecord {
    /// Create a new record.
    #[must_use]
    pub fn new(confirmation_status: impl Into<String>, is_stale: bool) -> Self {
        Self {
            confirmation_status: confirmation_status.into(),
            is_stale,
        }
    }

    /// `confirmed`, `confirmed_client`, `confirmed_consultant`, ...
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.confirmation_status.starts_with("confirmed")
    }
}

/// Entity type -> records, as supplied by the database layer.
pub type EntityInventory = BTreeMap<EntityType, Vec<EntityRecord>>;

/// An open question raised during discovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenQuestion {
    #[serde(default)]
    pub priority: String,
}

impl OpenQuestion {
    /// Priority value that the engine treats as critical.
    pub const CRITICAL: &'static str = "critical";

    /// Create a question with the given priority.
    #[must_use]
    pub fn new(priority: impl Into<String>) -> Self {
        Self {
            priority: priority.into(),
        }
    }

    /// Only `critical` priority is consulted by the engine.
    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.priority == Self::CRITICAL
    }
}

/// A business driver (pain point, goal, KPI, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessDriver {
    #[serde(default)]
    pub driver_type: String,
}

impl BusinessDriver {
    /// Create a driver of the given type.
    #[must_use]
    pub fn new(driver_type: impl Into<String>) -> Self {
        Self {
            driver_type: driver_type.into(),
        }
    }

    #[must_use]
    pub fn is_pain(&self) -> bool {
        self.driver_type == "pain"
    }

    #[must_use]
    pub fn is_goal(&self) -> bool {
        self.driver_type == "goal"
    }
}

// =============================================================================
// PULSE STAGE
// =============================================================================

/// Project lifecycle stages, in strict order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PulseStage {
    #[default]
    Discovery,
    Validation,
    Prototype,
    Specification,
    Handoff,
}

impl PulseStage {
    /// All stages in lifecycle order.
    pub const ALL: [PulseStage; 5] = [
        PulseStage::Discovery,
        PulseStage::Validation,
        PulseStage::Prototype,
        PulseStage::Specification,
        PulseStage::Handoff,
    ];

    /// Get the stage key (`discovery`, `validation`, ...).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PulseStage::Discovery => "discovery",
            PulseStage::Validation => "validation",
            PulseStage::Prototype => "prototype",
            PulseStage::Specification => "specification",
            PulseStage::Handoff => "handoff",
        }
    }

    /// Get the next stage, if any.
    #[must_use]
    pub fn next(&self) -> Option<PulseStage> {
        match self {
            PulseStage::Discovery => Some(PulseStage::Validation),
            PulseStage::Validation => Some(PulseStage::Prototype),
            PulseStage::Prototype => Some(PulseStage::Specification),
            PulseStage::Specification => Some(PulseStage::Handoff),
            PulseStage::Handoff => None,
        }
    }

    /// Check if this stage is terminal (handoff).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, PulseStage::Handoff)
    }
}

impl std::fmt::Display for PulseStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// COVERAGE LEVEL
// =============================================================================

/// Entity count measured against the stage target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageLevel {
    Missing,
    Thin,
    Growing,
    Adequate,
    Saturated,
}

impl CoverageLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageLevel::Missing => "missing",
            CoverageLevel::Thin => "thin",
            CoverageLevel::Growing => "growing",
            CoverageLevel::Adequate => "adequate",
            CoverageLevel::Saturated => "saturated",
        }
    }
}

impl std::fmt::Display for CoverageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ENTITY DIRECTIVE
// =============================================================================

/// Recommended extraction behavior for one entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityDirective {
    Grow,
    Enrich,
    Confirm,
    MergeOnly,
    Stable,
}

impl EntityDirective {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityDirective::Grow => "grow",
            EntityDirective::Enrich => "enrich",
            EntityDirective::Confirm => "confirm",
            EntityDirective::MergeOnly => "merge_only",
            EntityDirective::Stable => "stable",
        }
    }
}

impl std::fmt::Display for EntityDirective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised at the engine's boundary.
///
/// The computation itself is infallible; these only surface while loading or
/// validating configuration and inputs.
#[derive(Debug, Error)]
pub enum PulseError {
    /// The configuration failed validation.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ordering() {
        assert!(PulseStage::Discovery < PulseStage::Validation);
        assert!(PulseStage::Validation < PulseStage::Prototype);
        assert!(PulseStage::Prototype < PulseStage::Specification);
        assert!(PulseStage::Specification < PulseStage::Handoff);
    }

    #[test]
    fn only_handoff_has_no_next_stage() {
        for stage in PulseStage::ALL {
            assert_eq!(stage.next().is_none(), stage.is_terminal());
        }
    }

    #[test]
    fn stage_serializes_snake_case() {
        let json = serde_json::to_string(&PulseStage::Specification).expect("serialize");
        assert_eq!(json, "\"specification\"");
    }

    #[test]
    fn confirmed_prefix_counts() {
        assert!(EntityRecord::new("confirmed", false).is_confirmed());
        assert!(EntityRecord::new("confirmed_client", false).is_confirmed());
        assert!(!EntityRecord::new("ai_generated", false).is_confirmed());
        assert!(!EntityRecord::new("needs_confirmed", false).is_confirmed());
    }

    #[test]
    fn entity_type_label() {
        assert_eq!(EntityType::new("workflow_step").label(), "workflow step");
        assert_eq!(EntityType::new("feature").to_string(), "feature");
    }

    #[test]
    fn directive_serializes_merge_only() {
        let json = serde_json::to_string(&EntityDirective::MergeOnly).expect("serialize");
        assert_eq!(json, "\"merge_only\"");
    }
}
