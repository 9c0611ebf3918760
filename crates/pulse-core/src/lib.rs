//! # pulse-core
//!
//! The deterministic Pulse Engine - THE LOGIC.
//!
//! Computes a project "pulse" from an in-memory snapshot of extracted
//! entities: per-type health, lifecycle stage, ranked next actions, risk,
//! readiness forecast and an extraction directive for a downstream prompt.
//!
//! ## Pipeline
//!
//! ```text
//! velocity ──► health (discovery) ──► stage ──► health (stage) ──► stage
//!                                                     │
//!                 ┌───────────────┬──────────────┬────┴──────────┐
//!                 ▼               ▼              ▼               ▼
//!              actions          risk         forecast       directive
//! ```
//!
//! ## Architectural Constraints
//!
//! - Pure and synchronous: no async, no network, no filesystem
//! - Deterministic: `BTreeMap` ordering, stable sorts, no randomness
//! - Infallible computation: errors exist only at the config boundary
//! - The config is read-only; scaled targets produce a new config value

// =============================================================================
// MODULES
// =============================================================================

pub mod actions;
pub mod config;
pub mod directive;
pub mod engine;
pub mod health;
pub mod risk;
pub mod stage;
pub mod types;
pub mod velocity;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    BusinessDriver, CoverageLevel, EntityDirective, EntityInventory, EntityRecord, EntityType,
    OpenQuestion, PulseError, PulseStage,
};

// =============================================================================
// RE-EXPORTS: Config
// =============================================================================

pub use config::{
    ActionTemplates, CoverageThresholds, DEFAULT_CONFIG_VERSION, GateMetric, GateOperator,
    GateSpec, HealthWeights, PulseConfig, RiskWeights, StageTable, TransitionGates,
    VelocityScaling,
};

// =============================================================================
// RE-EXPORTS: Engine
// =============================================================================

pub use actions::{MAX_ACTIONS, RankedAction, rank_actions};
pub use directive::{ExtractionDirective, render_extraction_directive};
pub use engine::{ProjectPulse, PulseEngine, PulseInput};
pub use health::{EntityHealth, HealthMap, compute_entity_health, compute_health_map};
pub use risk::{Forecast, RiskSummary, assess_risk, forecast};
pub use stage::{GateContext, StageClassifier, StageInfo, evaluate_gate_metric};
pub use velocity::{DEFAULT_WINDOW_DAYS, SignalVelocity, VelocityTrend, scale_target};
