//! # Risk and Forecast
//!
//! Aggregate risk score and forward-looking readiness indices.

use crate::config::RiskWeights;
use crate::health::HealthMap;
use crate::stage::StageInfo;
use crate::types::{OpenQuestion, PulseStage};
use serde::{Deserialize, Serialize};

/// Staleness rate above which a non-empty entity type is a stale cluster.
pub const STALE_CLUSTER_RATE: f64 = 0.3;

/// Minimum count for the single-source heuristic to apply.
pub const SINGLE_SOURCE_MIN_COUNT: u32 = 3;

// =============================================================================
// RISK
// =============================================================================

/// Risk factors and their weighted total.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    pub stale_clusters: u32,
    pub critical_questions: u32,
    /// Approximation: types with several entities and none confirmed. There is
    /// no provenance data, so "nothing confirmed" stands in for "one source".
    pub single_source_types: u32,
    /// Reserved for belief-graph contradiction detection. Always 0 here.
    #[serde(default)]
    pub contradictions: u32,
    /// Weighted sum, capped at 100.
    pub risk_score: f64,
}

impl RiskSummary {
    /// Build a summary from factor counts.
    #[must_use]
    pub fn from_counts(
        stale_clusters: u32,
        critical_questions: u32,
        single_source_types: u32,
        weights: &RiskWeights,
    ) -> Self {
        let contradictions: u32 = 0;
        let raw = f64::from(contradictions) * weights.contradiction
            + f64::from(stale_clusters) * weights.stale_cluster
            + f64::from(critical_questions) * weights.critical_question
            + f64::from(single_source_types) * weights.single_source;

        Self {
            stale_clusters,
            critical_questions,
            single_source_types,
            contradictions,
            risk_score: raw.min(100.0),
        }
    }
}

/// Count risk factors across the health map and open questions.
#[must_use]
pub fn assess_risk(
    health: &HealthMap,
    open_questions: &[OpenQuestion],
    weights: &RiskWeights,
) -> RiskSummary {
    let stale_clusters = health
        .values()
        .filter(|h| h.count > 0 && h.staleness_rate > STALE_CLUSTER_RATE)
        .count() as u32;
    let critical_questions = open_questions.iter().filter(|q| q.is_critical()).count() as u32;
    let single_source_types = health
        .values()
        .filter(|h| h.count >= SINGLE_SOURCE_MIN_COUNT && h.confirmed == 0)
        .count() as u32;

    RiskSummary::from_counts(stale_clusters, critical_questions, single_source_types, weights)
}

// =============================================================================
// FORECAST
// =============================================================================

/// Readiness indices, each in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub prototype_readiness: f64,
    pub spec_completeness: f64,
    pub confidence_index: f64,
    pub coverage_index: f64,
}

/// Compute readiness indices. An empty health map yields the zero forecast.
#[must_use]
pub fn forecast(health: &HealthMap, stage: &StageInfo) -> Forecast {
    if health.is_empty() {
        return Forecast::default();
    }

    let targeted: Vec<f64> = health
        .values()
        .filter(|h| h.target > 0)
        .map(|h| h.coverage_score())
        .collect();
    let coverage_index = mean(&targeted);

    let rates: Vec<f64> = health.values().map(|h| h.confirmation_rate).collect();
    let confidence_index = mean(&rates);

    let prototype_readiness = match stage.current {
        PulseStage::Discovery => stage.progress * 0.5,
        PulseStage::Validation => 0.5 + stage.progress * 0.5,
        PulseStage::Prototype | PulseStage::Specification | PulseStage::Handoff => 1.0,
    };

    Forecast {
        prototype_readiness,
        spec_completeness: coverage_index * 0.4 + confidence_index * 0.6,
        confidence_index,
        coverage_index,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

// =============================================================================
// TESTS
// =============================================================================
