//! # Stage Classification
//!
//! Walks the lifecycle `discovery -> validation -> prototype -> specification
//! -> handoff`, one transition at a time. A transition is taken only when every
//! gate in its list passes; the first transition with an unmet gate stops the
//! walk and becomes the reported progress.
//!
//! ## Known limitation
//!
//! `convergence` and `solution_flow` have no upstream data source yet and
//! always evaluate to 0. With the default gates this means a project cannot
//! move past `prototype`.

use crate::config::{GateMetric, GateSpec, TransitionGates};
use crate::health::{EntityHealth, HealthMap};
use crate::types::{BusinessDriver, EntityType, OpenQuestion, PulseStage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// STAGE INFO
// =============================================================================

/// Classified stage and progress toward the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageInfo {
    pub current: PulseStage,
    /// `gates_met / gates_total` of the pending transition, 1.0 at the end.
    pub progress: f64,
    pub next_stage: Option<PulseStage>,
    /// `[x]`/`[ ]`-prefixed gate lines, in config order.
    pub gates: Vec<String>,
    pub gates_met: u32,
    pub gates_total: u32,
    /// Entity types of the unmet gates holding back the next transition.
    #[serde(default)]
    pub blocking_entity_types: Vec<EntityType>,
}

impl Default for StageInfo {
    fn default() -> Self {
        Self {
            current: PulseStage::Discovery,
            progress: 0.0,
            next_stage: PulseStage::Discovery.next(),
            gates: Vec::new(),
            gates_met: 0,
            gates_total: 0,
            blocking_entity_types: Vec::new(),
        }
    }
}

impl StageInfo {
    /// Whether `entity_type` holds back the next transition.
    #[must_use]
    pub fn is_blocking(&self, entity_type: &EntityType) -> bool {
        self.blocking_entity_types.contains(entity_type)
    }

    /// One-line summary used by the audit log.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.next_stage {
            Some(next) if !self.current.is_terminal() => format!(
                "stage: {} ({}/{} gates toward {})",
                self.current, self.gates_met, self.gates_total, next
            ),
            _ => format!("stage: {} (terminal)", self.current),
        }
    }
}

// =============================================================================
// GATE EVALUATION
// =============================================================================

/// Everything a gate metric may read.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub health: &'a HealthMap,
    pub open_questions: &'a [OpenQuestion],
    pub business_drivers: &'a [BusinessDriver],
}

/// Read the current value of a gate's metric.
///
/// Health-backed metrics of an entity type absent from the map read as 0.
#[must_use]
pub fn evaluate_gate_metric(gate: &GateSpec, ctx: &GateContext<'_>) -> f64 {
    let health = |read: fn(&EntityHealth) -> f64| {
        ctx.health.get(&gate.entity_type).map_or(0.0, read)
    };

    match gate.metric {
        GateMetric::Count => health(|h| f64::from(h.count)),
        GateMetric::Confirmed => health(|h| f64::from(h.confirmed)),
        GateMetric::Stale => health(|h| f64::from(h.stale)),
        GateMetric::ConfirmationRate => health(|h| h.confirmation_rate),
        GateMetric::StalenessRate => health(|h| h.staleness_rate),
        GateMetric::Quality => health(|h| h.quality),
        GateMetric::Freshness => health(|h| h.freshness),
        GateMetric::HealthScore => health(|h| h.health_score),
        GateMetric::CriticalOpen => {
            ctx.open_questions.iter().filter(|q| q.is_critical()).count() as f64
        }
        GateMetric::PainCount => ctx.business_drivers.iter().filter(|d| d.is_pain()).count() as f64,
        GateMetric::GoalCount => ctx.business_drivers.iter().filter(|d| d.is_goal()).count() as f64,
        // No upstream source yet.
        GateMetric::Convergence | GateMetric::SolutionFlow => 0.0,
    }
}

/// Render a gate as a checklist line.
#[must_use]
pub fn format_gate(gate: &GateSpec, actual: f64, passed: bool) -> String {
    let mark = if passed { "x" } else { " " };
    format!(
        "[{mark}] {} (current: {}, required {} {})",
        gate.label,
        format_number(actual),
        gate.operator.symbol(),
        format_number(gate.threshold)
    )
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

// =============================================================================
// STAGE CLASSIFIER
// =============================================================================

/// Evaluates transition gates in lifecycle order.
pub struct StageClassifier<'a> {
    gates: &'a TransitionGates,
}

impl<'a> StageClassifier<'a> {
    #[must_use]
    pub fn new(gates: &'a TransitionGates) -> Self {
        Self { gates }
    }

    /// Determine the current stage.
    ///
    /// Starts at discovery and advances while every gate of the outgoing
    /// transition passes. Stops at the first transition with an unmet gate.
    #[must_use]
    pub fn classify(&self, ctx: &GateContext<'_>) -> StageInfo {
        let mut current = PulseStage::Discovery;
        let mut last_passed: Vec<String> = Vec::new();

        loop {
            let (Some(gates), Some(next)) = (self.gates.leaving(current), current.next()) else {
                let total = last_passed.len() as u32;
                return StageInfo {
                    current,
                    progress: 1.0,
                    next_stage: None,
                    gates: last_passed,
                    gates_met: total,
                    gates_total: total,
                    blocking_entity_types: Vec::new(),
                };
            };

            let mut lines = Vec::with_capacity(gates.len());
            let mut blocking = BTreeSet::new();
            let mut met: u32 = 0;

            for gate in gates {
                let actual = evaluate_gate_metric(gate, ctx);
                let passed = gate.operator.apply(actual, gate.threshold);
                if passed {
                    met = met.saturating_add(1);
                } else {
                    blocking.insert(gate.entity_type.clone());
                }
                lines.push(format_gate(gate, actual, passed));
            }

            if blocking.is_empty() {
                last_passed = lines;
                current = next;
                continue;
            }

            let total = gates.len() as u32;
            return StageInfo {
                current,
                progress: f64::from(met) / f64::from(total),
                next_stage: Some(next),
                gates: lines,
                gates_met: met,
                gates_total: total,
                blocking_entity_types: blocking.into_iter().collect(),
            };
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
