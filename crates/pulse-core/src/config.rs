//! # Pulse Configuration
//!
//! Versioned, immutable scoring configuration: per-stage health weights,
//! per-stage entity targets, stage-transition gates, risk weights, action
//! sentence templates, coverage thresholds and velocity scaling factors.
//!
//! A config arriving from an external store is validated once with
//! [`PulseConfig::validate`]; after that the engine only reads it. Scaling
//! targets for velocity produces a new value ([`PulseConfig::with_scaled_targets`])
//! so concurrent computations sharing a base config never observe a change.

use crate::types::{EntityType, PulseError, PulseStage};
use crate::velocity::{VelocityTrend, scale_target};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Version tag of the built-in configuration.
pub const DEFAULT_CONFIG_VERSION: &str = "pulse-defaults-v1";

/// Tolerance used when checking that stage weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

// =============================================================================
// STAGE TABLE
// =============================================================================

/// One value per [`PulseStage`].
///
/// Lookup is an exhaustive match, so a new stage cannot be added without
/// giving it a value here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTable<T> {
    pub discovery: T,
    pub validation: T,
    pub prototype: T,
    pub specification: T,
    pub handoff: T,
}

impl<T> StageTable<T> {
    /// Get the value for a stage.
    #[must_use]
    pub fn get(&self, stage: PulseStage) -> &T {
        match stage {
            PulseStage::Discovery => &self.discovery,
            PulseStage::Validation => &self.validation,
            PulseStage::Prototype => &self.prototype,
            PulseStage::Specification => &self.specification,
            PulseStage::Handoff => &self.handoff,
        }
    }

    /// Iterate `(stage, value)` pairs in lifecycle order.
    pub fn iter(&self) -> impl Iterator<Item = (PulseStage, &T)> {
        PulseStage::ALL.into_iter().map(move |stage| (stage, self.get(stage)))
    }

    /// Build a new table by applying `f` to every stage's value.
    #[must_use]
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> StageTable<U> {
        StageTable {
            discovery: f(&self.discovery),
            validation: f(&self.validation),
            prototype: f(&self.prototype),
            specification: f(&self.specification),
            handoff: f(&self.handoff),
        }
    }
}

// =============================================================================
// HEALTH WEIGHTS
// =============================================================================

/// Contribution of each factor to an entity type's health score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthWeights {
    pub coverage: f64,
    pub confirmation: f64,
    pub quality: f64,
    pub freshness: f64,
}

impl HealthWeights {
    #[must_use]
    pub const fn new(coverage: f64, confirmation: f64, quality: f64, freshness: f64) -> Self {
        Self {
            coverage,
            confirmation,
            quality,
            freshness,
        }
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.coverage + self.confirmation + self.quality + self.freshness
    }

    fn components(&self) -> [(&'static str, f64); 4] {
        [
            ("coverage", self.coverage),
            ("confirmation", self.confirmation),
            ("quality", self.quality),
            ("freshness", self.freshness),
        ]
    }
}

// =============================================================================
// GATES
// =============================================================================

/// Metric a gate reads.
///
/// Health-backed metrics read the gate's entity type from the health map;
/// the remaining ones are answered from the engine's other inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateMetric {
    Count,
    Confirmed,
    Stale,
    ConfirmationRate,
    StalenessRate,
    Quality,
    Freshness,
    HealthScore,
    /// Open questions with `critical` priority.
    CriticalOpen,
    /// Business drivers of type `pain`.
    PainCount,
    /// Business drivers of type `goal`.
    GoalCount,
    /// Prototype convergence. No upstream source yet: always 0.
    Convergence,
    /// Solution-flow readiness. No upstream source yet: always 0.
    SolutionFlow,
}

impl GateMetric {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GateMetric::Count => "count",
            GateMetric::Confirmed => "confirmed",
            GateMetric::Stale => "stale",
            GateMetric::ConfirmationRate => "confirmation_rate",
            GateMetric::StalenessRate => "staleness_rate",
            GateMetric::Quality => "quality",
            GateMetric::Freshness => "freshness",
            GateMetric::HealthScore => "health_score",
            GateMetric::CriticalOpen => "critical_open",
            GateMetric::PainCount => "pain_count",
            GateMetric::GoalCount => "goal_count",
            GateMetric::Convergence => "convergence",
            GateMetric::SolutionFlow => "solution_flow",
        }
    }
}

/// Comparison applied as `actual <op> threshold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateOperator {
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "==")]
    Eq,
}

impl GateOperator {
    /// Absolute tolerance for `==`.
    pub const EQ_TOLERANCE: f64 = 1e-9;

    /// Evaluate `actual <op> threshold`.
    #[must_use]
    pub fn apply(&self, actual: f64, threshold: f64) -> bool {
        match self {
            GateOperator::Ge => actual >= threshold,
            GateOperator::Le => actual <= threshold,
            GateOperator::Gt => actual > threshold,
            GateOperator::Lt => actual < threshold,
            GateOperator::Eq => (actual - threshold).abs() <= Self::EQ_TOLERANCE,
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            GateOperator::Ge => ">=",
            GateOperator::Le => "<=",
            GateOperator::Gt => ">",
            GateOperator::Lt => "<",
            GateOperator::Eq => "==",
        }
    }
}

/// One testable condition of a stage transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSpec {
    pub entity_type: EntityType,
    pub metric: GateMetric,
    pub operator: GateOperator,
    pub threshold: f64,
    pub label: String,
}

impl GateSpec {
    #[must_use]
    pub fn new(
        entity_type: impl Into<String>,
        metric: GateMetric,
        operator: GateOperator,
        threshold: f64,
        label: impl Into<String>,
    ) -> Self {
        Self {
            entity_type: EntityType::new(entity_type),
            metric,
            operator,
            threshold,
            label: label.into(),
        }
    }
}

/// Ordered gate lists, one per stage transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionGates {
    #[serde(rename = "discovery→validation", default)]
    pub discovery_to_validation: Vec<GateSpec>,
    #[serde(rename = "validation→prototype", default)]
    pub validation_to_prototype: Vec<GateSpec>,
    #[serde(rename = "prototype→specification", default)]
    pub prototype_to_specification: Vec<GateSpec>,
    #[serde(rename = "specification→handoff", default)]
    pub specification_to_handoff: Vec<GateSpec>,
}

impl TransitionGates {
    /// Gates guarding the move out of `from`; `None` for the terminal stage.
    #[must_use]
    pub fn leaving(&self, from: PulseStage) -> Option<&[GateSpec]> {
        match from {
            PulseStage::Discovery => Some(&self.discovery_to_validation),
            PulseStage::Validation => Some(&self.validation_to_prototype),
            PulseStage::Prototype => Some(&self.prototype_to_specification),
            PulseStage::Specification => Some(&self.specification_to_handoff),
            PulseStage::Handoff => None,
        }
    }

    fn all(&self) -> impl Iterator<Item = &GateSpec> {
        self.discovery_to_validation
            .iter()
            .chain(&self.validation_to_prototype)
            .chain(&self.prototype_to_specification)
            .chain(&self.specification_to_handoff)
    }
}

// =============================================================================
// RISK, TEMPLATES, THRESHOLDS, VELOCITY
// =============================================================================

/// Points added to the risk score per occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskWeights {
    pub contradiction: f64,
    pub stale_cluster: f64,
    pub critical_question: f64,
    pub single_source: f64,
}

/// Sentence templates for recommended actions.
///
/// Placeholders: `{entity}`, `{count}`, `{target}`, `{confirmed}`, `{stale}`,
/// `{missing}`, `{quality}` (percent), `{critical}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTemplates {
    pub grow: String,
    pub confirm: String,
    pub enrich: String,
    pub merge_only: String,
    pub refresh_stale: String,
    pub critical_questions: String,
}

/// Fractions of the stage target separating coverage levels.
///
/// `ratio < thin` is thin, `< growing` is growing, `< adequate` is adequate,
/// anything at or above `adequate` is saturated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageThresholds {
    pub thin: f64,
    pub growing: f64,
    pub adequate: f64,
}

/// Target multipliers applied for non-steady velocity trends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityScaling {
    pub accelerating: f64,
    pub stalling: f64,
}

impl Default for VelocityScaling {
    fn default() -> Self {
        Self {
            accelerating: 1.20,
            stalling: 0.85,
        }
    }
}

// =============================================================================
// PULSE CONFIG
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PulseConfig {
    pub version: String,
    pub stage_health_weights: StageTable<HealthWeights>,
    pub entity_targets: StageTable<BTreeMap<EntityType, u32>>,
    pub transition_gates: TransitionGates,
    pub risk_weights: RiskWeights,
    pub action_templates: ActionTemplates,
    pub coverage_thresholds: CoverageThresholds,
    #[serde(default)]
    pub velocity: VelocityScaling,
}

impl PulseConfig {
    /// Health weights for a stage.
    #[must_use]
    pub fn weights_for(&self, stage: PulseStage) -> &HealthWeights {
        self.stage_health_weights.get(stage)
    }

    /// Target count for an entity type at a stage (0 when unconfigured).
    #[must_use]
    pub fn target_for(&self, stage: PulseStage, entity_type: &EntityType) -> u32 {
        self.entity_targets
            .get(stage)
            .get(entity_type)
            .copied()
            .unwrap_or(0)
    }

    /// Every entity type that has a target in any stage.
    #[must_use]
    pub fn targeted_entity_types(&self) -> BTreeSet<EntityType> {
        self.entity_targets
            .iter()
            .flat_map(|(_, targets)| targets.keys().cloned())
            .collect()
    }

    /// Copy of this config with every stage's targets scaled for `trend`.
    ///
    /// `self` is left untouched.
    #[must_use]
    pub fn with_scaled_targets(&self, trend: VelocityTrend) -> Self {
        let scaling = self.velocity;
        let entity_targets = self.entity_targets.map(|targets| {
            targets
                .iter()
                .map(|(entity_type, &target)| {
                    (entity_type.clone(), scale_target(target, trend, &scaling))
                })
                .collect()
        });

        Self {
            entity_targets,
            ..self.clone()
        }
    }

    /// Check ranges and orderings.
    ///
    /// Called once at load time so that the engine never has to guard against
    /// a malformed config while computing.
    pub fn validate(&self) -> Result<(), PulseError> {
        if self.version.trim().is_empty() {
            return Err(invalid("version must not be empty"));
        }

        for (stage, weights) in self.stage_health_weights.iter() {
            for (name, value) in weights.components() {
                if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                    return Err(invalid(format!(
                        "{stage} weight '{name}' must be within [0, 1], got {value}"
                    )));
                }
            }
            let sum = weights.sum();
            if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(invalid(format!(
                    "{stage} weights must sum to 1.0, got {sum}"
                )));
            }
        }

        let t = &self.coverage_thresholds;
        if !(t.thin.is_finite() && t.growing.is_finite() && t.adequate.is_finite()) {
            return Err(invalid("coverage thresholds must be finite"));
        }
        if t.thin <= 0.0 || t.thin >= t.growing || t.growing >= t.adequate {
            return Err(invalid(format!(
                "coverage thresholds must satisfy 0 < thin < growing < adequate, got {} / {} / {}",
                t.thin, t.growing, t.adequate
            )));
        }

        let r = &self.risk_weights;
        for (name, value) in [
            ("contradiction", r.contradiction),
            ("stale_cluster", r.stale_cluster),
            ("critical_question", r.critical_question),
            ("single_source", r.single_source),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!(
                    "risk weight '{name}' must be a non-negative number, got {value}"
                )));
            }
        }

        for gate in self.transition_gates.all() {
            if !gate.threshold.is_finite() {
                return Err(invalid(format!(
                    "gate '{}' has a non-finite threshold",
                    gate.label
                )));
            }
            if gate.label.trim().is_empty() {
                return Err(invalid(format!(
                    "gate on {}.{} has an empty label",
                    gate.entity_type,
                    gate.metric.as_str()
                )));
            }
        }

        let a = &self.action_templates;
        for (name, template) in [
            ("grow", &a.grow),
            ("confirm", &a.confirm),
            ("enrich", &a.enrich),
            ("merge_only", &a.merge_only),
            ("refresh_stale", &a.refresh_stale),
            ("critical_questions", &a.critical_questions),
        ] {
            if template.trim().is_empty() {
                return Err(invalid(format!("action template '{name}' is empty")));
            }
        }

        let v = &self.velocity;
        if !(v.accelerating.is_finite() && v.accelerating > 0.0)
            || !(v.stalling.is_finite() && v.stalling > 0.0)
        {
            return Err(invalid("velocity scaling factors must be positive"));
        }

        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> PulseError {
    PulseError::InvalidConfig(msg.into())
}

// =============================================================================
// DEFAULT CONFIG
// =============================================================================

/// Entity types covered by the built-in targets, in table column order.
pub const DEFAULT_ENTITY_TYPES: [&str; 9] = [
    "feature",
    "persona",
    "workflow",
    "workflow_step",
    "business_driver",
    "stakeholder",
    "data_entity",
    "constraint",
    "competitor",
];

fn targets(counts: [u32; 9]) -> BTreeMap<EntityType, u32> {
    DEFAULT_ENTITY_TYPES
        .iter()
        .zip(counts)
        .map(|(name, count)| (EntityType::new(*name), count))
        .collect()
}

impl Default for PulseConfig {
    fn default() -> Self {
        use GateMetric as M;
        use GateOperator::{Ge, Le};

        Self {
            version: DEFAULT_CONFIG_VERSION.to_string(),
            stage_health_weights: StageTable {
                discovery: HealthWeights::new(0.50, 0.10, 0.20, 0.20),
                validation: HealthWeights::new(0.35, 0.30, 0.20, 0.15),
                prototype: HealthWeights::new(0.25, 0.35, 0.25, 0.15),
                specification: HealthWeights::new(0.20, 0.40, 0.30, 0.10),
                handoff: HealthWeights::new(0.15, 0.45, 0.30, 0.10),
            },
            entity_targets: StageTable {
                discovery: targets([5, 2, 2, 6, 3, 2, 3, 2, 2]),
                validation: targets([8, 3, 3, 10, 5, 3, 5, 3, 3]),
                prototype: targets([12, 4, 4, 15, 6, 4, 8, 5, 3]),
                specification: targets([15, 5, 5, 20, 8, 5, 10, 6, 4]),
                handoff: targets([15, 5, 5, 20, 8, 5, 10, 6, 4]),
            },
            transition_gates: TransitionGates {
                discovery_to_validation: vec![
                    GateSpec::new("feature", M::Count, Ge, 5.0, "At least 5 features identified"),
                    GateSpec::new("persona", M::Count, Ge, 2.0, "At least 2 personas identified"),
                    GateSpec::new(
                        "business_driver",
                        M::PainCount,
                        Ge,
                        1.0,
                        "At least 1 pain point captured",
                    ),
                    GateSpec::new("workflow", M::Count, Ge, 1.0, "At least 1 workflow mapped"),
                ],
                validation_to_prototype: vec![
                    GateSpec::new(
                        "feature",
                        M::ConfirmationRate,
                        Ge,
                        0.5,
                        "Half of the features confirmed",
                    ),
                    GateSpec::new("persona", M::Confirmed, Ge, 1.0, "At least 1 persona confirmed"),
                    GateSpec::new(
                        "business_driver",
                        M::GoalCount,
                        Ge,
                        1.0,
                        "At least 1 business goal captured",
                    ),
                    GateSpec::new(
                        "workflow_step",
                        M::Count,
                        Ge,
                        6.0,
                        "At least 6 workflow steps mapped",
                    ),
                    GateSpec::new(
                        "questions",
                        M::CriticalOpen,
                        Le,
                        0.0,
                        "No critical open questions",
                    ),
                ],
                prototype_to_specification: vec![
                    GateSpec::new(
                        "prototype",
                        M::Convergence,
                        Ge,
                        0.7,
                        "Prototype feedback has converged",
                    ),
                    GateSpec::new(
                        "feature",
                        M::ConfirmationRate,
                        Ge,
                        0.7,
                        "70% of features confirmed",
                    ),
                    GateSpec::new(
                        "data_entity",
                        M::Count,
                        Ge,
                        5.0,
                        "At least 5 data entities modelled",
                    ),
                ],
                specification_to_handoff: vec![
                    GateSpec::new(
                        "solution_flow",
                        M::SolutionFlow,
                        Ge,
                        0.8,
                        "Solution flow is ready for handoff",
                    ),
                    GateSpec::new(
                        "constraint",
                        M::Confirmed,
                        Ge,
                        3.0,
                        "At least 3 constraints confirmed",
                    ),
                    GateSpec::new(
                        "stakeholder",
                        M::ConfirmationRate,
                        Ge,
                        0.7,
                        "70% of stakeholders confirmed",
                    ),
                ],
            },
            risk_weights: RiskWeights {
                contradiction: 20.0,
                stale_cluster: 10.0,
                critical_question: 15.0,
                single_source: 8.0,
            },
            action_templates: ActionTemplates {
                grow: "Capture more {entity} ({count} of {target}, {missing} to go)".to_string(),
                confirm: "Confirm {entity} with the client ({confirmed} of {count} confirmed)"
                    .to_string(),
                enrich: "Enrich {entity} with more detail (quality {quality}%)".to_string(),
                merge_only: "Merge duplicate {entity} instead of adding new ones ({count} of {target})"
                    .to_string(),
                refresh_stale: "Refresh {stale} stale {entity}".to_string(),
                critical_questions: "Resolve {critical} critical open question(s)".to_string(),
            },
            coverage_thresholds: CoverageThresholds {
                thin: 0.3,
                growing: 0.7,
                adequate: 1.0,
            },
            velocity: VelocityScaling::default(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PulseConfig::default().validate().expect("default config");
    }

    #[test]
    fn default_weights_sum_to_one() {
        let config = PulseConfig::default();
        for (stage, weights) in config.stage_health_weights.iter() {
            assert!(
                (weights.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE,
                "{stage} weights sum to {}",
                weights.sum()
            );
        }
    }

    #[test]
    fn weights_not_summing_to_one_rejected() {
        let mut config = PulseConfig::default();
        config.stage_health_weights.prototype.quality = 0.5;
        let err = config.validate().expect_err("invalid");
        assert!(matches!(err, PulseError::InvalidConfig(msg) if msg.contains("prototype")));
    }

    #[test]
    fn thresholds_must_increase() {
        let mut config = PulseConfig::default();
        config.coverage_thresholds.growing = 0.3;
        assert!(config.validate().is_err());

        let mut config = PulseConfig::default();
        config.coverage_thresholds.thin = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_risk_weight_rejected() {
        let mut config = PulseConfig::default();
        config.risk_weights.single_source = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_template_rejected() {
        let mut config = PulseConfig::default();
        config.action_templates.enrich = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn target_for_unconfigured_type_is_zero() {
        let config = PulseConfig::default();
        assert_eq!(
            config.target_for(PulseStage::Discovery, &EntityType::new("vision")),
            0
        );
        assert_eq!(
            config.target_for(PulseStage::Validation, &EntityType::new("feature")),
            8
        );
    }

    #[test]
    fn scaled_targets_leave_original_untouched() {
        let base = PulseConfig::default();
        let scaled = base.with_scaled_targets(VelocityTrend::Stalling);

        let feature = EntityType::new("feature");
        assert_eq!(base.target_for(PulseStage::Validation, &feature), 8);
        assert_eq!(scaled.target_for(PulseStage::Validation, &feature), 6);
        // Every stage is scaled, not just the current one.
        assert_eq!(scaled.target_for(PulseStage::Handoff, &feature), 12);
        assert_eq!(scaled.version, base.version);
    }

    #[test]
    fn transition_keys_use_arrow_notation() {
        let json = serde_json::to_value(PulseConfig::default()).expect("serialize");
        let gates = &json["transition_gates"];
        assert!(gates.get("discovery→validation").is_some());
        assert!(gates.get("specification→handoff").is_some());
        assert_eq!(gates["discovery→validation"][0]["operator"], ">=");
        assert_eq!(gates["discovery→validation"][0]["metric"], "count");
    }

    #[test]
    fn unknown_metric_fails_at_load() {
        let json = r#"{"entity_type":"feature","metric":"vibes","operator":">=","threshold":1,"label":"x"}"#;
        assert!(serde_json::from_str::<GateSpec>(json).is_err());
    }

    #[test]
    fn operator_apply() {
        assert!(GateOperator::Ge.apply(5.0, 5.0));
        assert!(!GateOperator::Gt.apply(5.0, 5.0));
        assert!(GateOperator::Le.apply(0.0, 0.0));
        assert!(GateOperator::Lt.apply(1.0, 2.0));
        assert!(GateOperator::Eq.apply(0.1 + 0.2, 0.3));
        assert!(!GateOperator::Eq.apply(1.0, 2.0));
    }

    #[test]
    fn terminal_stage_has_no_outgoing_gates() {
        let gates = PulseConfig::default().transition_gates;
        assert!(gates.leaving(PulseStage::Handoff).is_none());
        assert_eq!(gates.leaving(PulseStage::Discovery).map(<[_]>::len), Some(4));
    }
}
