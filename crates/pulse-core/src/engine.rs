//! # Pulse Engine
//!
//! Orchestrates one pulse computation:
//!
//! 1. Scale targets for signal velocity (copy of the config, never in place)
//! 2. Score entity health assuming `discovery`
//! 3. Classify the stage from that health
//! 4. If the stage is not `discovery`, re-score health against the classified
//!    stage's weights and targets and classify once more
//! 5. Rank actions, assess risk, forecast, render the extraction directive
//!
//! Step 4 is at most two passes, never more: it is two sequential calls, not
//! a fixpoint loop. If the second classification disagrees with the first,
//! the second wins and the disagreement is recorded in `rules_fired`.
//!
//! The computation is synchronous and infallible. Callers gather inputs and
//! substitute defaults for anything that failed to load before calling in.

use crate::actions::{RankedAction, rank_actions};
use crate::config::PulseConfig;
use crate::directive::{ExtractionDirective, render_extraction_directive};
use crate::health::{HealthMap, compute_health_map};
use crate::risk::{Forecast, RiskSummary, assess_risk, forecast};
use crate::stage::{GateContext, StageClassifier, StageInfo};
use crate::types::{BusinessDriver, EntityInventory, OpenQuestion, PulseStage};
use crate::velocity::{SignalVelocity, VelocityTrend};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// =============================================================================
// INPUT / OUTPUT
// =============================================================================

/// Everything the engine reads for one project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PulseInput {
    /// Absent ids are filled in at the boundary.
    #[serde(default)]
    pub project_id: String,
    #[serde(default, alias = "entities")]
    pub entity_inventory: EntityInventory,
    #[serde(default)]
    pub open_questions: Vec<OpenQuestion>,
    #[serde(default)]
    pub business_drivers: Vec<BusinessDriver>,
    /// Recent signal velocity; `None` leaves targets unscaled.
    #[serde(default)]
    pub velocity: Option<SignalVelocity>,
}

impl PulseInput {
    /// Empty input for a project: every configured type resolves to missing.
    #[must_use]
    pub fn empty(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }
}

/// One pulse snapshot. Not mutated after it is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectPulse {
    pub stage: StageInfo,
    pub health: HealthMap,
    pub actions: Vec<RankedAction>,
    pub risks: RiskSummary,
    pub forecast: Forecast,
    pub extraction_directive: ExtractionDirective,
    pub config_version: String,
    #[serde(default)]
    pub velocity: Option<SignalVelocity>,
    /// One line per decision, in the order decisions were made.
    pub rules_fired: Vec<String>,
}

// =============================================================================
// ENGINE
// =============================================================================

/// Pure pulse computation over an immutable config.
#[derive(Debug, Clone, Default)]
pub struct PulseEngine {
    config: PulseConfig,
}

impl PulseEngine {
    #[must_use]
    pub fn new(config: PulseConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &PulseConfig {
        &self.config
    }

    /// Compute the pulse for one project.
    #[must_use]
    pub fn compute(&self, input: &PulseInput) -> ProjectPulse {
        let mut rules_fired = Vec::new();

        let config: Cow<'_, PulseConfig> = match input.velocity {
            Some(velocity) => {
                rules_fired.push(format!(
                    "velocity: {} ({} -> {} signals over {} days)",
                    velocity.trend, velocity.first_half, velocity.second_half, velocity.window_days
                ));
                match velocity.trend {
                    VelocityTrend::Steady => Cow::Borrowed(&self.config),
                    VelocityTrend::Accelerating | VelocityTrend::Stalling => {
                        tracing::debug!(trend = %velocity.trend, "scaling entity targets");
                        Cow::Owned(self.config.with_scaled_targets(velocity.trend))
                    }
                }
            }
            None => {
                rules_fired.push("velocity: steady (no signal data)".to_string());
                Cow::Borrowed(&self.config)
            }
        };

        let classifier = StageClassifier::new(&config.transition_gates);
        let classify = |health: &HealthMap| {
            classifier.classify(&GateContext {
                health,
                open_questions: &input.open_questions,
                business_drivers: &input.business_drivers,
            })
        };

        // Pass 1: discovery assumption.
        let health = compute_health_map(
            &input.entity_inventory,
            PulseStage::Discovery,
            &config,
            &mut rules_fired,
        );
        let mut stage = classify(&health);
        rules_fired.push(stage.summary());

        // Pass 2: re-score against the classified stage.
        let health = if stage.current == PulseStage::Discovery {
            health
        } else {
            let scored_for = stage.current;
            rules_fired.push(format!("recompute: health re-scored for {scored_for}"));
            let rescored =
                compute_health_map(&input.entity_inventory, scored_for, &config, &mut rules_fired);
            stage = classify(&rescored);
            if stage.current != scored_for {
                tracing::debug!(
                    project_id = %input.project_id,
                    first = %scored_for,
                    second = %stage.current,
                    "stage changed on second pass"
                );
                rules_fired.push(format!(
                    "stage: reclassified {scored_for} -> {} on second pass",
                    stage.current
                ));
            }
            rescored
        };

        let actions = rank_actions(
            &health,
            &stage,
            &input.open_questions,
            &config.action_templates,
        );
        rules_fired.push(match actions.first() {
            Some(top) => format!(
                "actions: {} ranked, top impact {:.1}",
                actions.len(),
                top.impact_score
            ),
            None => "actions: none".to_string(),
        });

        let risks = assess_risk(&health, &input.open_questions, &config.risk_weights);
        rules_fired.push(format!(
            "risk: score {:.1} ({} stale clusters, {} critical questions, {} single-source types)",
            risks.risk_score, risks.stale_clusters, risks.critical_questions, risks.single_source_types
        ));

        let forecast = forecast(&health, &stage);
        rules_fired.push(format!(
            "forecast: prototype {:.2}, spec {:.2}",
            forecast.prototype_readiness, forecast.spec_completeness
        ));

        let extraction_directive = render_extraction_directive(&health, stage.current);

        tracing::debug!(
            project_id = %input.project_id,
            stage = %stage.current,
            risk_score = risks.risk_score,
            actions = actions.len(),
            "pulse computed"
        );

        ProjectPulse {
            stage,
            health,
            actions,
            risks,
            forecast,
            extraction_directive,
            config_version: config.version.clone(),
            velocity: input.velocity,
            rules_fired,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
