//! # Validation Tier Tests (T0-T6)
//!
//! If ANY tier fails, the pulse is NOT reproducible.
//!
//! ## Tiers
//! - T0: Entity Health
//! - T1: Stage Gates
//! - T2: Action Ranking
//! - T3: Risk and Forecast
//! - T4: Signal Velocity
//! - T5: Determinism
//! - T6: Schema Fidelity

use pulse_core::{
    BusinessDriver, CoverageLevel, EntityDirective, EntityRecord, EntityType, GateMetric,
    GateOperator, GateSpec, OpenQuestion, ProjectPulse, PulseConfig, PulseEngine, PulseInput,
    PulseStage,
};

fn records(confirmed: usize, unconfirmed: usize, stale: usize) -> Vec<EntityRecord> {
    let mut out = vec![EntityRecord::new("confirmed_consultant", false); confirmed];
    out.extend(vec![EntityRecord::new("ai_generated", false); unconfirmed]);
    for record in out.iter_mut().take(stale) {
        record.is_stale = true;
    }
    out
}

/// A project mid-way through validation.
fn validation_project() -> PulseInput {
    let mut input = PulseInput::empty("acme-portal");
    let inventory = &mut input.entity_inventory;
    inventory.insert(EntityType::new("feature"), records(3, 4, 1));
    inventory.insert(EntityType::new("persona"), records(1, 2, 0));
    inventory.insert(EntityType::new("workflow"), records(0, 2, 0));
    inventory.insert(EntityType::new("workflow_step"), records(0, 4, 3));
    inventory.insert(EntityType::new("stakeholder"), records(0, 3, 0));
    input.business_drivers = vec![BusinessDriver::new("pain"), BusinessDriver::new("kpi")];
    input.open_questions = vec![OpenQuestion::new("critical"), OpenQuestion::new("medium")];
    input
}

// =============================================================================
// TIER T0: ENTITY HEALTH
// =============================================================================

mod t0_entity_health {
    use super::*;
    use pulse_core::health::decide_directive;

    /// T0.1: Every empty type is missing, grows and has zero rates.
    #[test]
    fn empty_types_are_missing() {
        let pulse = PulseEngine::default().compute(&validation_project());

        for health in pulse.health.values().filter(|h| h.count == 0) {
            assert_eq!(health.coverage, CoverageLevel::Missing);
            assert_eq!(health.directive, EntityDirective::Grow);
            assert_eq!(health.confirmation_rate, 0.0);
            assert_eq!(health.staleness_rate, 0.0);
        }
    }

    /// T0.2: The directive table is total and order-sensitive.
    #[test]
    fn directive_table_boundaries() {
        use CoverageLevel::*;
        use EntityDirective::*;

        let cases = [
            // (coverage, confirmation_rate, quality, expected)
            (Saturated, 0.0, 0.0, MergeOnly),
            (Saturated, 0.39, 0.2, MergeOnly),
            (Saturated, 1.0, 1.0, MergeOnly),
            (Adequate, 0.0, 0.0, Confirm),
            (Adequate, 0.39, 0.99, Confirm),
            (Adequate, 0.4, 0.0, Enrich),
            (Adequate, 0.4, 0.49, Enrich),
            (Adequate, 0.4, 0.5, Enrich),
            (Adequate, 0.69, 0.49, Enrich),
            (Adequate, 0.69, 0.9, Enrich),
            (Adequate, 0.7, 0.0, Stable),
            (Adequate, 0.7, 0.49, Stable),
            (Adequate, 1.0, 1.0, Stable),
            (Growing, 0.0, 0.0, Grow),
            (Growing, 1.0, 1.0, Grow),
            (Thin, 0.5, 0.5, Grow),
            (Missing, 0.0, 0.4, Grow),
        ];

        for (coverage, rate, quality, expected) in cases {
            assert_eq!(
                decide_directive(coverage, rate, quality),
                expected,
                "{coverage} rate={rate} quality={quality}"
            );
        }
    }

    /// T0.3: One audit line per entity type per pass.
    #[test]
    fn one_rule_per_type_per_pass() {
        let pulse = PulseEngine::default().compute(&PulseInput::empty("quiet"));
        let health_rules = pulse
            .rules_fired
            .iter()
            .filter(|r| r.starts_with("health["))
            .count();
        assert_eq!(health_rules, pulse.health.len());
    }

    /// T0.4: Scores stay within range.
    #[test]
    fn health_scores_in_range() {
        let pulse = PulseEngine::default().compute(&validation_project());
        for health in pulse.health.values() {
            assert!((0.0..=100.0).contains(&health.health_score));
            assert!((0.0..=1.0).contains(&health.quality));
            assert!((0.0..=1.0).contains(&health.freshness));
        }
    }
}

// =============================================================================
// TIER T1: STAGE GATES
// =============================================================================

mod t1_stage_gates {
    use super::*;

    /// T1.1: Two-gate transition with one gate met stays in discovery.
    #[test]
    fn one_of_two_gates() {
        let mut config = PulseConfig::default();
        config.transition_gates.discovery_to_validation = vec![
            GateSpec::new("feature", GateMetric::Count, GateOperator::Ge, 5.0, "5 features"),
            GateSpec::new("persona", GateMetric::Count, GateOperator::Ge, 2.0, "2 personas"),
        ];
        config.validate().expect("config");

        let mut input = PulseInput::empty("gates");
        input
            .entity_inventory
            .insert(EntityType::new("feature"), records(0, 5, 0));
        input
            .entity_inventory
            .insert(EntityType::new("persona"), records(0, 1, 0));

        let pulse = PulseEngine::new(config).compute(&input);
        assert_eq!(pulse.stage.current, PulseStage::Discovery);
        assert_eq!(pulse.stage.gates_met, 1);
        assert_eq!(pulse.stage.gates_total, 2);
        assert!(pulse.stage.gates[1].starts_with("[ ]"));
    }

    /// T1.2: Default gates move a qualifying project into validation.
    #[test]
    fn default_gates_reach_validation() {
        let pulse = PulseEngine::default().compute(&validation_project());
        assert_eq!(pulse.stage.current, PulseStage::Validation);
        assert_eq!(pulse.stage.next_stage, Some(PulseStage::Prototype));
        assert!(pulse.stage.gates_met < pulse.stage.gates_total);
        assert!(
            pulse
                .stage
                .blocking_entity_types
                .contains(&EntityType::new("questions"))
        );
    }

    /// T1.3: Known limitation: convergence and solution_flow always read 0,
    /// so the default gates never let a project past prototype.
    #[test]
    fn unwired_metrics_cap_stage_at_prototype() {
        let mut input = PulseInput::empty("saturated");
        for name in pulse_core::config::DEFAULT_ENTITY_TYPES {
            input
                .entity_inventory
                .insert(EntityType::new(name), records(50, 0, 0));
        }
        input.business_drivers = vec![BusinessDriver::new("pain"), BusinessDriver::new("goal")];

        let pulse = PulseEngine::default().compute(&input);
        assert_eq!(pulse.stage.current, PulseStage::Prototype);
        assert!(pulse.stage.current < PulseStage::Specification);
        assert_eq!(pulse.stage.gates_met, 2);
        assert_eq!(pulse.stage.gates_total, 3);
        assert!(pulse.stage.gates[0].starts_with("[ ] Prototype feedback has converged"));
    }

    /// T1.4: With no gates at all the walk ends at handoff.
    #[test]
    fn no_gates_reach_handoff() {
        let mut config = PulseConfig::default();
        config.transition_gates = pulse_core::TransitionGates::default();

        let pulse = PulseEngine::new(config).compute(&PulseInput::empty("free"));
        assert_eq!(pulse.stage.current, PulseStage::Handoff);
        assert_eq!(pulse.stage.next_stage, None);
        assert_eq!(pulse.stage.progress, 1.0);
        assert_eq!(pulse.forecast.prototype_readiness, 1.0);
    }
}

// =============================================================================
// TIER T2: ACTION RANKING
// =============================================================================

mod t2_action_ranking {
    use super::*;

    /// T2.1: At most five actions, sorted by impact.
    #[test]
    fn top_five_descending() {
        let pulse = PulseEngine::default().compute(&validation_project());
        assert!(pulse.actions.len() <= 5);
        for pair in pulse.actions.windows(2) {
            assert!(pair[0].impact_score >= pair[1].impact_score);
        }
        for action in &pulse.actions {
            assert!((0.0..=100.0).contains(&action.impact_score));
        }
    }

    /// T2.2: Critical questions always surface with impact 80.
    #[test]
    fn critical_question_action() {
        let pulse = PulseEngine::default().compute(&validation_project());
        let question = pulse
            .actions
            .iter()
            .find(|a| a.entity_type.is_none())
            .expect("critical question action");
        assert_eq!(question.impact_score, 80.0);
        assert_eq!(question.sentence, "Resolve 1 critical open question(s)");
    }

    /// T2.3: Types blocking the next transition are flagged.
    #[test]
    fn blocking_types_unblock_gates() {
        let pulse = PulseEngine::default().compute(&validation_project());
        for action in pulse.actions.iter().filter(|a| a.unblocks_gate) {
            let entity_type = action.entity_type.as_ref().expect("entity action");
            assert!(pulse.stage.is_blocking(entity_type));
        }
    }
}

// =============================================================================
// TIER T3: RISK AND FORECAST
// =============================================================================

mod t3_risk_forecast {
    use super::*;
    use pulse_core::RiskSummary;

    /// T3.1: Risk never exceeds 100.
    #[test]
    fn risk_capped() {
        let weights = PulseConfig::default().risk_weights;
        let summary = RiskSummary::from_counts(10, 10, 10, &weights);
        assert_eq!(summary.risk_score, 100.0);
    }

    /// T3.2: Risk factors counted from the project.
    #[test]
    fn risk_factors() {
        let pulse = PulseEngine::default().compute(&validation_project());
        // workflow_step: 3 of 4 stale.
        assert_eq!(pulse.risks.stale_clusters, 1);
        assert_eq!(pulse.risks.critical_questions, 1);
        // workflow_step (4) and stakeholder (3) have nothing confirmed.
        assert_eq!(pulse.risks.single_source_types, 2);
        assert_eq!(pulse.risks.contradictions, 0);
        assert_eq!(pulse.risks.risk_score, 10.0 + 15.0 + 16.0);
    }

    /// T3.3: Forecast indices are fractions.
    #[test]
    fn forecast_in_unit_range() {
        let pulse = PulseEngine::default().compute(&validation_project());
        let f = &pulse.forecast;
        for value in [
            f.prototype_readiness,
            f.spec_completeness,
            f.confidence_index,
            f.coverage_index,
        ] {
            assert!((0.0..=1.0).contains(&value), "{value}");
        }
        assert!(f.prototype_readiness >= 0.5);
    }
}

// =============================================================================
// TIER T4: SIGNAL VELOCITY
// =============================================================================

mod t4_velocity {
    use super::*;
    use pulse_core::{SignalVelocity, VelocityTrend};

    /// T4.1: Boundary ratios.
    #[test]
    fn trend_boundaries() {
        assert_eq!(SignalVelocity::from_counts(2, 3).trend, VelocityTrend::Accelerating);
        assert_eq!(SignalVelocity::from_counts(4, 2).trend, VelocityTrend::Stalling);
        assert_eq!(SignalVelocity::from_counts(0, 1).trend, VelocityTrend::Steady);
    }

    /// T4.2: Stalling shrinks targets for the computation only.
    #[test]
    fn stalling_scales_targets() {
        let engine = PulseEngine::default();
        let mut input = validation_project();
        input.velocity = Some(SignalVelocity::from_counts(4, 2));

        let pulse = engine.compute(&input);
        assert_eq!(pulse.stage.current, PulseStage::Validation);
        // Validation feature target 8 * 0.85 -> 6.
        assert_eq!(pulse.health[&EntityType::new("feature")].target, 6);
        assert!(pulse.rules_fired[0].starts_with("velocity: stalling"));
        // The engine's config is untouched.
        assert_eq!(
            engine
                .config()
                .target_for(PulseStage::Validation, &EntityType::new("feature")),
            8
        );
    }

    /// T4.3: Steady velocity leaves targets alone.
    #[test]
    fn steady_leaves_targets() {
        let mut input = validation_project();
        input.velocity = Some(SignalVelocity::from_counts(3, 3));
        let pulse = PulseEngine::default().compute(&input);
        assert_eq!(pulse.health[&EntityType::new("feature")].target, 8);
    }
}

// =============================================================================
// TIER T5: DETERMINISM
// =============================================================================

mod t5_determinism {
    use super::*;

    /// T5.1: Identical inputs produce identical prompts and audit logs.
    #[test]
    fn identical_inputs_identical_outputs() {
        let engine = PulseEngine::default();
        let input = validation_project();

        let first = engine.compute(&input);
        let second = engine.compute(&input.clone());

        assert_eq!(
            first.extraction_directive.rendered_prompt.as_bytes(),
            second.extraction_directive.rendered_prompt.as_bytes()
        );
        assert_eq!(first.rules_fired, second.rules_fired);
        assert_eq!(first, second);
    }

    /// T5.2: Inventory insertion order does not matter.
    #[test]
    fn insertion_order_irrelevant() {
        let forward = validation_project();
        let mut reversed = PulseInput::empty("acme-portal");
        for (k, v) in forward.entity_inventory.iter().rev() {
            reversed.entity_inventory.insert(k.clone(), v.clone());
        }
        reversed.business_drivers = forward.business_drivers.clone();
        reversed.open_questions = forward.open_questions.clone();

        let engine = PulseEngine::default();
        assert_eq!(engine.compute(&forward), engine.compute(&reversed));
    }
}

// =============================================================================
// TIER T6: SCHEMA FIDELITY
// =============================================================================

mod t6_schema {
    use super::*;

    /// T6.1: ProjectPulse survives a JSON round trip.
    #[test]
    fn pulse_json_round_trip() {
        let mut input = validation_project();
        input.velocity = Some(pulse_core::SignalVelocity::from_counts(1, 4));
        let pulse = PulseEngine::default().compute(&input);

        let json = serde_json::to_string(&pulse).expect("serialize");
        let back: ProjectPulse = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(pulse, back);
    }

    /// T6.2: Config survives a JSON round trip and stays valid.
    #[test]
    fn config_json_round_trip() {
        let config = PulseConfig::default();
        let json = serde_json::to_string_pretty(&config).expect("serialize");
        let back: PulseConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(config, back);
        back.validate().expect("valid");
    }

    /// T6.3: Input accepts the `entities` key used by collaborators.
    #[test]
    fn input_accepts_entities_alias() {
        let json = r#"{
            "project_id": "p",
            "entities": {"feature": [{"confirmation_status": "confirmed", "is_stale": false}]},
            "open_questions": [{"priority": "critical"}]
        }"#;
        let input: PulseInput = serde_json::from_str(json).expect("deserialize");
        assert_eq!(input.entity_inventory[&EntityType::new("feature")].len(), 1);
        assert!(input.business_drivers.is_empty());
        assert!(input.velocity.is_none());
    }
}
