//! # Action Ranking
//!
//! Converts each entity type's directive into a recommended next action with
//! an impact score, then keeps the highest-impact ones.
//!
//! | Source | Impact |
//! |--------|--------|
//! | grow | `70 * (1 - count/target) * m` (0 without a target) |
//! | confirm | `60 * (1 - confirmation_rate) * m` |
//! | enrich | `50 * (1 - quality) * m` |
//! | merge_only | `10` |
//! | stale entities | `40 * staleness_rate * m` |
//! | critical questions | `80` |
//!
//! `m` is 2.0 when the entity type blocks the next stage transition, else 1.0.
//! Scores are clamped to `[0, 100]`. Sorting is stable, so ties keep emission
//! order: entity types in key order (directive action, then staleness action),
//! followed by the critical-question action.

use crate::config::ActionTemplates;
use crate::health::{EntityHealth, HealthMap};
use crate::stage::StageInfo;
use crate::types::{EntityDirective, EntityType, OpenQuestion};
use serde::{Deserialize, Serialize};

/// Maximum number of actions returned.
pub const MAX_ACTIONS: usize = 5;

/// Impact multiplier for entity types blocking the next transition.
pub const GATE_MULTIPLIER: f64 = 2.0;

pub const GROW_BASE: f64 = 70.0;
pub const CONFIRM_BASE: f64 = 60.0;
pub const ENRICH_BASE: f64 = 50.0;
pub const STALE_BASE: f64 = 40.0;
pub const MERGE_IMPACT: f64 = 10.0;
pub const CRITICAL_QUESTION_IMPACT: f64 = 80.0;

// =============================================================================
// RANKED ACTION
// =============================================================================

/// A recommended next step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAction {
    pub sentence: String,
    pub impact_score: f64,
    pub entity_type: Option<EntityType>,
    pub unblocks_gate: bool,
}

// =============================================================================
// TEMPLATES
// =============================================================================

/// Substitute `{name}` placeholders. Unknown placeholders are left as-is.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

fn entity_vars(health: &EntityHealth) -> Vec<(&'static str, String)> {
    vec![
        ("entity", health.entity_type.label()),
        ("count", health.count.to_string()),
        ("target", health.target.to_string()),
        ("confirmed", health.confirmed.to_string()),
        ("stale", health.stale.to_string()),
        ("missing", health.target.saturating_sub(health.count).to_string()),
        ("quality", format!("{:.0}", health.quality * 100.0)),
    ]
}

// =============================================================================
// RANKING
// =============================================================================

fn clamp_impact(value: f64) -> f64 {
    value.clamp(0.0, 100.0)
}

/// Directive-driven action for one entity type, if the directive calls for one.
fn directive_action<'t>(
    health: &EntityHealth,
    multiplier: f64,
    templates: &'t ActionTemplates,
) -> Option<(f64, &'t str)> {
    match health.directive {
        EntityDirective::Grow => {
            let impact = if health.target > 0 {
                GROW_BASE * (1.0 - f64::from(health.count) / f64::from(health.target)) * multiplier
            } else {
                0.0
            };
            Some((impact, templates.grow.as_str()))
        }
        EntityDirective::Confirm => Some((
            CONFIRM_BASE * (1.0 - health.confirmation_rate) * multiplier,
            templates.confirm.as_str(),
        )),
        EntityDirective::Enrich => Some((
            ENRICH_BASE * (1.0 - health.quality) * multiplier,
            templates.enrich.as_str(),
        )),
        EntityDirective::MergeOnly => Some((MERGE_IMPACT, templates.merge_only.as_str())),
        EntityDirective::Stable => None,
    }
}

/// Rank recommended actions, highest impact first, at most [`MAX_ACTIONS`].
///
/// Actions whose impact works out to zero are not emitted.
#[must_use]
pub fn rank_actions(
    health: &HealthMap,
    stage: &StageInfo,
    open_questions: &[OpenQuestion],
    templates: &ActionTemplates,
) -> Vec<RankedAction> {
    let mut actions = Vec::new();

    for (entity_type, h) in health {
        let blocking = stage.is_blocking(entity_type);
        let multiplier = if blocking { GATE_MULTIPLIER } else { 1.0 };
        let vars = entity_vars(h);

        if let Some((impact, template)) = directive_action(h, multiplier, templates) {
            let impact = clamp_impact(impact);
            if impact > 0.0 {
                actions.push(RankedAction {
                    sentence: render_template(template, &vars),
                    impact_score: impact,
                    entity_type: Some(entity_type.clone()),
                    unblocks_gate: blocking && h.directive != EntityDirective::MergeOnly,
                });
            }
        }

        if h.stale > 0 {
            let impact = clamp_impact(STALE_BASE * h.staleness_rate * multiplier);
            actions.push(RankedAction {
                sentence: render_template(&templates.refresh_stale, &vars),
                impact_score: impact,
                entity_type: Some(entity_type.clone()),
                unblocks_gate: blocking,
            });
        }
    }

    let critical = open_questions.iter().filter(|q| q.is_critical()).count();
    if critical > 0 {
        actions.push(RankedAction {
            sentence: render_template(
                &templates.critical_questions,
                &[("critical", critical.to_string())],
            ),
            impact_score: CRITICAL_QUESTION_IMPACT,
            entity_type: None,
            unblocks_gate: false,
        });
    }

    // Stable: equal scores keep emission order.
    actions.sort_by(|a, b| b.impact_score.total_cmp(&a.impact_score));
    actions.truncate(MAX_ACTIONS);
    actions
}

// =============================================================================
// TESTS
// =============================================================================
