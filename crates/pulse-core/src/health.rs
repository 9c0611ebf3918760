//! # Entity Health
//!
//! Turns raw entity counts into coverage, confirmation, freshness, quality,
//! a 0-100 health score and an extraction directive, per entity type.
//!
//! ## Directive decision table
//!
//! First match wins:
//!
//! | # | Coverage | Condition | Directive |
//! |---|----------|-----------|-----------|
//! | 1 | saturated | - | merge_only |
//! | 2 | adequate | confirmation < 0.4 | confirm |
//! | 3 | adequate | confirmation < 0.7 and quality < 0.5 | enrich |
//! | 4 | adequate | confirmation >= 0.7 | stable |
//! | 5 | adequate | - | enrich |
//! | 6 | missing, thin, growing | - | grow |

use crate::config::{CoverageThresholds, PulseConfig};
use crate::types::{
    CoverageLevel, EntityDirective, EntityInventory, EntityRecord, EntityType, PulseStage,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Below this confirmation rate an adequate type must be confirmed.
pub const CONFIRM_BELOW: f64 = 0.4;

/// At or above this confirmation rate an adequate type is stable.
pub const STABLE_AT: f64 = 0.7;

/// Quality below which a partly confirmed type is enriched.
pub const ENRICH_QUALITY_BELOW: f64 = 0.5;

/// Share of confirmation in the quality blend (freshness takes the rest).
pub const QUALITY_CONFIRMATION_SHARE: f64 = 0.6;

// =============================================================================
// ENTITY HEALTH
// =============================================================================

/// Derived health of one entity type for one computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityHealth {
    pub entity_type: EntityType,
    pub count: u32,
    pub confirmed: u32,
    pub stale: u32,
    pub confirmation_rate: f64,
    pub staleness_rate: f64,
    pub coverage: CoverageLevel,
    pub quality: f64,
    pub freshness: f64,
    pub health_score: f64,
    pub directive: EntityDirective,
    pub target: u32,
}

impl EntityHealth {
    /// `min(1, count/target)`, or `1`/`0` by presence when no target is set.
    #[must_use]
    pub fn coverage_score(&self) -> f64 {
        coverage_score(self.count, self.target)
    }

    /// One-line summary used by the audit log.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}/{} {}, {} confirmed, {} stale -> {}",
            self.count, self.target, self.coverage, self.confirmed, self.stale, self.directive
        )
    }
}

/// Entity type -> health, in key order.
pub type HealthMap = BTreeMap<EntityType, EntityHealth>;

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// Classify `count` against `target`.
///
/// An unconfigured target (0) yields adequate when anything exists.
#[must_use]
pub fn classify_coverage(count: u32, target: u32, thresholds: &CoverageThresholds) -> CoverageLevel {
    if count == 0 {
        return CoverageLevel::Missing;
    }
    if target == 0 {
        return CoverageLevel::Adequate;
    }

    let ratio = f64::from(count) / f64::from(target);
    if ratio < thresholds.thin {
        CoverageLevel::Thin
    } else if ratio < thresholds.growing {
        CoverageLevel::Growing
    } else if ratio < thresholds.adequate {
        CoverageLevel::Adequate
    } else {
        CoverageLevel::Saturated
    }
}

/// Coverage contribution to the health score, in `[0, 1]`.
#[must_use]
pub fn coverage_score(count: u32, target: u32) -> f64 {
    if target > 0 {
        (f64::from(count) / f64::from(target)).min(1.0)
    } else if count > 0 {
        1.0
    } else {
        0.0
    }
}

/// Apply the directive decision table.
#[must_use]
pub fn decide_directive(
    coverage: CoverageLevel,
    confirmation_rate: f64,
    quality: f64,
) -> EntityDirective {
    match coverage {
        CoverageLevel::Saturated => EntityDirective::MergeOnly,
        CoverageLevel::Adequate => {
            if confirmation_rate < CONFIRM_BELOW {
                EntityDirective::Confirm
            } else if confirmation_rate < STABLE_AT && quality < ENRICH_QUALITY_BELOW {
                EntityDirective::Enrich
            } else if confirmation_rate >= STABLE_AT {
                EntityDirective::Stable
            } else {
                EntityDirective::Enrich
            }
        }
        CoverageLevel::Missing | CoverageLevel::Thin | CoverageLevel::Growing => {
            EntityDirective::Grow
        }
    }
}

// =============================================================================
// COMPUTATION
// =============================================================================

/// Compute the health of one entity type at `stage`.
#[must_use]
pub fn compute_entity_health(
    entity_type: &EntityType,
    records: &[EntityRecord],
    stage: PulseStage,
    config: &PulseConfig,
) -> EntityHealth {
    let count = u32::try_from(records.len()).unwrap_or(u32::MAX);
    let confirmed = records.iter().filter(|r| r.is_confirmed()).count() as u32;
    let stale = records.iter().filter(|r| r.is_stale).count() as u32;

    let (confirmation_rate, staleness_rate) = if count > 0 {
        (
            f64::from(confirmed) / f64::from(count),
            f64::from(stale) / f64::from(count),
        )
    } else {
        (0.0, 0.0)
    };

    let freshness = 1.0 - staleness_rate;
    let quality =
        QUALITY_CONFIRMATION_SHARE * confirmation_rate + (1.0 - QUALITY_CONFIRMATION_SHARE) * freshness;

    let target = config.target_for(stage, entity_type);
    let coverage = classify_coverage(count, target, &config.coverage_thresholds);

    let w = config.weights_for(stage);
    let health_score = (100.0
        * (coverage_score(count, target) * w.coverage
            + confirmation_rate * w.confirmation
            + quality * w.quality
            + freshness * w.freshness))
        .clamp(0.0, 100.0);

    EntityHealth {
        entity_type: entity_type.clone(),
        count,
        confirmed,
        stale,
        confirmation_rate,
        staleness_rate,
        coverage,
        quality,
        freshness,
        health_score,
        directive: decide_directive(coverage, confirmation_rate, quality),
        target,
    }
}

/// Entity types evaluated for an inventory: everything present plus
/// everything the config targets in any stage.
#[must_use]
pub fn evaluated_entity_types(
    inventory: &EntityInventory,
    config: &PulseConfig,
) -> BTreeSet<EntityType> {
    let mut types = config.targeted_entity_types();
    types.extend(inventory.keys().cloned());
    types
}

/// Compute health for every evaluated entity type, appending one audit line
/// per type to `rules_fired`.
pub fn compute_health_map(
    inventory: &EntityInventory,
    stage: PulseStage,
    config: &PulseConfig,
    rules_fired: &mut Vec<String>,
) -> HealthMap {
    let mut map = HealthMap::new();

    for entity_type in evaluated_entity_types(inventory, config) {
        let records = inventory.get(&entity_type).map_or(&[][..], Vec::as_slice);
        let health = compute_entity_health(&entity_type, records, stage, config);
        rules_fired.push(format!(
            "health[{stage}] {entity_type}: {}",
            health.summary()
        ));
        map.insert(entity_type, health);
    }

    map
}

// =============================================================================
// TESTS
// =============================================================================
