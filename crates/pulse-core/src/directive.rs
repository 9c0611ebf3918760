//! # Extraction Directive
//!
//! Renders the per-type directives as a plain-text prompt fragment for the
//! downstream extraction consumer. The output must be byte-identical for
//! identical input so the consumer can cache prompts: entity types are sorted
//! once by descending count, then by key.

use crate::health::{EntityHealth, HealthMap};
use crate::types::{EntityDirective, EntityType, PulseStage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Rendered directive plus the structured data it was rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionDirective {
    pub stage: PulseStage,
    pub directives: BTreeMap<EntityType, EntityDirective>,
    pub dedup_alerts: Vec<String>,
    pub extraction_targets: Vec<String>,
    pub rendered_prompt: String,
}

impl ExtractionDirective {
    /// Stable digest of `rendered_prompt`, usable as a prompt-cache key.
    #[cfg(feature = "crypto-hash")]
    #[must_use]
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.rendered_prompt.as_bytes())
            .to_hex()
            .to_string()
    }

    /// Stable digest of `rendered_prompt`, usable as a prompt-cache key.
    #[cfg(not(feature = "crypto-hash"))]
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("{:016x}", fnv1a(self.rendered_prompt.as_bytes()))
    }
}

#[cfg(not(feature = "crypto-hash"))]
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

// =============================================================================
// RENDERING
// =============================================================================

const BUCKETS: [(EntityDirective, &str); 4] = [
    (EntityDirective::Grow, "GROW"),
    (EntityDirective::MergeOnly, "MERGE ONLY"),
    (EntityDirective::Confirm, "CONFIRM"),
    (EntityDirective::Enrich, "ENRICH"),
];

fn entity_line(h: &EntityHealth) -> String {
    format!(
        "- {}: {}/{} ({}, {} confirmed, {} stale) → {}",
        h.entity_type, h.count, h.target, h.coverage, h.confirmed, h.stale, h.directive
    )
}

fn dedup_alert(h: &EntityHealth) -> String {
    format!(
        "{}: {} already captured (target {}). Merge new mentions into existing {} entries; do not create duplicates.",
        h.entity_type,
        h.count,
        h.target,
        h.entity_type.label()
    )
}

fn extraction_target(h: &EntityHealth) -> Option<String> {
    match h.directive {
        EntityDirective::Grow if h.target > 0 => Some(format!(
            "{}: extract {} more ({}/{}).",
            h.entity_type,
            h.target.saturating_sub(h.count),
            h.count,
            h.target
        )),
        EntityDirective::Grow => Some(format!(
            "{}: extract any mentions ({} so far).",
            h.entity_type, h.count
        )),
        EntityDirective::Confirm => Some(format!(
            "{}: confirm existing entries before adding new ones ({} of {} confirmed).",
            h.entity_type, h.confirmed, h.count
        )),
        EntityDirective::Enrich | EntityDirective::MergeOnly | EntityDirective::Stable => None,
    }
}

/// Render the extraction directive for a health map.
#[must_use]
pub fn render_extraction_directive(health: &HealthMap, stage: PulseStage) -> ExtractionDirective {
    let mut ordered: Vec<&EntityHealth> = health.values().collect();
    ordered.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.entity_type.cmp(&b.entity_type))
    });

    let directives = health
        .iter()
        .map(|(entity_type, h)| (entity_type.clone(), h.directive))
        .collect();

    let dedup_alerts: Vec<String> = ordered
        .iter()
        .filter(|h| h.directive == EntityDirective::MergeOnly)
        .map(|h| dedup_alert(h))
        .collect();

    let extraction_targets: Vec<String> = ordered
        .iter()
        .filter_map(|h| extraction_target(h))
        .collect();

    let mut out = String::new();
    let _ = writeln!(out, "## Extraction Directive (stage: {stage})");

    let mut any_bucket = false;
    for (directive, title) in BUCKETS {
        let lines: Vec<String> = ordered
            .iter()
            .filter(|h| h.directive == directive)
            .map(|h| entity_line(h))
            .collect();
        if lines.is_empty() {
            continue;
        }
        any_bucket = true;
        let _ = writeln!(out, "\n{title}:");
        for line in lines {
            let _ = writeln!(out, "{line}");
        }
    }
    if !any_bucket {
        let _ = writeln!(out, "\nAll entity types are stable. No extraction changes needed.");
    }

    if !dedup_alerts.is_empty() {
        let _ = writeln!(out, "\nDedup Alerts:");
        for alert in &dedup_alerts {
            let _ = writeln!(out, "- {alert}");
        }
    }

    if !extraction_targets.is_empty() {
        let _ = writeln!(out, "\nExtraction Targets:");
        for target in &extraction_targets {
            let _ = writeln!(out, "- {target}");
        }
    }

    ExtractionDirective {
        stage,
        directives,
        dedup_alerts,
        extraction_targets,
        rendered_prompt: out,
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PulseConfig;
    use crate::health::compute_entity_health;
    use crate::types::EntityRecord;

    fn map(entries: &[(&str, usize, usize)]) -> HealthMap {
        let config = PulseConfig::default();
        entries
            .iter()
            .map(|(name, confirmed, unconfirmed)| {
                let mut records = vec![EntityRecord::new("confirmed", false); *confirmed];
                records.extend(vec![EntityRecord::new("pending", false); *unconfirmed]);
                let entity_type = EntityType::new(*name);
                let health =
                    compute_entity_health(&entity_type, &records, PulseStage::Discovery, &config);
                (entity_type, health)
            })
            .collect()
    }

    #[test]
    fn buckets_in_fixed_order_sorted_by_count() {
        // feature 6/5 and persona 2/2 saturated, workflow 1/2 growing.
        let health = map(&[("workflow", 0, 1), ("persona", 2, 0), ("feature", 0, 6)]);
        let directive = render_extraction_directive(&health, PulseStage::Discovery);
        let text = &directive.rendered_prompt;

        let grow = text.find("GROW:").expect("grow bucket");
        let merge = text.find("MERGE ONLY:").expect("merge bucket");
        assert!(grow < merge);
        assert!(!text.contains("CONFIRM:"));

        // Within MERGE ONLY, feature (6) precedes persona (2).
        let feature = text.find("- feature: 6/5").expect("feature line");
        let persona = text.find("- persona: 2/2").expect("persona line");
        assert!(feature < persona);

        assert_eq!(directive.dedup_alerts.len(), 2);
        assert!(directive.dedup_alerts[0].starts_with("feature:"));
        assert!(text.contains("Dedup Alerts:"));
        assert!(text.contains("Extraction Targets:\n- workflow: extract 1 more (1/2)."));
    }

    #[test]
    fn confirm_types_listed_as_targets() {
        // 4 of 5 features, none confirmed: adequate -> confirm.
        let health = map(&[("feature", 0, 4)]);
        let directive = render_extraction_directive(&health, PulseStage::Discovery);
        assert_eq!(directive.directives[&EntityType::new("feature")], EntityDirective::Confirm);
        assert_eq!(
            directive.extraction_targets,
            vec!["feature: confirm existing entries before adding new ones (0 of 4 confirmed)."]
        );
    }

    #[test]
    fn all_stable_message() {
        // 4 of 5 features, all confirmed: adequate -> stable.
        let health = map(&[("feature", 4, 0)]);
        let directive = render_extraction_directive(&health, PulseStage::Discovery);
        assert!(
            directive
                .rendered_prompt
                .contains("All entity types are stable.")
        );
        assert!(directive.extraction_targets.is_empty());
    }

    #[test]
    fn rendering_is_deterministic() {
        let health = map(&[("feature", 1, 2), ("persona", 0, 1), ("constraint", 2, 2)]);
        let a = render_extraction_directive(&health, PulseStage::Validation);
        let b = render_extraction_directive(&health, PulseStage::Validation);
        assert_eq!(a.rendered_prompt, b.rendered_prompt);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_changes_with_prompt() {
        let a = render_extraction_directive(&map(&[("feature", 1, 0)]), PulseStage::Discovery);
        let b = render_extraction_directive(&map(&[("feature", 2, 0)]), PulseStage::Discovery);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
