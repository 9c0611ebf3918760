//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::loader::{self, UNKNOWN_PROJECT};
use crate::snapshot::{PulseSnapshot, spawn_snapshot_write};
use chrono::{DateTime, Utc};
use pulse_core::{ProjectPulse, PulseConfig, PulseEngine, PulseError, PulseInput, SignalVelocity};
use std::path::{Path, PathBuf};

// =============================================================================
// INPUT GATHERING
// =============================================================================

/// Load config, inventory and events concurrently and assemble the engine input.
///
/// Never fails: each source that cannot be loaded is replaced by its safe
/// default (see the loader module). Events, when present, replace any velocity
/// carried by the input file.
pub async fn gather_inputs(
    config_path: Option<&Path>,
    input_path: &Path,
    events_path: Option<PathBuf>,
    window_days: u32,
    project: Option<String>,
    now: DateTime<Utc>,
) -> (PulseConfig, PulseInput) {
    let fallback_project = project.as_deref().unwrap_or(UNKNOWN_PROJECT);

    let (config, mut input, events) = tokio::join!(
        loader::load_config(config_path),
        loader::load_input(input_path, fallback_project),
        loader::load_events(events_path),
    );

    if let Some(project) = project {
        input.project_id = project;
    }
    if input.project_id.trim().is_empty() {
        input.project_id = UNKNOWN_PROJECT.to_string();
    }

    if let Some(events) = events {
        let velocity = SignalVelocity::from_events(&events, now, window_days);
        tracing::debug!(
            total = velocity.total,
            trend = %velocity.trend,
            "velocity from events"
        );
        input.velocity = Some(velocity);
    }

    (config, input)
}

// =============================================================================
// COMPUTE COMMAND
// =============================================================================

/// Compute a pulse, print it and write a snapshot.
#[allow(clippy::too_many_arguments)]
pub async fn cmd_compute(
    config_path: Option<&Path>,
    json_mode: bool,
    verbose: bool,
    input_path: &Path,
    events: Option<PathBuf>,
    window_days: u32,
    snapshot_dir: Option<PathBuf>,
    trigger: &str,
    project: Option<String>,
) -> Result<(), PulseError> {
    let now = Utc::now();
    let (config, input) =
        gather_inputs(config_path, input_path, events, window_days, project, now).await;

    tracing::info!(project_id = %input.project_id, "computing pulse");
    let pulse = PulseEngine::new(config).compute(&input);

    if json_mode {
        let output = serde_json::json!({
            "project_id": input.project_id,
            "computed_at": now.to_rfc3339(),
            "trigger": trigger,
            "fingerprint": pulse.extraction_directive.fingerprint(),
            "pulse": pulse,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        print_pulse(&input.project_id, &pulse, verbose);
    }

    if let Some(dir) = snapshot_dir {
        let snapshot = PulseSnapshot::new(input.project_id, now, trigger, pulse);
        // The result is already out; only wait so the runtime does not drop the write.
        if let Err(e) = spawn_snapshot_write(dir, snapshot).await {
            tracing::warn!(error = %e, "snapshot task did not complete");
        }
    }

    Ok(())
}

/// Print a human-readable pulse report.
pub fn print_pulse(project_id: &str, pulse: &ProjectPulse, verbose: bool) {
    let stage = &pulse.stage;

    println!("Project Pulse: {}", project_id);
    println!("==============");
    println!("Config: {}", pulse.config_version);
    if let Some(velocity) = &pulse.velocity {
        println!(
            "Velocity: {} ({} -> {} over {} days)",
            velocity.trend, velocity.first_half, velocity.second_half, velocity.window_days
        );
    }
    println!();

    println!("Stage: {}", stage.current);
    match stage.next_stage {
        Some(next) => println!(
            "Toward {}: {}/{} gates ({:.0}%)",
            next,
            stage.gates_met,
            stage.gates_total,
            stage.progress * 100.0
        ),
        None => println!("Terminal stage reached"),
    }
    for gate in &stage.gates {
        println!("  {}", gate);
    }
    println!();

    println!("Entity Health:");
    for health in pulse.health.values() {
        println!(
            "  {:<16} {:>3}/{:<3} {:<10} {:>5.1}  {}",
            health.entity_type.as_str(),
            health.count,
            health.target,
            health.coverage.as_str(),
            health.health_score,
            health.directive
        );
    }
    println!();

    println!("Next Actions:");
    if pulse.actions.is_empty() {
        println!("  (none)");
    }
    for (i, action) in pulse.actions.iter().enumerate() {
        let flag = if action.unblocks_gate { " [gate]" } else { "" };
        println!(
            "  {}. {} ({:.1}){}",
            i + 1,
            action.sentence,
            action.impact_score,
            flag
        );
    }
    println!();

    let risks = &pulse.risks;
    println!("Risk: {:.1}", risks.risk_score);
    println!("  Stale clusters:      {}", risks.stale_clusters);
    println!("  Critical questions:  {}", risks.critical_questions);
    println!("  Single-source types: {}", risks.single_source_types);
    println!();

    let forecast = &pulse.forecast;
    println!("Forecast:");
    println!("  Prototype readiness: {:.2}", forecast.prototype_readiness);
    println!("  Spec completeness:   {:.2}", forecast.spec_completeness);
    println!("  Confidence index:    {:.2}", forecast.confidence_index);
    println!("  Coverage index:      {:.2}", forecast.coverage_index);

    if verbose {
        println!();
        println!("Rules Fired:");
        for rule in &pulse.rules_fired {
            println!("  {}", rule);
        }
    }
}

// =============================================================================
// DIRECTIVE COMMAND
// =============================================================================

/// Print only the rendered extraction directive.
pub async fn cmd_directive(
    config_path: Option<&Path>,
    json_mode: bool,
    input_path: &Path,
    events: Option<PathBuf>,
    window_days: u32,
) -> Result<(), PulseError> {
    let (config, input) =
        gather_inputs(config_path, input_path, events, window_days, None, Utc::now()).await;
    let pulse = PulseEngine::new(config).compute(&input);
    let directive = pulse.extraction_directive;

    if json_mode {
        let output = serde_json::json!({
            "project_id": input.project_id,
            "stage": directive.stage,
            "fingerprint": directive.fingerprint(),
            "rendered_prompt": directive.rendered_prompt,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{}", directive.rendered_prompt);
    Ok(())
}

// =============================================================================
// VELOCITY COMMAND
// =============================================================================

/// Report velocity for an events file.
pub async fn cmd_velocity(
    json_mode: bool,
    events_path: &Path,
    window_days: u32,
) -> Result<(), PulseError> {
    let events = loader::try_load_events(events_path).await?;
    let velocity = SignalVelocity::from_events(&events, Utc::now(), window_days);

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&velocity).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Signal Velocity");
    println!("===============");
    println!("Window:      {} days", velocity.window_days);
    println!("Older half:  {}", velocity.first_half);
    println!("Newer half:  {}", velocity.second_half);
    println!("Total:       {}", velocity.total);
    println!("Trend:       {}", velocity.trend);

    Ok(())
}

// =============================================================================
// CONFIG COMMAND
// =============================================================================

/// Print the effective config, or validate it with `check`.
///
/// With `check`, a config file that fails to load is an error rather than a
/// silent fallback.
pub async fn cmd_config(
    config_path: Option<&Path>,
    json_mode: bool,
    check: bool,
) -> Result<(), PulseError> {
    if check {
        let (source, version) = match config_path {
            Some(path) => {
                let config = loader::try_load_config(path).await?;
                (path.display().to_string(), config.version)
            }
            None => ("built-in".to_string(), PulseConfig::default().version),
        };

        if json_mode {
            let output = serde_json::json!({
                "valid": true,
                "source": source,
                "version": version,
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&output).unwrap_or_default()
            );
        } else {
            println!("Config OK: {} ({})", source, version);
        }
        return Ok(());
    }

    let config = loader::load_config(config_path).await;
    if json_mode {
        let json = serde_json::to_string_pretty(&config)
            .map_err(|e| PulseError::SerializationError(format!("JSON config: {}", e)))?;
        println!("{}", json);
    } else {
        println!("{}", loader::config_to_toml(&config)?);
    }

    Ok(())
}
