//! # Signal Velocity
//!
//! Classifies the recent cadence of incoming signals and scales entity
//! targets accordingly: a project receiving information quickly is asked for
//! more, a stalling one for less.
//!
//! The trailing window is split into two equal halves. The ratio of the
//! second half's event count to the first half's decides the trend.

use crate::config::VelocityScaling;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default trailing window, in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Ratio at or above which the pace counts as accelerating.
pub const ACCELERATING_RATIO: f64 = 1.5;

/// Ratio at or below which the pace counts as stalling.
pub const STALLING_RATIO: f64 = 0.5;

// =============================================================================
// TREND
// =============================================================================

/// Recent signal cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocityTrend {
    Accelerating,
    #[default]
    Steady,
    Stalling,
}

impl VelocityTrend {
    /// Classify from the event counts of the two window halves.
    #[must_use]
    pub fn classify(first_half: u32, second_half: u32) -> Self {
        if first_half.saturating_add(second_half) < 2 {
            return VelocityTrend::Steady;
        }

        if first_half == 0 {
            return if second_half >= 2 {
                VelocityTrend::Accelerating
            } else {
                VelocityTrend::Steady
            };
        }

        let ratio = f64::from(second_half) / f64::from(first_half);
        if ratio >= ACCELERATING_RATIO {
            VelocityTrend::Accelerating
        } else if ratio <= STALLING_RATIO {
            VelocityTrend::Stalling
        } else {
            VelocityTrend::Steady
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            VelocityTrend::Accelerating => "accelerating",
            VelocityTrend::Steady => "steady",
            VelocityTrend::Stalling => "stalling",
        }
    }
}

impl std::fmt::Display for VelocityTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SIGNAL VELOCITY
// =============================================================================

/// Event counts over a trailing window and the trend they imply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalVelocity {
    pub window_days: u32,
    pub first_half: u32,
    pub second_half: u32,
    pub total: u32,
    pub trend: VelocityTrend,
}

impl Default for SignalVelocity {
    fn default() -> Self {
        Self::from_counts(0, 0)
    }
}

impl SignalVelocity {
    /// Build from pre-counted halves of the default window.
    #[must_use]
    pub fn from_counts(first_half: u32, second_half: u32) -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            first_half,
            second_half,
            total: first_half.saturating_add(second_half),
            trend: VelocityTrend::classify(first_half, second_half),
        }
    }

    /// Count event timestamps falling in `[now - window, now]`.
    ///
    /// The older half is `[now - window, now - window/2)`, the newer half is
    /// `[now - window/2, now]`. Events outside the window are ignored. Bounds
    /// earlier than the representable range clamp to it.
    #[must_use]
    pub fn from_events(events: &[DateTime<Utc>], now: DateTime<Utc>, window_days: u32) -> Self {
        // A window reaching past the representable range counts from the start of time.
        let window = Duration::try_days(i64::from(window_days)).unwrap_or(Duration::MAX);
        let start = now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let midpoint = now
            .checked_sub_signed(window / 2)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut first_half: u32 = 0;
        let mut second_half: u32 = 0;
        for event in events {
            if *event < start || *event > now {
                continue;
            }
            if *event < midpoint {
                first_half = first_half.saturating_add(1);
            } else {
                second_half = second_half.saturating_add(1);
            }
        }

        Self {
            window_days,
            ..Self::from_counts(first_half, second_half)
        }
    }
}

// =============================================================================
// TARGET SCALING
// =============================================================================

/// Scale one entity target for a trend.
///
/// Accelerating rounds half-up, stalling truncates; both floor at 1. A target
/// of 0 means "not configured" and stays 0.
#[must_use]
pub fn scale_target(target: u32, trend: VelocityTrend, scaling: &VelocityScaling) -> u32 {
    if target == 0 {
        return 0;
    }

    match trend {
        VelocityTrend::Accelerating => {
            ((f64::from(target) * scaling.accelerating + 0.5) as u32).max(1)
        }
        VelocityTrend::Stalling => ((f64::from(target) * scaling.stalling) as u32).max(1),
        VelocityTrend::Steady => target,
    }
}

// =============================================================================
// TESTS
// =============================================================================
