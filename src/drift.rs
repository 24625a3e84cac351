//! Clock drift between the event log and the broadcast's on-screen clock
//!
//! The estimate is a plain value threaded through the recovery loop in
//! ascending frame order: each frame receives the estimate left by the frames
//! before it and hands back the one the next frame should start from.

use crate::config::DriftConfig;
use crate::timestamp::{delta_secs, secs_delta};
use chrono::{DateTime, TimeDelta, Utc};

/// Thresholds applied to drift observations
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriftPolicy {
    /// Observations whose magnitude exceeds this are rejected
    pub max_drift: TimeDelta,
    /// Drift at or above this magnitude triggers a corrected fetch
    pub correction_threshold: TimeDelta,
}

impl DriftPolicy {
    pub fn from_config(config: &DriftConfig) -> Self {
        Self {
            max_drift: secs_delta(config.max_drift_secs),
            correction_threshold: secs_delta(config.correction_threshold_secs),
        }
    }

    pub fn is_plausible(&self, delta: TimeDelta) -> bool {
        delta.abs() <= self.max_drift
    }

    pub fn needs_correction(&self, delta: TimeDelta) -> bool {
        delta.abs() >= self.correction_threshold
    }
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self::from_config(&DriftConfig::default())
    }
}

/// Running drift estimate: `expected capture time - observed clock time`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriftEstimate {
    delta: Option<TimeDelta>,
}

/// Outcome of folding one OCR observation into the estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftUpdate {
    /// The observation replaced the estimate
    Accepted {
        estimate: DriftEstimate,
        previous: DriftEstimate,
    },
    /// The observation was implausible; the previous estimate stands
    Rejected {
        observed: TimeDelta,
        estimate: DriftEstimate,
    },
}

impl DriftEstimate {
    pub fn new(delta: TimeDelta) -> Self {
        Self { delta: Some(delta) }
    }

    /// Current delta, if any frame has produced one yet
    pub fn delta(&self) -> Option<TimeDelta> {
        self.delta
    }

    /// Fold in an observation of the on-screen clock
    pub fn observe(
        self,
        expected: DateTime<Utc>,
        observed: DateTime<Utc>,
        policy: &DriftPolicy,
    ) -> DriftUpdate {
        let candidate = expected - observed;
        if policy.is_plausible(candidate) {
            DriftUpdate::Accepted {
                estimate: DriftEstimate::new(candidate),
                previous: self,
            }
        } else {
            DriftUpdate::Rejected {
                observed: candidate,
                estimate: self,
            }
        }
    }
}

/// Time to fetch instead of the expected time
pub fn corrected_target(expected: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    expected + delta
}

/// Whole seconds of drift, used to name corrected artifacts
pub fn drift_label(delta: TimeDelta) -> i64 {
    delta.num_seconds()
}

/// Drift as fractional seconds for logs and reports
pub fn drift_secs(delta: TimeDelta) -> f64 {
    delta_secs(delta)
}
