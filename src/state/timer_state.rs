//! Timer phase and published snapshot

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::projections;

/// Authoritative state of the timer, owned exclusively by the engine task.
///
/// The machine is cyclic: `Pristine` is re-entered on reset and on
/// completion, never exited forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Pristine,
    Running,
    Paused,
}

impl TimerPhase {
    pub fn is_running(&self) -> bool {
        matches!(self, TimerPhase::Running)
    }
}

/// Point-in-time view of the timer published to subscribers.
///
/// Carries the derived projections alongside the raw values so consumers
/// never recompute them from diverging inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerSnapshot {
    pub phase: TimerPhase,
    pub remaining_seconds: f64,
    pub duration_seconds: u64,
    pub display: String,
    pub progress: f64,
}

impl TimerSnapshot {
    /// Build a snapshot, deriving display string and progress ratio.
    pub fn new(phase: TimerPhase, remaining_seconds: f64, duration_seconds: u64) -> Self {
        let remaining_seconds = remaining_seconds.max(0.0);
        Self {
            phase,
            remaining_seconds,
            duration_seconds,
            display: projections::display(remaining_seconds),
            progress: projections::progress_ratio(remaining_seconds, duration_seconds),
        }
    }

    /// Snapshot for a freshly configured, not-yet-started timer.
    pub fn pristine(duration_seconds: u64) -> Self {
        Self::new(TimerPhase::Pristine, duration_seconds as f64, duration_seconds)
    }
}

/// A run-to-completion event, broadcast once per finished session.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub duration_seconds: u64,
    pub finished_at: DateTime<Utc>,
}
