//! Error taxonomy for the timer engine

use thiserror::Error;

/// Errors produced by the timer engine and its side effects.
///
/// None of these are fatal to the process: invalid durations are rejected at
/// the boundary before they reach a running session, and alarm/notification
/// failures are logged and surfaced without ever blocking a state transition.
#[derive(Debug, Error)]
pub enum TimerError {
    /// Duration configuration was rejected (out-of-range parts or zero total).
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// The alarm command could not be executed or exited with failure.
    #[error("alarm playback failed: {0}")]
    Playback(String),

    /// Desktop notifications are disabled or no notification tool is present.
    #[error("notifications unavailable")]
    PermissionUnavailable,
}
