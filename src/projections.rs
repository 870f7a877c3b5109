//! Derived projections of remaining time
//!
//! Pure, stateless functions mapping a remaining-time value to the display
//! string and the progress ratio consumed by a radial indicator.

/// Radius of the radial progress indicator, in user units.
pub const INDICATOR_RADIUS: f64 = 48.0;

/// Format remaining seconds as `M:SS` (minutes unpadded, seconds zero-padded).
pub fn display(remaining_seconds: f64) -> String {
    let remaining = remaining_seconds.max(0.0);
    let minutes = (remaining / 60.0).floor() as u64;
    let seconds = (remaining % 60.0).floor() as u64;
    format!("{}:{:02}", minutes, seconds)
}

/// Fraction of the session still remaining, in [0, 1].
///
/// A zero total is a guarded division: the ratio is defined as 0 rather than
/// propagating NaN or infinity to consumers.
pub fn progress_ratio(remaining_seconds: f64, total_seconds: u64) -> f64 {
    if total_seconds == 0 {
        return 0.0;
    }
    (remaining_seconds / total_seconds as f64).max(0.0)
}

/// Stroke dash offset for a radial indicator of radius [`INDICATOR_RADIUS`].
pub fn dash_offset(ratio: f64) -> f64 {
    let circumference = 2.0 * std::f64::consts::PI * INDICATOR_RADIUS;
    circumference * ratio
}
