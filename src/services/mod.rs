//! Side-effect services module
//!
//! Shell-out integrations for alarm playback and desktop notifications.

pub mod alarm;

// Re-export main functions
pub use alarm::{check_alarm_tooling, play_alarm, send_notification};
