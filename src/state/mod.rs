//! State management module
//!
//! The duration model, timer phase/snapshot types and the shared `AppState`.

pub mod app_state;
pub mod duration;
pub mod timer_state;

// Re-export main types
pub use app_state::AppState;
pub use duration::DurationSetting;
pub use timer_state::{Completion, TimerPhase, TimerSnapshot};
