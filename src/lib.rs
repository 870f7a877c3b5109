//! Tomato Timer - a state-managed countdown timer engine
//!
//! This library implements a countdown timer as an explicit state machine
//! driven by user intents, with interchangeable clock source strategies and
//! an HTTP control surface for the surrounding UI glue.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod projections;
pub mod services;
pub mod state;
pub mod tasks;
pub mod utils;

// Re-export commonly used types
pub use api::create_router;
pub use config::Config;
pub use engine::{timer_engine_task, Intent};
pub use error::TimerError;
pub use state::{AppState, TimerPhase, TimerSnapshot};
pub use tasks::completion_task;
pub use utils::signals::shutdown_signal;
