//! Timer engine
//!
//! The intent bus, the clock source strategies, the background timing worker
//! and the state machine task that ties them together.

pub mod clock;
pub mod intent;
pub mod machine;
pub mod worker;

// Re-export main types
pub use clock::{ClockEvent, ClockSession, ClockSource, ClockStrategy};
pub use intent::{EngineInput, Intent};
pub use machine::timer_engine_task;
pub use worker::{WorkerCommand, WorkerEvent, WorkerHandle};
