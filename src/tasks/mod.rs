//! Background tasks module
//!
//! Side-effect tasks that run alongside the engine and the HTTP server.

pub mod completion;

// Re-export main functions
pub use completion::completion_task;
