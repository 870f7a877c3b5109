//! API response structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::ClockStrategy;
use crate::state::{DurationSetting, TimerSnapshot};

/// Payload for duration edits: minutes and seconds parts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DurationRequest {
    pub minutes: u8,
    pub seconds: u8,
}

/// API response structure for intent and duration endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub timer: TimerSnapshot,
}

impl ApiResponse {
    /// Create a new API response
    pub fn new(status: String, message: String, timer: TimerSnapshot) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
            timer,
        }
    }

    /// Create an accepted response
    pub fn accepted(message: String, timer: TimerSnapshot) -> Self {
        Self::new("accepted".to_string(), message, timer)
    }

    /// Create a rejected response
    pub fn rejected(message: String, timer: TimerSnapshot) -> Self {
        Self::new("rejected".to_string(), message, timer)
    }
}

/// Full status response with timer, configuration and server metadata
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub timer: TimerSnapshot,
    pub duration: DurationSetting,
    pub clock: ClockStrategy,
    pub errors: Vec<String>,
    pub uptime: String,
    pub port: u16,
    pub host: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    /// Create a new health response
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: "0.1.0".to_string(),
        }
    }
}
