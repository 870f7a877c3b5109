//! Session duration configuration

use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// User-configured session length as minutes plus seconds.
///
/// Construction validates both parts, so a held value always satisfies
/// `minutes < 60`, `seconds < 60` and `total_seconds() > 0`. Invalid input is
/// rejected with [`TimerError::InvalidDuration`] rather than clamped; the
/// caller decides the recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationSetting {
    minutes: u8,
    seconds: u8,
}

impl DurationSetting {
    /// Create a validated duration setting.
    pub fn new(minutes: u8, seconds: u8) -> Result<Self, TimerError> {
        if minutes >= 60 {
            return Err(TimerError::InvalidDuration(format!(
                "minutes must be below 60, got {}",
                minutes
            )));
        }
        if seconds >= 60 {
            return Err(TimerError::InvalidDuration(format!(
                "seconds must be below 60, got {}",
                seconds
            )));
        }
        if minutes == 0 && seconds == 0 {
            return Err(TimerError::InvalidDuration(
                "total duration must be greater than zero".to_string(),
            ));
        }
        Ok(Self { minutes, seconds })
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    /// Total configured length in whole seconds.
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.minutes) * 60 + u64::from(self.seconds)
    }
}

impl Default for DurationSetting {
    /// The documented default session length of 25 minutes.
    fn default() -> Self {
        Self {
            minutes: 25,
            seconds: 0,
        }
    }
}
