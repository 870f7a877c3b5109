//! Alarm and notification side effects
//!
//! Shell-outs for the end-of-session alarm. Every failure here is non-fatal:
//! the worst user-visible outcome is a silent completion.

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::TimerError;

/// Fixed alarm sound; configurable sounds are out of scope.
const ALARM_PLAYER: &str = "paplay";
const ALARM_SOUND: &str = "/usr/share/sounds/freedesktop/stereo/alarm-clock-elapsed.oga";

const NOTIFY_COMMAND: &str = "notify-send";

/// Check whether the alarm player is available. Called once at startup; a
/// missing player downgrades the alarm to a terminal bell.
pub async fn check_alarm_tooling() -> Result<(), TimerError> {
    let output = Command::new(ALARM_PLAYER)
        .arg("--version")
        .output()
        .await
        .map_err(|e| TimerError::Playback(format!("{} not available: {}", ALARM_PLAYER, e)))?;

    if output.status.success() {
        debug!("{} available for alarm playback", ALARM_PLAYER);
        Ok(())
    } else {
        Err(TimerError::Playback(format!(
            "{} returned {}",
            ALARM_PLAYER, output.status
        )))
    }
}

/// Play the end-of-session alarm.
///
/// Falls back to ringing the terminal bell when the player fails, and still
/// reports the failure so it can be logged and surfaced.
pub async fn play_alarm() -> Result<(), TimerError> {
    let result = Command::new(ALARM_PLAYER)
        .arg(ALARM_SOUND)
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => {
            ring_terminal_bell();
            Err(TimerError::Playback(format!(
                "{} exited with {}",
                ALARM_PLAYER, output.status
            )))
        }
        Err(e) => {
            ring_terminal_bell();
            Err(TimerError::Playback(format!(
                "failed to run {}: {}",
                ALARM_PLAYER, e
            )))
        }
    }
}

/// Raise a desktop notification.
///
/// A missing notification tool is the "permission not granted" case: the
/// caller treats [`TimerError::PermissionUnavailable`] as a silent no-op.
pub async fn send_notification(summary: &str, body: &str) -> Result<(), TimerError> {
    let result = Command::new(NOTIFY_COMMAND)
        .arg(summary)
        .arg(body)
        .output()
        .await;

    match result {
        Ok(output) if output.status.success() => Ok(()),
        Ok(output) => {
            warn!("{} exited with {}", NOTIFY_COMMAND, output.status);
            Err(TimerError::PermissionUnavailable)
        }
        Err(_) => Err(TimerError::PermissionUnavailable),
    }
}

// ASCII BEL, the lowest-common-denominator alarm.
fn ring_terminal_bell() {
    print!("\x07");
}
