//! Completion side-effect background task

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::error::TimerError;
use crate::projections;
use crate::services::{play_alarm, send_notification};
use crate::state::AppState;

/// Background task that fires the alarm and notification once per completed
/// session.
///
/// Runs strictly after the engine has already forced the transition back to
/// pristine; nothing here can block or fail the state machine.
pub async fn completion_task(state: Arc<AppState>) {
    info!("starting completion task");

    let mut completions = state.subscribe_completions();

    loop {
        match completions.recv().await {
            Ok(completion) => {
                info!(
                    duration_seconds = completion.duration_seconds,
                    "session complete, firing alarm"
                );

                if let Err(e) = play_alarm().await {
                    warn!("{}", e);
                    if let Err(e) = state.add_error(e.to_string()) {
                        warn!("Failed to record playback error: {}", e);
                    }
                }

                if state.notify_enabled {
                    let body = format!(
                        "Session of {} finished",
                        projections::display(completion.duration_seconds as f64)
                    );
                    match send_notification("Time is up", &body).await {
                        Ok(()) => {}
                        Err(TimerError::PermissionUnavailable) => {
                            // Not an error by contract; skip silently.
                            debug!("notifications unavailable, skipping");
                        }
                        Err(e) => {
                            warn!("{}", e);
                            if let Err(e) = state.add_error(e.to_string()) {
                                warn!("Failed to record notification error: {}", e);
                            }
                        }
                    }
                }
            }
            Err(RecvError::Lagged(missed)) => {
                warn!("completion task lagged, missed {} events", missed);
            }
            Err(RecvError::Closed) => break,
        }
    }

    info!("completion task stopped");
}
