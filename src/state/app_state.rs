//! Shared application state
//!
//! `AppState` owns the duration model and every channel between the HTTP
//! surface, the engine task and the completion task. The engine is the only
//! writer of timer state; everything here is plumbing around it.

use std::{
    sync::{Arc, Mutex},
    time::Instant,
};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::{ClockStrategy, EngineInput, Intent};
use crate::error::TimerError;

use super::{Completion, DurationSetting, TimerSnapshot};

/// Shared handle connecting the HTTP surface to the engine and the
/// completion task.
#[derive(Debug)]
pub struct AppState {
    /// Selected clock strategy, fixed at startup.
    pub clock_strategy: ClockStrategy,
    /// Whether completion raises a desktop notification.
    pub notify_enabled: bool,
    /// Server metadata
    pub start_time: Instant,
    pub port: u16,
    pub host: String,
    /// User-configured session length; read by the engine at Start/Reset.
    duration: Mutex<DurationSetting>,
    /// Inbound channel into the engine task.
    engine_tx: mpsc::Sender<EngineInput>,
    /// Latest timer snapshot published by the engine.
    snapshot_tx: watch::Sender<TimerSnapshot>,
    /// Completion fan-out to side-effect subscribers.
    completion_tx: broadcast::Sender<Completion>,
    /// Non-fatal side-effect failures, surfaced to clients.
    errors: Mutex<Vec<String>>,
    /// Last action tracking
    last_action: Mutex<Option<String>>,
    last_action_time: Mutex<Option<DateTime<Utc>>>,
}

impl AppState {
    /// Build the shared state and the engine's input receiver.
    ///
    /// Fails only if the configured default duration is invalid.
    pub fn new(config: &Config) -> Result<(Arc<Self>, mpsc::Receiver<EngineInput>), TimerError> {
        let duration = config.default_duration()?;
        let (engine_tx, engine_rx) = mpsc::channel(64);
        let (snapshot_tx, _) = watch::channel(TimerSnapshot::pristine(duration.total_seconds()));
        let (completion_tx, _) = broadcast::channel(16);

        let state = Arc::new(Self {
            clock_strategy: config.clock,
            notify_enabled: config.notify,
            start_time: Instant::now(),
            port: config.port,
            host: config.host.clone(),
            duration: Mutex::new(duration),
            engine_tx,
            snapshot_tx,
            completion_tx,
            errors: Mutex::new(Vec::new()),
            last_action: Mutex::new(None),
            last_action_time: Mutex::new(None),
        });
        Ok((state, engine_rx))
    }

    /// A sender into the engine's input channel.
    pub fn engine_input(&self) -> mpsc::Sender<EngineInput> {
        self.engine_tx.clone()
    }

    /// Submit a user intent to the engine.
    pub async fn send_intent(&self, intent: Intent) -> Result<(), String> {
        info!("intent received: {}", intent.as_str());
        self.record_action(intent.as_str());
        self.engine_tx
            .send(EngineInput::Intent(intent))
            .await
            .map_err(|e| format!("Failed to deliver intent to engine: {}", e))
    }

    /// Validate and store a duration edit, then inform the engine.
    ///
    /// The engine decides whether the edit rebases the displayed time
    /// (pristine) or is deferred (running/paused).
    pub async fn set_duration(&self, minutes: u8, seconds: u8) -> Result<DurationSetting, TimerError> {
        let setting = DurationSetting::new(minutes, seconds)?;

        {
            let mut duration = self
                .duration
                .lock()
                .map_err(|e| TimerError::InvalidDuration(format!("state lock poisoned: {}", e)))?;
            *duration = setting;
        }
        self.record_action("duration");
        info!(
            "duration set to {}m {}s",
            setting.minutes(),
            setting.seconds()
        );

        if let Err(e) = self
            .engine_tx
            .send(EngineInput::DurationEdited(setting))
            .await
        {
            warn!("Failed to deliver duration edit to engine: {}", e);
        }
        Ok(setting)
    }

    /// Current configured duration.
    pub fn duration(&self) -> Result<DurationSetting, String> {
        self.duration
            .lock()
            .map(|d| *d)
            .map_err(|e| format!("Failed to lock duration: {}", e))
    }

    /// Publish a new snapshot. Engine-only.
    pub fn publish_snapshot(&self, snapshot: TimerSnapshot) {
        // send_replace never fails, even with zero subscribers.
        self.snapshot_tx.send_replace(snapshot);
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Subscribe to snapshot updates.
    pub fn subscribe_snapshots(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Broadcast a run-to-completion event. Engine-only, non-blocking.
    pub fn notify_completion(&self, duration_seconds: u64) {
        let completion = Completion {
            duration_seconds,
            finished_at: Utc::now(),
        };
        if self.completion_tx.send(completion).is_err() {
            debug!("no completion subscribers, alarm side effects skipped");
        }
    }

    /// Subscribe to completion events.
    pub fn subscribe_completions(&self) -> broadcast::Receiver<Completion> {
        self.completion_tx.subscribe()
    }

    /// Record a non-fatal side-effect failure for client visibility.
    pub fn add_error(&self, error: String) -> Result<(), String> {
        let mut errors = self
            .errors
            .lock()
            .map_err(|e| format!("Failed to lock errors: {}", e))?;
        warn!("recording error: {}", error);
        errors.push(error);
        Ok(())
    }

    /// Current recorded errors.
    pub fn get_errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Calculate server uptime as a formatted string
    pub fn get_uptime(&self) -> String {
        let duration = self.start_time.elapsed();
        let hours = duration.as_secs() / 3600;
        let minutes = (duration.as_secs() % 3600) / 60;
        let seconds = duration.as_secs() % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    /// Get last action information
    pub fn get_last_action(&self) -> (Option<String>, Option<DateTime<Utc>>) {
        let last_action = self.last_action.lock().ok().and_then(|a| a.clone());
        let last_action_time = self.last_action_time.lock().ok().and_then(|t| *t);
        (last_action, last_action_time)
    }

    fn record_action(&self, action: &str) {
        if let Ok(mut last_action) = self.last_action.lock() {
            *last_action = Some(action.to_string());
        }
        if let Ok(mut last_time) = self.last_action_time.lock() {
            *last_time = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            port: 0,
            host: "127.0.0.1".to_string(),
            minutes: 25,
            seconds: 0,
            clock: ClockStrategy::WallClock,
            notify: false,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn new_rejects_invalid_default_duration() {
        let mut config = test_config();
        config.minutes = 0;
        config.seconds = 0;
        assert!(AppState::new(&config).is_err());
    }

    #[tokio::test]
    async fn initial_snapshot_is_pristine_full_duration() {
        let (state, _rx) = AppState::new(&test_config()).unwrap();
        let snap = state.snapshot();
        assert_eq!(snap.remaining_seconds, 1500.0);
        assert_eq!(snap.display, "25:00");
    }

    #[tokio::test]
    async fn intents_are_forwarded_and_tracked() {
        let (state, mut rx) = AppState::new(&test_config()).unwrap();

        state.send_intent(Intent::Start).await.unwrap();
        match rx.recv().await {
            Some(EngineInput::Intent(Intent::Start)) => {}
            other => panic!("unexpected input: {:?}", other),
        }

        let (action, time) = state.get_last_action();
        assert_eq!(action.as_deref(), Some("start"));
        assert!(time.is_some());
    }

    #[tokio::test]
    async fn set_duration_validates_and_forwards() {
        let (state, mut rx) = AppState::new(&test_config()).unwrap();

        assert!(state.set_duration(60, 0).await.is_err());
        assert!(state.set_duration(0, 0).await.is_err());

        let setting = state.set_duration(1, 30).await.unwrap();
        assert_eq!(setting.total_seconds(), 90);
        assert_eq!(state.duration().unwrap().total_seconds(), 90);

        match rx.recv().await {
            Some(EngineInput::DurationEdited(d)) => assert_eq!(d.total_seconds(), 90),
            other => panic!("unexpected input: {:?}", other),
        }
    }

    #[tokio::test]
    async fn errors_accumulate() {
        let (state, _rx) = AppState::new(&test_config()).unwrap();
        state.add_error("alarm playback failed".to_string()).unwrap();
        assert_eq!(state.get_errors(), vec!["alarm playback failed".to_string()]);
    }
}
