//! Background timing worker
//!
//! An isolated actor that owns a whole countdown and reports progress at a
//! 1-second cadence. It shares no memory with the state machine: commands go
//! in, tick/done events come out. The coarse granularity trades the smooth
//! fractional display for immunity to throttling of the main context.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval};
use tracing::{debug, warn};

/// Commands accepted by the worker.
///
/// The serialized shape (`{"command":"start","durationSeconds":n}` /
/// `{"command":"stop"}`) is a wire contract and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum WorkerCommand {
    #[serde(rename_all = "camelCase")]
    Start { duration_seconds: u64 },
    Stop,
}

/// Events emitted by the worker, one per second of countdown.
///
/// Serialized as `{"type":"tick","remainingSeconds":n}` and
/// `{"type":"done"}`; part of the same wire contract as [`WorkerCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerEvent {
    #[serde(rename_all = "camelCase")]
    Tick { remaining_seconds: u64 },
    Done,
}

/// A command paired with the event channel for the session it opens.
///
/// `Start` carries a fresh sender; `Stop` carries none. The wire types stay
/// pure so their serialized shape is exactly the contract above.
struct WorkerRequest {
    command: WorkerCommand,
    events: Option<mpsc::Sender<WorkerEvent>>,
}

/// Cloneable handle to a spawned timing worker.
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    commands: mpsc::UnboundedSender<WorkerRequest>,
}

impl WorkerHandle {
    /// Spawn the worker task and return a handle to it.
    pub fn spawn() -> Self {
        let (commands, requests) = mpsc::unbounded_channel();
        tokio::spawn(worker_task(requests));
        Self { commands }
    }

    /// Start a new countdown session.
    ///
    /// Returns the event stream for this session. Any previously started
    /// session is implicitly invalidated: its sender is dropped by the
    /// worker, so its receiver sees end-of-stream instead of stale ticks.
    pub fn start(&self, duration_seconds: u64) -> mpsc::Receiver<WorkerEvent> {
        let (events, rx) = mpsc::channel(32);
        let request = WorkerRequest {
            command: WorkerCommand::Start { duration_seconds },
            events: Some(events),
        };
        if self.commands.send(request).is_err() {
            warn!("timing worker is gone; session will never tick");
        }
        rx
    }

    /// Stop the active session, if any. Idempotent.
    pub fn stop(&self) {
        let request = WorkerRequest {
            command: WorkerCommand::Stop,
            events: None,
        };
        let _ = self.commands.send(request);
    }
}

struct Session {
    id: u64,
    countdown: u64,
    events: mpsc::Sender<WorkerEvent>,
    ticker: Interval,
}

async fn next_tick(session: &mut Option<Session>) {
    match session.as_mut() {
        Some(s) => {
            s.ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn worker_task(mut requests: mpsc::UnboundedReceiver<WorkerRequest>) {
    debug!("timing worker started");
    let mut session: Option<Session> = None;
    let mut next_id: u64 = 0;

    loop {
        tokio::select! {
            request = requests.recv() => {
                let Some(request) = request else {
                    // All handles dropped, nothing can ever reach us again.
                    break;
                };
                match (request.command, request.events) {
                    (WorkerCommand::Start { duration_seconds }, Some(events)) => {
                        next_id += 1;
                        debug!(session = next_id, duration_seconds, "worker session started");
                        // First tick fires after one full second, not immediately.
                        let ticker = interval_at(
                            Instant::now() + Duration::from_secs(1),
                            Duration::from_secs(1),
                        );
                        session = Some(Session {
                            id: next_id,
                            countdown: duration_seconds,
                            events,
                            ticker,
                        });
                    }
                    (WorkerCommand::Stop, _) => {
                        if let Some(old) = session.take() {
                            debug!(session = old.id, "worker session stopped");
                        }
                    }
                    (WorkerCommand::Start { .. }, None) => {
                        warn!("start request without an event channel, ignoring");
                    }
                }
            }
            _ = next_tick(&mut session) => {
                let Some(active) = session.as_mut() else { continue };
                active.countdown = active.countdown.saturating_sub(1);
                let tick = WorkerEvent::Tick {
                    remaining_seconds: active.countdown,
                };
                if active.events.send(tick).await.is_err() {
                    // Consumer cancelled from its side; the session is dead.
                    debug!(session = active.id, "event receiver dropped, ending session");
                    session = None;
                    continue;
                }
                if active.countdown == 0 {
                    let _ = active.events.send(WorkerEvent::Done).await;
                    debug!(session = active.id, "worker session completed");
                    session = None;
                }
            }
        }
    }
    debug!("timing worker exited");
}
