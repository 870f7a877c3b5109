//! Clock source strategies
//!
//! A [`ClockSource`] turns a remaining-time budget into a live, cancellable
//! stream of samples (a [`ClockSession`]). Three interchangeable strategies
//! exist; all end the stream with a terminal [`ClockEvent::Done`] when the
//! countdown reaches zero.

use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant};
use tracing::debug;

use super::worker::{WorkerEvent, WorkerHandle};

/// Cadence of the interval and wall-clock strategies.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Selectable timing strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClockStrategy {
    /// Count ticks at a fixed 100 ms cadence. Drifts under scheduling jitter.
    Interval,
    /// Compute remaining time from elapsed wall clock on every sample.
    /// Self-corrects after jitter; the default.
    WallClock,
    /// Delegate the countdown to the background worker actor at 1-second
    /// resolution. Survives throttling of the main context.
    Worker,
}

/// One sample of the countdown, or its end.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClockEvent {
    /// Remaining seconds, non-negative.
    Sample(f64),
    /// The countdown reached zero; no further samples follow.
    Done,
}

/// A clock strategy plus the worker it delegates to, if any.
#[derive(Debug)]
pub struct ClockSource {
    strategy: ClockStrategy,
    worker: Option<WorkerHandle>,
}

impl ClockSource {
    /// Build a source for the given strategy, spawning the worker actor when
    /// the worker strategy is selected.
    pub fn new(strategy: ClockStrategy) -> Self {
        let worker = match strategy {
            ClockStrategy::Worker => Some(WorkerHandle::spawn()),
            _ => None,
        };
        Self { strategy, worker }
    }

    pub fn strategy(&self) -> ClockStrategy {
        self.strategy
    }

    /// Activate a fresh session counting down from `remaining_seconds`.
    ///
    /// Each activation is an independent sequence. The caller is responsible
    /// for cancelling any previous session first; for the worker strategy the
    /// actor additionally invalidates its own prior session on start.
    pub fn activate(&self, remaining_seconds: f64) -> ClockSession {
        let remaining_seconds = remaining_seconds.max(0.0);
        let (events_tx, events) = mpsc::channel(32);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        debug!(strategy = ?self.strategy, remaining_seconds, "activating clock session");

        let mut worker = None;
        match self.strategy {
            ClockStrategy::Interval => {
                tokio::spawn(run_interval_session(remaining_seconds, events_tx, cancel_rx));
            }
            ClockStrategy::WallClock => {
                tokio::spawn(run_wall_clock_session(remaining_seconds, events_tx, cancel_rx));
            }
            ClockStrategy::Worker => {
                if let Some(handle) = &self.worker {
                    // Whole-second granularity; round up so short remainders
                    // still get a final second.
                    let worker_events = handle.start(remaining_seconds.ceil() as u64);
                    tokio::spawn(relay_worker_session(worker_events, events_tx));
                    worker = Some(handle.clone());
                }
            }
        }

        ClockSession {
            events,
            cancel: Some(cancel_tx),
            worker,
            started_at: Instant::now(),
            base_remaining: remaining_seconds,
        }
    }
}

/// The live activation of a clock strategy for one running period.
///
/// At most one session may be alive per state machine; see
/// [`ClockSource::activate`].
#[derive(Debug)]
pub struct ClockSession {
    events: mpsc::Receiver<ClockEvent>,
    cancel: Option<watch::Sender<bool>>,
    worker: Option<WorkerHandle>,
    started_at: Instant,
    base_remaining: f64,
}

impl ClockSession {
    /// Next sample or terminal event; `None` once the session has ended or
    /// been cancelled.
    pub async fn next(&mut self) -> Option<ClockEvent> {
        self.events.recv().await
    }

    /// Remaining time computed from the monotonic clock right now, clamped
    /// at zero.
    ///
    /// Used to capture a precise value at pause time instead of the last
    /// scheduled sample, whatever the strategy's granularity.
    pub fn remaining_now(&self) -> f64 {
        (self.base_remaining - self.started_at.elapsed().as_secs_f64()).max(0.0)
    }

    /// Cancel the session. Idempotent; late ticks from the torn-down
    /// producer are discarded, never observed by the consumer.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(true);
        }
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
        self.events.close();
    }
}

async fn run_interval_session(
    duration: f64,
    events: mpsc::Sender<ClockEvent>,
    mut cancel: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + SAMPLE_INTERVAL, SAMPLE_INTERVAL);
    let mut tick_index: u64 = 0;
    loop {
        tokio::select! {
            // Resolves on explicit cancel and when the session is dropped.
            _ = cancel.changed() => break,
            _ = ticker.tick() => {
                tick_index += 1;
                let remaining = duration - tick_index as f64 * 0.1;
                if remaining <= 0.0 {
                    let _ = events.send(ClockEvent::Sample(0.0)).await;
                    let _ = events.send(ClockEvent::Done).await;
                    break;
                }
                if events.send(ClockEvent::Sample(remaining)).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn run_wall_clock_session(
    duration: f64,
    events: mpsc::Sender<ClockEvent>,
    mut cancel: watch::Receiver<bool>,
) {
    let started = Instant::now();
    let mut ticker = interval_at(started + SAMPLE_INTERVAL, SAMPLE_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.changed() => break,
            _ = ticker.tick() => {
                let remaining = duration - started.elapsed().as_secs_f64();
                if remaining <= 0.0 {
                    let _ = events.send(ClockEvent::Sample(0.0)).await;
                    let _ = events.send(ClockEvent::Done).await;
                    break;
                }
                if events.send(ClockEvent::Sample(remaining)).await.is_err() {
                    break;
                }
            }
        }
    }
}

async fn relay_worker_session(
    mut worker_events: mpsc::Receiver<WorkerEvent>,
    events: mpsc::Sender<ClockEvent>,
) {
    while let Some(event) = worker_events.recv().await {
        let mapped = match event {
            WorkerEvent::Tick { remaining_seconds } => ClockEvent::Sample(remaining_seconds as f64),
            WorkerEvent::Done => ClockEvent::Done,
        };
        if events.send(mapped).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn collect(session: &mut ClockSession) -> Vec<ClockEvent> {
        let mut out = Vec::new();
        while let Some(event) = session.next().await {
            let done = event == ClockEvent::Done;
            out.push(event);
            if done {
                break;
            }
        }
        out
    }

    fn samples(events: &[ClockEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                ClockEvent::Sample(v) => Some(*v),
                ClockEvent::Done => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn wall_clock_session_counts_down_to_zero() {
        let source = ClockSource::new(ClockStrategy::WallClock);
        let mut session = source.activate(0.5);

        let events = collect(&mut session).await;
        let values = samples(&events);

        assert_eq!(events.last(), Some(&ClockEvent::Done));
        assert!(values.windows(2).all(|w| w[1] < w[0]), "samples must decrease: {values:?}");
        assert_eq!(*values.last().unwrap(), 0.0);
        assert!(values[0] < 0.5);
    }

    #[tokio::test(start_paused = true)]
    async fn interval_session_counts_ticks() {
        let source = ClockSource::new(ClockStrategy::Interval);
        let mut session = source.activate(0.3);

        let events = collect(&mut session).await;
        let values = samples(&events);

        assert_eq!(events.last(), Some(&ClockEvent::Done));
        assert_eq!(*values.last().unwrap(), 0.0);
        // 0.3s at 100ms cadence: two fractional samples then the zero.
        assert_eq!(values.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn worker_session_relays_whole_seconds() {
        let source = ClockSource::new(ClockStrategy::Worker);
        let mut session = source.activate(3.0);

        let events = collect(&mut session).await;
        assert_eq!(
            events,
            vec![
                ClockEvent::Sample(2.0),
                ClockEvent::Sample(1.0),
                ClockEvent::Sample(0.0),
                ClockEvent::Done,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_ends_the_stream_without_done() {
        let source = ClockSource::new(ClockStrategy::WallClock);
        let mut session = source.activate(60.0);

        let first = session.next().await;
        assert!(matches!(first, Some(ClockEvent::Sample(_))));

        session.cancel();
        session.cancel(); // idempotent

        // Whatever drains now is buffered backlog; the stream must end and
        // must never deliver a Done.
        while let Some(event) = session.next().await {
            assert!(matches!(event, ClockEvent::Sample(_)));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_now_tracks_elapsed_time() {
        let source = ClockSource::new(ClockStrategy::WallClock);
        let session = source.activate(300.0);

        tokio::time::advance(Duration::from_secs(150)).await;

        let remaining = session.remaining_now();
        assert!((remaining - 150.0).abs() < 1e-6, "got {remaining}");
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_now_clamps_at_zero() {
        let source = ClockSource::new(ClockStrategy::WallClock);
        let session = source.activate(1.0);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(session.remaining_now(), 0.0);
    }
}
