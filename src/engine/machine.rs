//! Timer state machine
//!
//! One background task owns the whole machine: phase, remaining time and the
//! active clock session. Everything reaches it as a message (intents and
//! duration edits in, snapshots and completions out), so there is never a
//! second writer and never a second live tick source.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::state::{AppState, TimerPhase, TimerSnapshot};

use super::clock::{ClockEvent, ClockSession, ClockSource};
use super::intent::{EngineInput, Intent};

/// Run the timer engine until every input sender is dropped.
pub async fn timer_engine_task(state: Arc<AppState>, mut inputs: mpsc::Receiver<EngineInput>) {
    info!("starting timer engine");

    let source = ClockSource::new(state.clock_strategy);
    let duration_seconds = match state.duration() {
        Ok(d) => d.total_seconds(),
        Err(e) => {
            warn!("failed to read configured duration: {}", e);
            0
        }
    };

    let mut machine = Machine {
        state,
        source,
        phase: TimerPhase::Pristine,
        duration_seconds,
        remaining: duration_seconds as f64,
        session: None,
    };
    machine.publish();

    loop {
        tokio::select! {
            input = inputs.recv() => {
                let Some(input) = input else { break };
                match input {
                    EngineInput::Intent(intent) => machine.apply_intent(intent),
                    EngineInput::DurationEdited(setting) => {
                        machine.apply_duration_edit(setting.total_seconds())
                    }
                }
            }
            event = next_clock_event(&mut machine.session) => {
                machine.apply_clock_event(event);
            }
        }
    }

    machine.clear_session();
    info!("timer engine stopped");
}

async fn next_clock_event(session: &mut Option<ClockSession>) -> Option<ClockEvent> {
    match session.as_mut() {
        Some(s) => s.next().await,
        None => std::future::pending().await,
    }
}

struct Machine {
    state: Arc<AppState>,
    source: ClockSource,
    phase: TimerPhase,
    /// Total length of the session in progress, captured at Start/Reset.
    duration_seconds: u64,
    remaining: f64,
    session: Option<ClockSession>,
}

impl Machine {
    fn apply_intent(&mut self, intent: Intent) {
        match (self.phase, intent) {
            (TimerPhase::Pristine, Intent::Start) => {
                self.duration_seconds = self.configured_total();
                if self.duration_seconds == 0 {
                    warn!("refusing to start a zero-length session");
                    return;
                }
                self.remaining = self.duration_seconds as f64;
                self.activate_session();
                self.phase = TimerPhase::Running;
                info!(duration_seconds = self.duration_seconds, "timer started");
            }
            (TimerPhase::Paused, Intent::Resume) => {
                // Resume counts down from the frozen remaining value, not the
                // full duration.
                self.activate_session();
                self.phase = TimerPhase::Running;
                info!(remaining = self.remaining, "timer resumed");
            }
            (TimerPhase::Running, Intent::Pause) => {
                // Capture the instantaneous value, not the last scheduled
                // sample, so Resume restarts from a precise point.
                if let Some(session) = self.session.as_ref() {
                    self.remaining = session.remaining_now();
                }
                self.clear_session();
                self.phase = TimerPhase::Paused;
                info!(remaining = self.remaining, "timer paused");
            }
            (_, Intent::Reset) => {
                self.clear_session();
                self.duration_seconds = self.configured_total();
                self.remaining = self.duration_seconds as f64;
                self.phase = TimerPhase::Pristine;
                info!(duration_seconds = self.duration_seconds, "timer reset");
            }
            (phase, intent) => {
                debug!(?phase, intent = intent.as_str(), "intent has no effect in this phase");
            }
        }
        self.publish();
    }

    /// Duration edits rebase the displayed remaining time only while
    /// pristine. A running or paused countdown keeps its captured total; the
    /// edit takes effect at the next Start or Reset.
    fn apply_duration_edit(&mut self, total_seconds: u64) {
        match self.phase {
            TimerPhase::Pristine => {
                self.duration_seconds = total_seconds;
                self.remaining = total_seconds as f64;
                debug!(total_seconds, "duration edited");
                self.publish();
            }
            _ => {
                debug!(total_seconds, phase = ?self.phase, "duration edit deferred until reset");
            }
        }
    }

    fn apply_clock_event(&mut self, event: Option<ClockEvent>) {
        if !self.phase.is_running() {
            // A sample can only race ahead of a just-processed transition;
            // the cancelled session is already closed, drop it on the floor.
            return;
        }
        match event {
            Some(ClockEvent::Sample(remaining)) => {
                self.remaining = remaining.max(0.0);
                if self.remaining <= 0.0 {
                    self.complete();
                } else {
                    self.publish();
                }
            }
            Some(ClockEvent::Done) => {
                self.remaining = 0.0;
                self.complete();
            }
            None => {
                // The producer died without reaching zero. Freeze instead of
                // guessing; the user can resume or reset.
                warn!("clock session ended unexpectedly, pausing");
                if let Some(session) = self.session.as_ref() {
                    self.remaining = session.remaining_now();
                }
                self.clear_session();
                self.phase = TimerPhase::Paused;
                self.publish();
            }
        }
    }

    /// One-shot per run-to-completion: only reachable while Running, and the
    /// first call moves the phase back to Pristine.
    fn complete(&mut self) {
        self.clear_session();
        self.phase = TimerPhase::Pristine;
        let completed_duration = self.duration_seconds;
        self.remaining = self.duration_seconds as f64;
        info!(duration_seconds = completed_duration, "session ran to completion");
        // Broadcast is non-blocking: a slow or failing alarm can never hold
        // up the transition back to pristine.
        self.state.notify_completion(completed_duration);
        self.publish();
    }

    fn activate_session(&mut self) {
        // Exactly one live session: cancellation of the old one is guaranteed
        // before the new one exists.
        self.clear_session();
        self.session = Some(self.source.activate(self.remaining));
    }

    fn clear_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.cancel();
        }
    }

    fn configured_total(&self) -> u64 {
        match self.state.duration() {
            Ok(d) => d.total_seconds(),
            Err(e) => {
                warn!("failed to read configured duration, keeping previous: {}", e);
                self.duration_seconds
            }
        }
    }

    fn publish(&self) {
        self.state
            .publish_snapshot(TimerSnapshot::new(self.phase, self.remaining, self.duration_seconds));
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use crate::config::Config;
    use crate::engine::clock::ClockStrategy;
    use crate::state::DurationSetting;

    use super::*;

    fn test_config(minutes: u8, seconds: u8, clock: ClockStrategy) -> Config {
        Config {
            port: 0,
            host: "127.0.0.1".to_string(),
            minutes,
            seconds,
            clock,
            notify: false,
            verbose: false,
        }
    }

    async fn spawn_engine(
        minutes: u8,
        seconds: u8,
        clock: ClockStrategy,
    ) -> (Arc<AppState>, mpsc::Sender<EngineInput>) {
        let (state, inputs) = AppState::new(&test_config(minutes, seconds, clock)).unwrap();
        let engine_state = Arc::clone(&state);
        tokio::spawn(async move {
            timer_engine_task(engine_state, inputs).await;
        });
        let tx = state.engine_input();
        // Wait for the engine's initial snapshot publish.
        settle().await;
        (state, tx)
    }

    /// Let the engine drain its inbox. With the paused clock, a sleep only
    /// resolves once every task is idle.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    async fn wait_for_phase(state: &Arc<AppState>, phase: TimerPhase) -> TimerSnapshot {
        let mut snapshots = state.subscribe_snapshots();
        loop {
            let snap = snapshots.borrow_and_update().clone();
            if snap.phase == phase {
                return snap;
            }
            snapshots.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_to_completion_and_returns_to_pristine() {
        let (state, tx) = spawn_engine(0, 2, ClockStrategy::WallClock).await;
        let mut completions = state.subscribe_completions();

        tx.send(EngineInput::Intent(Intent::Start)).await.unwrap();

        let mut snapshots = state.subscribe_snapshots();
        let mut last_running = f64::INFINITY;
        loop {
            snapshots.changed().await.unwrap();
            let snap = snapshots.borrow_and_update().clone();
            match snap.phase {
                TimerPhase::Running => {
                    assert!(
                        snap.remaining_seconds <= last_running,
                        "remaining must never increase while running"
                    );
                    last_running = snap.remaining_seconds;
                }
                TimerPhase::Pristine => break,
                TimerPhase::Paused => panic!("unexpected pause"),
            }
        }

        let snap = state.snapshot();
        assert_eq!(snap.phase, TimerPhase::Pristine);
        assert_eq!(snap.remaining_seconds, 2.0);

        let completion = completions.recv().await.unwrap();
        assert_eq!(completion.duration_seconds, 2);
        assert!(completions.try_recv().is_err(), "completion must fire exactly once");
    }

    #[tokio::test(start_paused = true)]
    async fn pause_freezes_and_resume_continues_from_captured_value() {
        let (state, tx) = spawn_engine(5, 0, ClockStrategy::WallClock).await;

        tx.send(EngineInput::Intent(Intent::Start)).await.unwrap();
        wait_for_phase(&state, TimerPhase::Running).await;

        tokio::time::advance(Duration::from_secs(150)).await;

        tx.send(EngineInput::Intent(Intent::Pause)).await.unwrap();
        let paused = wait_for_phase(&state, TimerPhase::Paused).await;
        assert!(
            (paused.remaining_seconds - 150.0).abs() < 1.0,
            "expected ~150, got {}",
            paused.remaining_seconds
        );
        assert_eq!(paused.display, "2:30");

        // Time passing while paused changes nothing.
        tokio::time::advance(Duration::from_secs(30)).await;
        settle().await;
        let still_paused = state.snapshot();
        assert_eq!(still_paused.phase, TimerPhase::Paused);
        assert_eq!(still_paused.remaining_seconds, paused.remaining_seconds);

        tx.send(EngineInput::Intent(Intent::Resume)).await.unwrap();
        let mut snapshots = state.subscribe_snapshots();
        // The first running samples continue from ~150, not from 300.
        loop {
            snapshots.changed().await.unwrap();
            let snap = snapshots.borrow_and_update().clone();
            if snap.phase == TimerPhase::Running && snap.remaining_seconds < paused.remaining_seconds
            {
                assert!(snap.remaining_seconds > 140.0, "resumed from {}", snap.remaining_seconds);
                break;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reset_restores_full_duration_from_any_phase() {
        let (state, tx) = spawn_engine(1, 0, ClockStrategy::WallClock).await;

        // From running.
        tx.send(EngineInput::Intent(Intent::Start)).await.unwrap();
        wait_for_phase(&state, TimerPhase::Running).await;
        tokio::time::advance(Duration::from_secs(10)).await;
        tx.send(EngineInput::Intent(Intent::Reset)).await.unwrap();
        let snap = wait_for_phase(&state, TimerPhase::Pristine).await;
        assert_eq!(snap.remaining_seconds, 60.0);

        // From paused.
        tx.send(EngineInput::Intent(Intent::Start)).await.unwrap();
        wait_for_phase(&state, TimerPhase::Running).await;
        tokio::time::advance(Duration::from_secs(5)).await;
        tx.send(EngineInput::Intent(Intent::Pause)).await.unwrap();
        wait_for_phase(&state, TimerPhase::Paused).await;
        tx.send(EngineInput::Intent(Intent::Reset)).await.unwrap();
        let snap = wait_for_phase(&state, TimerPhase::Pristine).await;
        assert_eq!(snap.remaining_seconds, 60.0);

        // From pristine it is a no-op that still holds the invariant.
        tx.send(EngineInput::Intent(Intent::Reset)).await.unwrap();
        settle().await;
        let snap = state.snapshot();
        assert_eq!(snap.phase, TimerPhase::Pristine);
        assert_eq!(snap.remaining_seconds, 60.0);
    }

    #[tokio::test(start_paused = true)]
    async fn duration_edit_is_deferred_while_running() {
        let (state, tx) = spawn_engine(5, 0, ClockStrategy::WallClock).await;

        tx.send(EngineInput::Intent(Intent::Start)).await.unwrap();
        wait_for_phase(&state, TimerPhase::Running).await;

        let edited = DurationSetting::new(1, 30).unwrap();
        tx.send(EngineInput::DurationEdited(edited)).await.unwrap();
        settle().await;

        // The live countdown keeps its captured total.
        assert_eq!(state.snapshot().duration_seconds, 300);

        tx.send(EngineInput::Intent(Intent::Reset)).await.unwrap();
        let snap = wait_for_phase(&state, TimerPhase::Pristine).await;
        // Reset reads the configured model, which the edit did not change
        // here; edits flow through AppState::set_duration in production.
        assert_eq!(snap.duration_seconds, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn duration_edit_rebases_while_pristine() {
        let (state, tx) = spawn_engine(5, 0, ClockStrategy::WallClock).await;

        let edited = DurationSetting::new(1, 30).unwrap();
        tx.send(EngineInput::DurationEdited(edited)).await.unwrap();
        settle().await;

        let snap = state.snapshot();
        assert_eq!(snap.phase, TimerPhase::Pristine);
        assert_eq!(snap.duration_seconds, 90);
        assert_eq!(snap.remaining_seconds, 90.0);
        assert_eq!(snap.display, "1:30");
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_and_misplaced_intents_are_idempotent() {
        let (state, tx) = spawn_engine(5, 0, ClockStrategy::WallClock).await;

        tx.send(EngineInput::Intent(Intent::Start)).await.unwrap();
        wait_for_phase(&state, TimerPhase::Running).await;
        tokio::time::advance(Duration::from_secs(50)).await;

        // A second Start while running must not restart the countdown.
        tx.send(EngineInput::Intent(Intent::Start)).await.unwrap();
        settle().await;
        let snap = state.snapshot();
        assert_eq!(snap.phase, TimerPhase::Running);
        assert!(snap.remaining_seconds < 260.0, "countdown restarted: {}", snap.remaining_seconds);

        // Resume while running and Pause while paused are no-ops too.
        tx.send(EngineInput::Intent(Intent::Resume)).await.unwrap();
        tx.send(EngineInput::Intent(Intent::Pause)).await.unwrap();
        let paused = wait_for_phase(&state, TimerPhase::Paused).await;
        tx.send(EngineInput::Intent(Intent::Pause)).await.unwrap();
        settle().await;
        assert_eq!(state.snapshot().remaining_seconds, paused.remaining_seconds);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_transitions_keep_a_single_decreasing_sequence() {
        let (state, tx) = spawn_engine(5, 0, ClockStrategy::WallClock).await;

        for _ in 0..3 {
            tx.send(EngineInput::Intent(Intent::Start)).await.unwrap();
            tx.send(EngineInput::Intent(Intent::Pause)).await.unwrap();
            tx.send(EngineInput::Intent(Intent::Resume)).await.unwrap();
        }

        let mut snapshots = state.subscribe_snapshots();
        let mut last = f64::INFINITY;
        let mut observed = 0;
        while observed < 10 {
            timeout(Duration::from_secs(5), snapshots.changed())
                .await
                .expect("engine stopped emitting")
                .unwrap();
            let snap = snapshots.borrow_and_update().clone();
            if snap.phase == TimerPhase::Running {
                // Two live sessions would interleave two decreasing
                // sequences and show up here as an increase.
                assert!(
                    snap.remaining_seconds <= last + 1e-9,
                    "remaining increased: {} -> {}",
                    last,
                    snap.remaining_seconds
                );
                last = snap.remaining_seconds;
                observed += 1;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn worker_strategy_runs_to_completion() {
        let (state, tx) = spawn_engine(0, 3, ClockStrategy::Worker).await;
        let mut completions = state.subscribe_completions();

        tx.send(EngineInput::Intent(Intent::Start)).await.unwrap();
        let snap = wait_for_phase(&state, TimerPhase::Running).await;
        assert_eq!(snap.display, "0:03");

        let snap = wait_for_phase(&state, TimerPhase::Pristine).await;
        assert_eq!(snap.remaining_seconds, 3.0);

        let completion = completions.recv().await.unwrap();
        assert_eq!(completion.duration_seconds, 3);
        assert!(completions.try_recv().is_err());
    }
}
