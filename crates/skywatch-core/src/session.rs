// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The live session: everything between a snapshot arriving and the sink
//! being redrawn, plus the timers that pace polling.
//!
//! A [`LiveSession`] is a plain value. It owns the tracker, the selection,
//! the scheduler and the sink, and only changes when one of its methods is
//! called with the current instant. Nothing in here performs I/O; the
//! [`crate::driver`] decides when to fetch based on what these methods
//! return.
//!
//! Poll pacing works in ticks. Every [`SessionConfig::tick_interval`] the
//! countdown is updated, and once [`SessionConfig::poll_frequency_ticks`]
//! ticks have passed since the last fetch began a poll is reported as due.
//! Polls are never due while idle or backgrounded.

use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use tokio::time::Instant;

use crate::client::FeedError;
use crate::decimate::{decimate, DEFAULT_DISPLAY_BUDGET};
use crate::feed::{Snapshot, StateVector};
use crate::render::{Countdown, Notice, RenderSink, StatusIndicator};
use crate::scheduler::{Scheduler, TimerId, TimerKind};
use crate::selection::{SelectionController, DEFAULT_LIVE_REFRESH};
use crate::tracker::{AircraftTracker, ReconcileReport, DEFAULT_TRAIL_CAPACITY};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_FREQUENCY_TICKS: u32 = 5;
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub tick_interval: Duration,
    pub poll_frequency_ticks: u32,
    /// Inactivity before polling pauses.
    pub idle_timeout: Duration,
    pub display_budget: usize,
    pub trail_capacity: usize,
    /// Period of the selected aircraft's last-seen refresh.
    pub live_refresh: Duration,
    /// Drop snapshots that arrive after the session went idle.
    pub discard_results_while_idle: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            poll_frequency_ticks: DEFAULT_POLL_FREQUENCY_TICKS,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            display_budget: DEFAULT_DISPLAY_BUDGET,
            trail_capacity: DEFAULT_TRAIL_CAPACITY,
            live_refresh: DEFAULT_LIVE_REFRESH,
            discard_results_while_idle: false,
        }
    }
}

/// Whether the session is allowed to poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Active,
    /// No interaction for the idle timeout.
    Idle,
    /// The view lost visibility.
    Background,
}

fn wall_clock_now() -> i64 {
    Utc::now().timestamp()
}

#[derive(Debug)]
pub struct LiveSession<S> {
    config: SessionConfig,
    sink: S,
    tracker: AircraftTracker,
    selection: SelectionController,
    scheduler: Scheduler,
    activity: Activity,
    poll_timer: Option<TimerId>,
    idle_timer: Option<TimerId>,
    ticks_since_poll: u32,
    wall_clock: fn() -> i64,
}

impl<S: RenderSink> LiveSession<S> {
    pub fn new(config: SessionConfig, sink: S) -> Self {
        Self {
            tracker: AircraftTracker::new(config.trail_capacity),
            selection: SelectionController::new(config.live_refresh),
            scheduler: Scheduler::new(),
            activity: Activity::Active,
            poll_timer: None,
            idle_timer: None,
            ticks_since_poll: 0,
            wall_clock: wall_clock_now,
            config,
            sink,
        }
    }

    /// Replace the epoch-seconds clock used for last-seen computations.
    #[must_use]
    pub fn with_wall_clock(mut self, wall_clock: fn() -> i64) -> Self {
        self.wall_clock = wall_clock;
        self
    }

    /// Arm the poll tick and idle timers. Returns `true`: the first poll is
    /// due immediately.
    pub fn start(&mut self, now: Instant) -> bool {
        if let Some(timer) = self.poll_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.poll_timer = Some(self.scheduler.schedule_repeating(
            TimerKind::PollTick,
            self.config.tick_interval,
            now,
        ));
        self.activity = Activity::Active;
        self.arm_idle_timer(now);
        self.sink.set_status(StatusIndicator::Active);
        info!("Live session started");
        true
    }

    /// Fire every timer due at `now`. Returns `true` if a poll is due.
    pub fn advance(&mut self, now: Instant) -> bool {
        let mut poll_due = false;
        while let Some((_, kind)) = self.scheduler.pop_expired(now) {
            match kind {
                TimerKind::PollTick => poll_due = self.on_poll_tick(),
                TimerKind::IdleTimeout => {
                    self.idle_timer = None;
                    self.enter_pause(Activity::Idle);
                }
                TimerKind::LiveTick => {
                    let epoch = (self.wall_clock)();
                    self.selection
                        .on_live_tick(&self.tracker, &mut self.sink, epoch);
                }
            }
        }
        poll_due
    }

    fn on_poll_tick(&mut self) -> bool {
        self.ticks_since_poll = self.ticks_since_poll.saturating_add(1);

        if self.is_idle() {
            self.sink.set_countdown(Countdown::Blank);
            return false;
        }

        let remaining = self
            .config
            .poll_frequency_ticks
            .saturating_sub(self.ticks_since_poll);
        if remaining > 0 {
            self.sink.set_countdown(Countdown::Remaining(remaining));
            false
        } else {
            self.sink.set_countdown(Countdown::Updating);
            true
        }
    }

    fn arm_idle_timer(&mut self, now: Instant) {
        if let Some(timer) = self.idle_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.idle_timer = Some(self.scheduler.schedule_once(
            TimerKind::IdleTimeout,
            self.config.idle_timeout,
            now,
        ));
    }

    fn enter_pause(&mut self, activity: Activity) {
        if self.activity == activity {
            return;
        }
        if let Some(timer) = self.idle_timer.take() {
            self.scheduler.cancel(timer);
        }
        self.activity = activity;

        let status = if activity == Activity::Background {
            info!("View hidden, polling paused");
            StatusIndicator::Background
        } else {
            info!("No interaction for {:?}, polling paused", self.config.idle_timeout);
            StatusIndicator::Idle
        };
        self.sink.set_status(status);
        self.sink.set_countdown(Countdown::Blank);
    }

    /// Any user interaction. Leaves idle and restarts the idle timeout;
    /// polling resumes on the next tick.
    pub fn on_interaction(&mut self, now: Instant) {
        if self.activity != Activity::Active {
            info!("Activity detected, polling resumed");
            self.activity = Activity::Active;
            self.sink.set_status(StatusIndicator::Active);
        }
        self.arm_idle_timer(now);
    }

    /// Returns `true` when becoming visible, which warrants an immediate
    /// poll.
    pub fn on_visibility_changed(&mut self, visible: bool, now: Instant) -> bool {
        if visible {
            self.on_interaction(now);
            true
        } else {
            self.enter_pause(Activity::Background);
            false
        }
    }

    /// Mark the start of a fetch. Resets the countdown.
    pub fn begin_fetch(&mut self) {
        self.ticks_since_poll = 0;
        self.sink.set_status(StatusIndicator::Fetching);
    }

    /// Apply the outcome of a fetch.
    ///
    /// Returns the reconciliation report when a snapshot was applied.
    pub fn apply_outcome(
        &mut self,
        outcome: Result<Snapshot, FeedError>,
    ) -> Option<ReconcileReport> {
        match outcome {
            Ok(snapshot) => {
                if self.is_idle() && self.config.discard_results_while_idle {
                    info!(
                        "Discarding snapshot of {} aircraft received while paused",
                        snapshot.records.len()
                    );
                    return None;
                }
                self.sink.set_status(StatusIndicator::Updated);
                Some(self.on_snapshot(snapshot.records))
            }
            Err(e) if e.is_silent() => {
                debug!("Poll skipped: {e}");
                None
            }
            Err(e) => {
                let status = match e {
                    FeedError::RateLimited | FeedError::RateLimitedByServer => {
                        StatusIndicator::RateLimited
                    }
                    FeedError::AuthFailed => StatusIndicator::AuthError,
                    FeedError::Network(_) => StatusIndicator::NetworkError,
                };
                self.sink.set_status(status);
                self.sink.notify(&Notice::FeedProblem(e));
                None
            }
        }
    }

    /// Decimate and reconcile one snapshot, then bring the selection in line
    /// with it.
    pub fn on_snapshot(&mut self, records: Vec<StateVector>) -> ReconcileReport {
        let total = records.len();
        if total == 0 {
            self.sink.notify(&Notice::NoAircraft);
        } else {
            self.sink.notify(&Notice::AircraftCount(total));
        }

        let selected = self.selection.selected().map(str::to_string);
        let records = decimate(records, selected.as_deref(), self.config.display_budget);
        if records.len() < total {
            self.sink.notify(&Notice::HighTraffic {
                shown: records.len(),
                total,
            });
        }

        let report = self
            .tracker
            .reconcile(records, selected.as_deref(), &mut self.sink);

        if let Some(id) = selected {
            if report.was_removed(&id) {
                info!("Selected aircraft {id} left the feed");
                self.selection
                    .clear(&self.tracker, &mut self.sink, &mut self.scheduler);
            } else {
                let epoch = (self.wall_clock)();
                self.selection
                    .on_selected_updated(&self.tracker, &mut self.sink, epoch);
            }
        }

        report
    }

    /// Follow a tracked aircraft. `false` if it is not tracked.
    pub fn select(&mut self, icao24: &str, now: Instant) -> bool {
        let epoch = (self.wall_clock)();
        self.selection.select(
            icao24,
            &self.tracker,
            &mut self.sink,
            &mut self.scheduler,
            now,
            epoch,
        )
    }

    pub fn clear_selection(&mut self) {
        self.selection
            .clear(&self.tracker, &mut self.sink, &mut self.scheduler);
    }

    /// Tear down all state and timers. The session can be started again.
    pub fn reset(&mut self) {
        self.selection
            .clear(&self.tracker, &mut self.sink, &mut self.scheduler);
        self.tracker.clear(&mut self.sink);
        self.scheduler.clear();
        self.poll_timer = None;
        self.idle_timer = None;
        self.ticks_since_poll = 0;
        self.activity = Activity::Active;
        info!("Live session reset");
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selection.selected()
    }

    #[must_use]
    pub fn tracker(&self) -> &AircraftTracker {
        &self.tracker
    }

    #[must_use]
    pub fn activity(&self) -> Activity {
        self.activity
    }

    /// Idle or backgrounded.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.activity != Activity::Active
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.next_deadline()
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NetworkError;
    use crate::testing::RecordingSink;

    const NOW_EPOCH: i64 = 1_700_000_000;

    fn fixed_clock() -> i64 {
        NOW_EPOCH
    }

    fn session(config: SessionConfig) -> LiveSession<RecordingSink> {
        LiveSession::new(config, RecordingSink::default()).with_wall_clock(fixed_clock)
    }

    fn aircraft(id: &str, lat: f64, velocity: f64) -> StateVector {
        let mut record = StateVector::new(id)
            .with_position(lat, 0.0)
            .with_velocity(velocity);
        record.last_contact = Some(NOW_EPOCH - 3);
        record
    }

    fn snapshot(records: Vec<StateVector>) -> Result<Snapshot, FeedError> {
        Ok(Snapshot {
            records,
            server_time: Some(NOW_EPOCH),
        })
    }

    /// Advance virtual time one tick at a time, returning the tick numbers
    /// (1-based) at which a poll was due.
    async fn run_ticks(session: &mut LiveSession<RecordingSink>, ticks: u32) -> Vec<u32> {
        let mut due = Vec::new();
        for tick in 1..=ticks {
            tokio::time::advance(Duration::from_secs(1)).await;
            if session.advance(Instant::now()) {
                due.push(tick);
                session.begin_fetch();
            }
        }
        due
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_and_poll_cadence() {
        let mut session = session(SessionConfig::default());
        assert!(session.start(Instant::now()));
        session.begin_fetch();

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(!session.advance(Instant::now()));
        assert_eq!(session.sink().countdown, Some(Countdown::Remaining(4)));

        let due = run_ticks(&mut session, 9).await;
        assert_eq!(due, vec![4, 9]);
        assert_eq!(session.sink().countdown, Some(Countdown::Updating));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_stays_due_until_fetch_begins() {
        let mut session = session(SessionConfig::default());
        session.start(Instant::now());
        session.begin_fetch();

        let mut due = Vec::new();
        for _ in 0..6 {
            tokio::time::advance(Duration::from_secs(1)).await;
            due.push(session.advance(Instant::now()));
        }
        assert_eq!(due, vec![false, false, false, false, true, true]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_after_timeout_suspends_polling() {
        let mut session = session(SessionConfig::default());
        session.start(Instant::now());
        session.begin_fetch();

        tokio::time::advance(Duration::from_secs(60)).await;
        session.advance(Instant::now());
        assert_eq!(session.activity(), Activity::Idle);
        assert_eq!(session.sink().status, Some(StatusIndicator::Idle));

        assert!(run_ticks(&mut session, 20).await.is_empty());
        assert_eq!(session.sink().countdown, Some(Countdown::Blank));
    }

    #[tokio::test(start_paused = true)]
    async fn test_interaction_defers_idle_and_resumes() {
        let mut session = session(SessionConfig::default());
        session.start(Instant::now());

        tokio::time::advance(Duration::from_secs(59)).await;
        session.advance(Instant::now());
        session.on_interaction(Instant::now());
        tokio::time::advance(Duration::from_secs(59)).await;
        session.advance(Instant::now());
        assert_eq!(session.activity(), Activity::Active);

        tokio::time::advance(Duration::from_secs(1)).await;
        session.advance(Instant::now());
        assert!(session.is_idle());

        assert!(run_ticks(&mut session, 5).await.is_empty());

        session.on_interaction(Instant::now());
        assert_eq!(session.activity(), Activity::Active);
        assert_eq!(session.sink().status, Some(StatusIndicator::Active));
        // Ticks kept counting while idle, so the next tick polls.
        assert_eq!(run_ticks(&mut session, 1).await, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_visibility_pauses_and_forces_poll() {
        let mut session = session(SessionConfig::default());
        session.start(Instant::now());

        assert!(!session.on_visibility_changed(false, Instant::now()));
        assert_eq!(session.activity(), Activity::Background);
        assert_eq!(session.sink().status, Some(StatusIndicator::Background));
        assert!(run_ticks(&mut session, 10).await.is_empty());

        assert!(session.on_visibility_changed(true, Instant::now()));
        assert_eq!(session.activity(), Activity::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_while_idle_applied_by_default() {
        let mut session = session(SessionConfig::default());
        session.start(Instant::now());
        session.begin_fetch();
        session.on_visibility_changed(false, Instant::now());

        let report = session.apply_outcome(snapshot(vec![aircraft("a1", 1.0, 10.0)]));
        assert!(report.is_some());
        assert_eq!(session.tracker().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_while_idle_can_be_discarded() {
        let mut session = session(SessionConfig {
            discard_results_while_idle: true,
            ..SessionConfig::default()
        });
        session.start(Instant::now());
        session.begin_fetch();
        session.on_visibility_changed(false, Instant::now());

        assert!(session
            .apply_outcome(snapshot(vec![aircraft("a1", 1.0, 10.0)]))
            .is_none());
        assert!(session.tracker().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_statuses() {
        let mut session = session(SessionConfig::default());
        session.start(Instant::now());

        session.apply_outcome(Err(FeedError::RateLimited));
        assert_eq!(session.sink().status, Some(StatusIndicator::Active));
        assert!(session.sink().notices.is_empty());

        let cases = [
            (FeedError::RateLimitedByServer, StatusIndicator::RateLimited),
            (FeedError::AuthFailed, StatusIndicator::AuthError),
            (
                FeedError::Network(NetworkError::Status(502)),
                StatusIndicator::NetworkError,
            ),
        ];
        for (error, status) in cases {
            session.apply_outcome(Err(error.clone()));
            assert_eq!(session.sink().status, Some(status));
            assert_eq!(
                session.sink().notices.last(),
                Some(&Notice::FeedProblem(error))
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_notices() {
        let mut session = session(SessionConfig {
            display_budget: 2,
            ..SessionConfig::default()
        });

        session.on_snapshot(Vec::new());
        assert_eq!(session.sink().notices, vec![Notice::NoAircraft]);

        session.on_snapshot(vec![
            aircraft("a1", 1.0, 10.0),
            aircraft("a2", 2.0, 30.0),
            aircraft("a3", 3.0, 20.0),
        ]);
        assert_eq!(
            session.sink().notices[1..],
            [
                Notice::AircraftCount(3),
                Notice::HighTraffic { shown: 2, total: 3 }
            ]
        );
        assert!(!session.tracker().contains("a1"));
        assert_eq!(session.sink().live_markers(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selected_aircraft_survives_decimation() {
        let mut session = session(SessionConfig {
            display_budget: 1,
            ..SessionConfig::default()
        });
        session.on_snapshot(vec![aircraft("a1", 1.0, 100.0)]);
        session.on_snapshot(vec![aircraft("a1", 1.0, 100.0), aircraft("a2", 2.0, 50.0)]);
        assert!(session.tracker().contains("a1"));

        // a2 was decimated away, so it cannot be selected yet.
        assert!(!session.select("a2", Instant::now()));
        assert!(session.select("a1", Instant::now()));

        session.on_snapshot(vec![aircraft("a1", 1.5, 10.0), aircraft("a2", 2.0, 50.0)]);
        assert!(session.tracker().contains("a1"));
        assert_eq!(session.selected(), Some("a1"));
        assert_eq!(session.sink().trail.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_cleared_when_aircraft_vanishes() {
        let mut session = session(SessionConfig::default());
        session.on_snapshot(vec![aircraft("a1", 1.0, 10.0), aircraft("a2", 2.0, 10.0)]);
        session.on_snapshot(vec![aircraft("a1", 1.1, 10.0), aircraft("a2", 2.0, 10.0)]);
        assert!(session.select("a1", Instant::now()));
        assert!(session.sink().trail.is_some());

        session.on_snapshot(vec![aircraft("a2", 2.0, 10.0)]);

        assert_eq!(session.selected(), None);
        assert!(session.sink().detail.is_none());
        assert!(session.sink().trail.is_none());
        assert_eq!(session.next_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_ticker_runs_only_while_selected() {
        let mut session = session(SessionConfig::default());
        session.on_snapshot(vec![aircraft("a1", 1.0, 10.0)]);
        session.select("a1", Instant::now());

        run_ticks(&mut session, 3).await;
        assert_eq!(session.sink().last_seen_updates(), 3);

        session.clear_selection();
        run_ticks(&mut session, 3).await;
        assert_eq!(session.sink().last_seen_updates(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_tears_down_everything() {
        let mut session = session(SessionConfig::default());
        session.start(Instant::now());
        session.on_snapshot(vec![aircraft("a1", 1.0, 10.0), aircraft("a2", 2.0, 10.0)]);
        session.select("a1", Instant::now());

        session.reset();

        assert!(session.tracker().is_empty());
        assert_eq!(session.selected(), None);
        assert_eq!(session.sink().live_markers(), 0);
        assert_eq!(session.next_deadline(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_sessions() {
        let mut first = session(SessionConfig::default());
        let second = session(SessionConfig::default());
        first.on_snapshot(vec![aircraft("a1", 1.0, 10.0)]);
        assert_eq!(first.tracker().len(), 1);
        assert!(second.tracker().is_empty());
    }
}
