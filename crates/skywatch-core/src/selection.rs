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

//! Selected-aircraft state: detail panel, trail overlay and the live
//! last-seen ticker.

use std::time::Duration;

use log::{debug, info};
use tokio::time::Instant;

use crate::presentation::{detail_view, LastSeenView};
use crate::render::RenderSink;
use crate::scheduler::{Scheduler, TimerId, TimerKind};
use crate::tracker::{AircraftTracker, TrackedAircraft};

/// Default refresh period of the last-seen text.
pub const DEFAULT_LIVE_REFRESH: Duration = Duration::from_secs(1);

/// Minimum trail length worth drawing as a line.
const MIN_TRAIL_POINTS: usize = 2;

#[derive(Debug)]
pub struct SelectionController {
    selected: Option<String>,
    live_timer: Option<TimerId>,
    trail_drawn: bool,
    refresh_interval: Duration,
}

impl Default for SelectionController {
    fn default() -> Self {
        Self::new(DEFAULT_LIVE_REFRESH)
    }
}

impl SelectionController {
    #[must_use]
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            selected: None,
            live_timer: None,
            trail_drawn: false,
            refresh_interval,
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn live_timer(&self) -> Option<TimerId> {
        self.live_timer
    }

    /// Select a tracked aircraft.
    ///
    /// Untracked identifiers are ignored and `false` is returned. Selecting
    /// the current selection again just refreshes it and restarts the ticker.
    pub fn select<S: RenderSink>(
        &mut self,
        icao24: &str,
        tracker: &AircraftTracker,
        sink: &mut S,
        scheduler: &mut Scheduler,
        now: Instant,
        now_epoch_secs: i64,
    ) -> bool {
        let Some(aircraft) = tracker.get(icao24) else {
            debug!("Ignoring selection of untracked aircraft {icao24}");
            return false;
        };

        if let Some(previous) = self.selected.replace(icao24.to_string()) {
            if previous != icao24 {
                tracker.refresh_marker(&previous, false, sink);
            }
        }
        tracker.refresh_marker(icao24, true, sink);

        self.render(aircraft, sink, now_epoch_secs);

        if let Some(timer) = self.live_timer.take() {
            scheduler.cancel(timer);
        }
        self.live_timer = Some(scheduler.schedule_repeating(
            TimerKind::LiveTick,
            self.refresh_interval,
            now,
        ));

        info!("Selected aircraft {icao24}");
        true
    }

    /// Drop the selection and everything drawn for it. No-op when nothing
    /// is selected.
    pub fn clear<S: RenderSink>(
        &mut self,
        tracker: &AircraftTracker,
        sink: &mut S,
        scheduler: &mut Scheduler,
    ) {
        let Some(previous) = self.selected.take() else {
            return;
        };

        if let Some(timer) = self.live_timer.take() {
            scheduler.cancel(timer);
        }
        if self.trail_drawn {
            sink.remove_trail();
            self.trail_drawn = false;
        }
        sink.hide_detail();
        tracker.refresh_marker(&previous, false, sink);

        info!("Cleared selection of {previous}");
    }

    /// Re-render detail and trail after the selected aircraft was updated.
    pub fn on_selected_updated<S: RenderSink>(
        &mut self,
        tracker: &AircraftTracker,
        sink: &mut S,
        now_epoch_secs: i64,
    ) {
        let Some(aircraft) = self.selected.as_deref().and_then(|id| tracker.get(id)) else {
            return;
        };
        self.render(aircraft, sink, now_epoch_secs);
    }

    /// Recompute the last-seen text from the wall clock.
    pub fn on_live_tick<S: RenderSink>(
        &self,
        tracker: &AircraftTracker,
        sink: &mut S,
        now_epoch_secs: i64,
    ) {
        let Some(aircraft) = self.selected.as_deref().and_then(|id| tracker.get(id)) else {
            return;
        };
        let view = LastSeenView::new(aircraft.record().last_contact, now_epoch_secs);
        sink.update_last_seen(&view);
    }

    fn render<S: RenderSink>(
        &mut self,
        aircraft: &TrackedAircraft,
        sink: &mut S,
        now_epoch_secs: i64,
    ) {
        sink.show_detail(&detail_view(aircraft.record(), now_epoch_secs));

        let trail = aircraft.trail();
        if trail.len() >= MIN_TRAIL_POINTS {
            sink.draw_trail(&trail.points());
            self.trail_drawn = true;
        } else if self.trail_drawn {
            sink.remove_trail();
            self.trail_drawn = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::StateVector;
    use crate::testing::{RecordingSink, SinkEvent};

    const NOW_EPOCH: i64 = 1_700_000_000;

    struct Fixture {
        tracker: AircraftTracker,
        sink: RecordingSink,
        scheduler: Scheduler,
        selection: SelectionController,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tracker: AircraftTracker::default(),
                sink: RecordingSink::default(),
                scheduler: Scheduler::new(),
                selection: SelectionController::default(),
            }
        }

        fn feed(&mut self, records: Vec<StateVector>) {
            let selected = self.selection.selected().map(str::to_string);
            self.tracker
                .reconcile(records, selected.as_deref(), &mut self.sink);
        }

        fn select(&mut self, id: &str) -> bool {
            self.selection.select(
                id,
                &self.tracker,
                &mut self.sink,
                &mut self.scheduler,
                Instant::now(),
                NOW_EPOCH,
            )
        }
    }

    fn seen(id: &str, lat: f64, last_contact: i64) -> StateVector {
        let mut record = StateVector::new(id).with_position(lat, 0.0);
        record.last_contact = Some(last_contact);
        record
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_untracked_is_noop() {
        let mut fx = Fixture::new();
        assert!(!fx.select("nobody"));
        assert!(fx.selection.selected().is_none());
        assert!(fx.sink.events.is_empty());
        assert!(fx.scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_select_shows_detail_and_starts_ticker() {
        let mut fx = Fixture::new();
        fx.feed(vec![seen("a1", 1.0, NOW_EPOCH - 12)]);

        assert!(fx.select("a1"));
        assert_eq!(fx.selection.selected(), Some("a1"));
        assert_eq!(fx.sink.detail.as_ref().unwrap().hex, "Hex: A1");
        assert_eq!(fx.sink.last_seen.unwrap().seconds_ago, Some(12));
        assert_eq!(fx.sink.selected_markers(), vec!["a1".to_string()]);
        // One point is not a line.
        assert!(fx.sink.trail.is_none());
        assert!(fx.scheduler.is_armed(fx.selection.live_timer().unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reselect_replaces_ticker_and_highlight() {
        let mut fx = Fixture::new();
        fx.feed(vec![seen("a1", 1.0, NOW_EPOCH), seen("a2", 2.0, NOW_EPOCH)]);

        fx.select("a1");
        let first_timer = fx.selection.live_timer().unwrap();
        fx.select("a2");

        assert!(!fx.scheduler.is_armed(first_timer));
        assert_eq!(fx.scheduler.len(), 1);
        assert_eq!(fx.sink.selected_markers(), vec!["a2".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trail_drawn_once_two_points_exist() {
        let mut fx = Fixture::new();
        fx.feed(vec![seen("a1", 1.0, NOW_EPOCH)]);
        fx.select("a1");
        fx.feed(vec![seen("a1", 1.5, NOW_EPOCH)]);
        fx.selection
            .on_selected_updated(&fx.tracker, &mut fx.sink, NOW_EPOCH);

        assert_eq!(fx.sink.trail.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switching_to_short_trail_removes_old_overlay() {
        let mut fx = Fixture::new();
        fx.feed(vec![seen("a1", 1.0, NOW_EPOCH)]);
        fx.feed(vec![seen("a1", 1.5, NOW_EPOCH), seen("a2", 2.0, NOW_EPOCH)]);

        fx.select("a1");
        assert!(fx.sink.trail.is_some());
        fx.select("a2");
        assert!(fx.sink.trail.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_tears_everything_down() {
        let mut fx = Fixture::new();
        fx.feed(vec![seen("a1", 1.0, NOW_EPOCH)]);
        fx.feed(vec![seen("a1", 1.5, NOW_EPOCH)]);
        fx.select("a1");

        fx.selection
            .clear(&fx.tracker, &mut fx.sink, &mut fx.scheduler);

        assert!(fx.selection.selected().is_none());
        assert!(fx.scheduler.is_empty());
        assert!(fx.sink.detail.is_none());
        assert!(fx.sink.trail.is_none());
        assert!(fx.sink.selected_markers().is_empty());

        // Second clear has nothing to do.
        let events = fx.sink.events.len();
        fx.selection
            .clear(&fx.tracker, &mut fx.sink, &mut fx.scheduler);
        assert_eq!(fx.sink.events.len(), events);
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_tick_recomputes_last_seen() {
        let mut fx = Fixture::new();
        fx.feed(vec![seen("a1", 1.0, NOW_EPOCH - 299)]);
        fx.select("a1");

        fx.selection
            .on_live_tick(&fx.tracker, &mut fx.sink, NOW_EPOCH + 2);

        let view = fx.sink.last_seen.unwrap();
        assert_eq!(view.seconds_ago, Some(301));
        assert!(view.stale);
        assert!(matches!(fx.sink.events.last(), Some(SinkEvent::LastSeen(_))));
    }
}
