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

//! Test doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::client::{FeedRequest, FeedResponse, Transport, TransportError};
use crate::feed::GeoPoint;
use crate::presentation::{DetailView, LastSeenView, MarkerView};
use crate::render::{Countdown, MarkerHandle, Notice, RenderSink, StatusIndicator};

const EMPTY_SNAPSHOT: &str = r#"{"time": 0, "states": []}"#;

type Scripted = (Duration, Result<FeedResponse, TransportError>);

/// Transport that replays queued responses and counts requests.
///
/// Clones share the same queue, so a test can keep one handle while the
/// client owns another. An empty queue answers with an empty snapshot.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedTransport {
    responses: Arc<Mutex<VecDeque<Scripted>>>,
    requests: Arc<Mutex<Vec<FeedRequest>>>,
    request_times: Arc<Mutex<Vec<Instant>>>,
    count: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_ok(&self, body: &str) {
        self.push_status(200, body);
    }

    pub(crate) fn push_status(&self, status: u16, body: &str) {
        self.push_slow(Duration::ZERO, status, body);
    }

    /// Queue a response that takes `delay` to arrive.
    pub(crate) fn push_slow(&self, delay: Duration, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back((
            delay,
            Ok(FeedResponse {
                status,
                body: body.as_bytes().to_vec(),
            }),
        ));
    }

    pub(crate) fn push_err(&self, error: TransportError) {
        self.responses
            .lock()
            .unwrap()
            .push_back((Duration::ZERO, Err(error)));
    }

    pub(crate) fn request_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    /// When each request was issued, relative to `start`.
    pub(crate) fn request_offsets(&self, start: Instant) -> Vec<Duration> {
        self.request_times
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.duration_since(start))
            .collect()
    }

    pub(crate) fn last_request(&self) -> Option<FeedRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Transport for ScriptedTransport {
    async fn get(&self, request: &FeedRequest) -> Result<FeedResponse, TransportError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.request_times.lock().unwrap().push(Instant::now());
        let next = self.responses.lock().unwrap().pop_front();
        let Some((delay, response)) = next else {
            return Ok(FeedResponse {
                status: 200,
                body: EMPTY_SNAPSHOT.as_bytes().to_vec(),
            });
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

/// Everything a [`RecordingSink`] was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SinkEvent {
    MarkerCreated(MarkerHandle, GeoPoint),
    MarkerUpdated(MarkerHandle, GeoPoint),
    MarkerRemoved(MarkerHandle),
    DetailShown(String),
    DetailHidden,
    LastSeen(LastSeenView),
    TrailDrawn(usize),
    TrailRemoved,
    Status(StatusIndicator),
}

/// In-memory sink that keeps the current picture plus an event log.
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub events: Vec<SinkEvent>,
    pub markers: HashMap<MarkerHandle, MarkerView>,
    pub detail: Option<DetailView>,
    pub last_seen: Option<LastSeenView>,
    pub trail: Option<Vec<GeoPoint>>,
    pub status: Option<StatusIndicator>,
    pub countdown: Option<Countdown>,
    pub notices: Vec<Notice>,
    /// When each last-seen refresh arrived.
    pub last_seen_times: Vec<Instant>,
    next_handle: u64,
}

impl RecordingSink {
    pub(crate) fn live_markers(&self) -> usize {
        self.markers.len()
    }

    pub(crate) fn removed_markers(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::MarkerRemoved(_)))
            .count()
    }

    pub(crate) fn selected_markers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .markers
            .values()
            .filter(|m| m.selected)
            .map(|m| m.icao24.clone())
            .collect();
        ids.sort();
        ids
    }

    pub(crate) fn status_history(&self) -> Vec<StatusIndicator> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Status(status) => Some(*status),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn last_seen_updates(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SinkEvent::LastSeen(_)))
            .count()
    }
}

impl RenderSink for RecordingSink {
    fn create_marker(&mut self, view: &MarkerView) -> MarkerHandle {
        self.next_handle += 1;
        let handle = MarkerHandle(self.next_handle);
        self.markers.insert(handle, view.clone());
        self.events
            .push(SinkEvent::MarkerCreated(handle, view.position));
        handle
    }

    fn update_marker(&mut self, handle: MarkerHandle, view: &MarkerView) {
        assert!(
            self.markers.contains_key(&handle),
            "update of unknown marker {handle:?}"
        );
        self.markers.insert(handle, view.clone());
        self.events
            .push(SinkEvent::MarkerUpdated(handle, view.position));
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        assert!(
            self.markers.remove(&handle).is_some(),
            "removal of unknown marker {handle:?}"
        );
        self.events.push(SinkEvent::MarkerRemoved(handle));
    }

    fn show_detail(&mut self, view: &DetailView) {
        self.events.push(SinkEvent::DetailShown(view.hex.clone()));
        self.last_seen = Some(view.last_seen);
        self.detail = Some(view.clone());
    }

    fn update_last_seen(&mut self, view: &LastSeenView) {
        self.events.push(SinkEvent::LastSeen(*view));
        self.last_seen_times.push(Instant::now());
        self.last_seen = Some(*view);
    }

    fn hide_detail(&mut self) {
        self.events.push(SinkEvent::DetailHidden);
        self.detail = None;
        self.last_seen = None;
    }

    fn draw_trail(&mut self, points: &[GeoPoint]) {
        self.events.push(SinkEvent::TrailDrawn(points.len()));
        self.trail = Some(points.to_vec());
    }

    fn remove_trail(&mut self) {
        self.events.push(SinkEvent::TrailRemoved);
        self.trail = None;
    }

    fn set_status(&mut self, status: StatusIndicator) {
        self.events.push(SinkEvent::Status(status));
        self.status = Some(status);
    }

    fn set_countdown(&mut self, countdown: Countdown) {
        self.countdown = Some(countdown);
    }

    fn notify(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }
}
