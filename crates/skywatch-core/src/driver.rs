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

//! Async event loop tying the polling client to a live session.
//!
//! The loop sleeps until the session's next timer deadline, a UI event, or
//! cancellation. At most one fetch is outstanding at a time. While it is in
//! flight the session's timers keep firing and UI events are still handled,
//! except credential changes, which wait until the fetch completes.

use std::future;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::client::{PollingClient, Transport};
use crate::region::BoundingBox;
use crate::render::RenderSink;
use crate::session::LiveSession;

/// Input from the user-facing side.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Pointer, key or map activity.
    Interaction,
    VisibilityChanged(bool),
    Select(String),
    ClearSelection,
    /// The map moved. Counts as interaction and polls at once if the rate
    /// gate is open.
    SetRegion(BoundingBox),
    SetCredentials { username: String, password: String },
    /// Drop back to anonymous access.
    ClearCredentials,
    Shutdown,
}

#[derive(Debug)]
pub struct Driver<S, T> {
    session: LiveSession<S>,
    client: PollingClient<T>,
    region: BoundingBox,
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

impl<S: RenderSink, T: Transport> Driver<S, T> {
    pub fn new(session: LiveSession<S>, client: PollingClient<T>, region: BoundingBox) -> Self {
        Self {
            session,
            client,
            region,
        }
    }

    #[must_use]
    pub fn session(&self) -> &LiveSession<S> {
        &self.session
    }

    #[must_use]
    pub fn client(&self) -> &PollingClient<T> {
        &self.client
    }

    #[must_use]
    pub fn region(&self) -> BoundingBox {
        self.region
    }

    /// Run until cancelled, the event channel closes, or a
    /// [`UiEvent::Shutdown`] arrives. The session is reset on exit and
    /// handed back.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<UiEvent>,
        cancel: CancellationToken,
    ) -> Self {
        info!("Driver started for region {:?}", self.region);

        let mut shutdown = self.session.start(Instant::now()) && self.poll(&mut events).await;

        while !shutdown {
            let deadline = self.session.next_deadline();
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Driver cancelled");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        debug!("Event channel closed");
                        break;
                    };
                    if event == UiEvent::Shutdown {
                        break;
                    }
                    if self.handle_event(event) {
                        shutdown = self.poll(&mut events).await;
                    }
                }
                () = sleep_until_deadline(deadline) => {
                    if self.session.advance(Instant::now()) {
                        shutdown = self.poll(&mut events).await;
                    }
                }
            }
        }

        self.session.reset();
        self
    }

    /// Apply one event. Returns `true` if it warrants an immediate poll.
    fn handle_event(&mut self, event: UiEvent) -> bool {
        let now = Instant::now();
        match event {
            UiEvent::SetCredentials { username, password } => {
                self.session.on_interaction(now);
                if self.client.set_credentials(&username, &password) {
                    true
                } else {
                    warn!("Ignoring empty credentials");
                    false
                }
            }
            UiEvent::ClearCredentials => {
                self.session.on_interaction(now);
                if self.client.has_credentials() {
                    info!("Credentials cleared, using anonymous access");
                    self.client.clear_credentials();
                }
                false
            }
            other => Self::apply_session_event(&mut self.session, &mut self.region, other, now),
        }
    }

    fn apply_session_event(
        session: &mut LiveSession<S>,
        region: &mut BoundingBox,
        event: UiEvent,
        now: Instant,
    ) -> bool {
        match event {
            UiEvent::Interaction => {
                session.on_interaction(now);
                false
            }
            UiEvent::VisibilityChanged(visible) => session.on_visibility_changed(visible, now),
            UiEvent::Select(icao24) => {
                session.on_interaction(now);
                session.select(&icao24, now);
                false
            }
            UiEvent::ClearSelection => {
                session.on_interaction(now);
                session.clear_selection();
                false
            }
            UiEvent::SetRegion(new_region) => {
                session.on_interaction(now);
                *region = new_region;
                true
            }
            UiEvent::SetCredentials { .. } | UiEvent::ClearCredentials | UiEvent::Shutdown => {
                false
            }
        }
    }

    /// Fetch once if the session is active and the rate gate is open.
    ///
    /// Returns `true` if a shutdown was requested while the fetch was in
    /// flight.
    async fn poll(&mut self, events: &mut mpsc::Receiver<UiEvent>) -> bool {
        if self.session.is_idle() {
            return false;
        }
        if !self.client.can_poll() {
            debug!(
                "Rate gate closed for another {:?}",
                self.client.rate_gate().remaining(Instant::now())
            );
            return false;
        }

        self.session.begin_fetch();

        let Self {
            session,
            client,
            region,
        } = self;
        let query = *region;
        let mut shutdown = false;
        let mut deferred = Vec::new();

        let outcome = {
            let fetch = client.fetch_snapshot(&query);
            tokio::pin!(fetch);
            loop {
                tokio::select! {
                    outcome = &mut fetch => break outcome,
                    Some(event) = events.recv() => match event {
                        UiEvent::Shutdown => shutdown = true,
                        UiEvent::SetCredentials { .. } | UiEvent::ClearCredentials => {
                            deferred.push(event);
                        }
                        other => {
                            // Requests for an immediate poll are moot here.
                            Self::apply_session_event(session, region, other, Instant::now());
                        }
                    },
                    () = sleep_until_deadline(session.next_deadline()) => {
                        // A poll falling due now waits for the first tick after this fetch.
                        session.advance(Instant::now());
                    }
                }
            }
        };

        session.apply_outcome(outcome);

        // The gate just closed, so deferred events cannot start another fetch.
        for event in deferred {
            self.handle_event(event);
        }
        shutdown
    }
}
