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

//! Rendering sink: the map/UI side the live session draws into.
//!
//! Marker handles are minted by the sink and only ever passed back to it.

use std::fmt;

use crate::client::FeedError;
use crate::feed::GeoPoint;
use crate::presentation::{DetailView, LastSeenView, MarkerView};

/// Opaque handle to a marker owned by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

/// Connection/activity indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusIndicator {
    Active,
    Fetching,
    Updated,
    Idle,
    Background,
    RateLimited,
    AuthError,
    NetworkError,
}

impl StatusIndicator {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::RateLimited | Self::AuthError | Self::NetworkError)
    }
}

impl fmt::Display for StatusIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Active => "Active",
            Self::Fetching => "Fetching...",
            Self::Updated => "Updated",
            Self::Idle => "Idle (Paused)",
            Self::Background => "Background (Paused)",
            Self::RateLimited => "Rate Limited",
            Self::AuthError => "Auth Error",
            Self::NetworkError => "Network Error",
        };
        f.write_str(text)
    }
}

/// Refresh countdown shown next to the status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Remaining(u32),
    Updating,
    Blank,
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remaining(secs) => write!(f, "({secs}s)"),
            Self::Updating => write!(f, "(Updating...)"),
            Self::Blank => Ok(()),
        }
    }
}

/// Transient, toast-style messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The snapshot contained this many aircraft.
    AircraftCount(usize),
    /// The snapshot was empty.
    NoAircraft,
    /// Only `shown` of `total` aircraft are displayed.
    HighTraffic { shown: usize, total: usize },
    /// A fetch failed in a way the user should see.
    FeedProblem(FeedError),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AircraftCount(n) => write!(f, "{n} Aircraft"),
            Self::NoAircraft => write!(f, "No aircraft detected in this region."),
            Self::HighTraffic { shown, total } => {
                write!(f, "High Traffic: Showing {shown} of {total} aircraft")
            }
            Self::FeedProblem(e) => write!(f, "{e}"),
        }
    }
}

/// Drawing surface driven by the live session.
pub trait RenderSink {
    /// Place a new marker and return its handle.
    fn create_marker(&mut self, view: &MarkerView) -> MarkerHandle;
    fn update_marker(&mut self, handle: MarkerHandle, view: &MarkerView);
    fn remove_marker(&mut self, handle: MarkerHandle);

    fn show_detail(&mut self, view: &DetailView);
    fn update_last_seen(&mut self, view: &LastSeenView);
    fn hide_detail(&mut self);

    /// Draw (or replace) the selected aircraft's trail overlay.
    fn draw_trail(&mut self, points: &[GeoPoint]);
    fn remove_trail(&mut self);

    fn set_status(&mut self, _status: StatusIndicator) {}
    fn set_countdown(&mut self, _countdown: Countdown) {}
    fn notify(&mut self, _notice: &Notice) {}
}
