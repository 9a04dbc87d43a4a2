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

//! Live aircraft-state reconciliation for polled state-vector feeds.
//!
//! This library turns periodic snapshots of aircraft state vectors into a
//! stable, bounded set of map markers with trail history and a single
//! followed aircraft. It is split into layers that can be used on their own
//! or composed through [`Driver`]:
//!
//! - **Feed layer**: [`StateVector`] records and decoding of the positional
//!   `states` arrays
//! - **Client layer**: rate-limited [`PollingClient`] with global/bounded
//!   query planning and a pluggable [`Transport`]
//! - **Reconciliation layer**: [`decimate`], [`AircraftTracker`] and
//!   [`SelectionController`] drawing into a [`RenderSink`]
//! - **Session layer**: [`LiveSession`] pacing polls with a virtual-time
//!   [`Scheduler`], and the async [`Driver`] loop
//!
//! # Decimation
//!
//! ```
//! use skywatch_core::{decimate, StateVector};
//!
//! let snapshot = vec![
//!     StateVector::new("a1").with_position(10.0, 20.0).with_velocity(100.0),
//!     StateVector::new("a2").with_position(11.0, 21.0).with_velocity(50.0),
//! ];
//!
//! let shown = decimate(snapshot.clone(), None, 1);
//! assert_eq!(shown[0].icao24, "a1");
//!
//! let shown = decimate(snapshot, Some("a2"), 1);
//! assert_eq!(shown[0].icao24, "a2");
//! ```
//!
//! # Query planning
//!
//! ```
//! use skywatch_core::region::{plan_query, BoundingBox, QueryScope};
//!
//! let city = BoundingBox::new(52.0, 51.0, 0.5, -0.5);
//! assert!(matches!(plan_query(&city, 10.0, 180.0), QueryScope::Bounded(_)));
//!
//! let continent = BoundingBox::new(70.0, 35.0, 40.0, -10.0);
//! assert_eq!(plan_query(&continent, 10.0, 180.0), QueryScope::Global);
//! ```

pub mod client;
pub mod decimate;
pub mod driver;
pub mod feed;
pub mod presentation;
pub mod region;
pub mod render;
pub mod scheduler;
pub mod selection;
pub mod session;
pub mod tracker;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{
    ClientConfig, Credentials, FeedError, HttpTransport, NetworkError, PollingClient, Transport,
};
pub use decimate::{decimate, DEFAULT_DISPLAY_BUDGET};
pub use driver::{Driver, UiEvent};
pub use feed::{GeoPoint, PositionSource, Snapshot, StateVector};
pub use region::{BoundingBox, QueryScope, RegionError};
pub use render::{Countdown, MarkerHandle, Notice, RenderSink, StatusIndicator};
pub use scheduler::{Scheduler, TimerId, TimerKind};
pub use selection::SelectionController;
pub use session::{Activity, LiveSession, SessionConfig};
pub use tracker::{AircraftTracker, ReconcileReport, TrackedAircraft, Trail};
