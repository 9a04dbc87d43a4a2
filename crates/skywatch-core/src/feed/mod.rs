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

//! Feed layer: aircraft state vectors as delivered by a snapshot query.
//!
//! A snapshot is the complete, unordered list of state vectors returned by one
//! bounding-box (or global) query. Records are decoded leniently: a record with
//! a missing position is still returned, it is simply undisplayable this cycle.

mod opensky;

pub use opensky::{decode_snapshot, DecodeError};

/// Sensor type that produced the position of a state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionSource {
    AdsB,
    Asterix,
    Mlat,
    #[default]
    Unknown,
}

impl PositionSource {
    /// Map the feed's numeric position-source code.
    #[must_use]
    pub fn from_code(code: Option<i64>) -> Self {
        match code {
            Some(0) => Self::AdsB,
            Some(1) => Self::Asterix,
            Some(2) => Self::Mlat,
            _ => Self::Unknown,
        }
    }
}

/// A geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    #[must_use]
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One aircraft's state as reported in a single snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateVector {
    /// ICAO 24-bit transponder address (lower-case hex string).
    pub icao24: String,
    /// Callsign, trimmed. `None` when absent or blank.
    pub callsign: Option<String>,
    pub origin_country: Option<String>,
    /// Seconds since epoch of the last position update.
    pub time_position: Option<i64>,
    /// Seconds since epoch of the last message of any kind.
    pub last_contact: Option<i64>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    /// Barometric altitude in meters.
    pub baro_altitude: Option<f64>,
    pub on_ground: bool,
    /// Ground speed in m/s.
    pub velocity: Option<f64>,
    /// True track in degrees clockwise from north.
    pub true_track: Option<f64>,
    /// Vertical rate in m/s, positive when climbing.
    pub vertical_rate: Option<f64>,
    /// Geometric altitude in meters.
    pub geo_altitude: Option<f64>,
    pub squawk: Option<String>,
    pub spi: bool,
    pub position_source: PositionSource,
}

impl StateVector {
    /// Create a bare record with only the identifier set.
    #[must_use]
    pub fn new(icao24: impl Into<String>) -> Self {
        Self {
            icao24: icao24.into(),
            ..Default::default()
        }
    }

    /// Builder-style helper used by callers assembling records by hand.
    #[must_use]
    pub fn with_position(mut self, lat: f64, lon: f64) -> Self {
        self.latitude = Some(lat);
        self.longitude = Some(lon);
        self
    }

    #[must_use]
    pub fn with_velocity(mut self, velocity: f64) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// The record's position, if both coordinates are present and finite.
    #[must_use]
    pub fn position(&self) -> Option<GeoPoint> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
                Some(GeoPoint::new(lat, lon))
            }
            _ => None,
        }
    }

    /// Velocity used for ranking; absent velocity ranks as stationary.
    #[must_use]
    pub fn ranking_velocity(&self) -> f64 {
        self.velocity.filter(|v| v.is_finite()).unwrap_or(0.0)
    }
}

/// The decoded result of one snapshot query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub records: Vec<StateVector>,
    /// Upstream snapshot timestamp (seconds since epoch).
    pub server_time: Option<i64>,
}
