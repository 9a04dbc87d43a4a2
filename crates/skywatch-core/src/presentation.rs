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

//! Pure mapping from aircraft state to visual attributes.
//!
//! Nothing in here touches the tracker or the sink; every function is a plain
//! computation over a [`StateVector`] (plus the current epoch time where
//! elapsed time is involved).

use std::fmt;

use crate::feed::{GeoPoint, PositionSource, StateVector};

const FEET_PER_METER: f64 = 3.28084;
const KNOTS_PER_MPS: f64 = 1.94384;
const VERTICAL_TREND_THRESHOLD_MPS: f64 = 0.5;

/// Seconds since last contact after which the detail view is styled stale.
pub const STALE_AFTER_SECS: i64 = 300;

pub const UNKNOWN_ALTITUDE_COLOR: &str = "#999999";
const HIGH_ALTITUDE_COLOR: &str = "#8A2BE2";

// Upper bound (exclusive, meters) and color of each band, lowest first.
const ALTITUDE_BANDS: [(f64, &str); 7] = [
    (1000.0, "#FF4500"),
    (3000.0, "#FF8C00"),
    (5000.0, "#FFD700"),
    (7000.0, "#32CD32"),
    (9000.0, "#00CED1"),
    (11000.0, "#1E90FF"),
    (13000.0, "#0000FF"),
];

const LIVE_COLOR: &str = "#00FFCC";
const STALE_COLOR: &str = "#FF0000";

/// Marker color for a barometric altitude in meters.
#[must_use]
pub fn altitude_color(altitude_m: Option<f64>) -> &'static str {
    let Some(alt) = altitude_m.filter(|a| a.is_finite()) else {
        return UNKNOWN_ALTITUDE_COLOR;
    };

    ALTITUDE_BANDS
        .iter()
        .find(|(upper, _)| alt < *upper)
        .map_or(HIGH_ALTITUDE_COLOR, |(_, color)| *color)
}

/// Icon rotation in degrees clockwise; the base icon points north.
#[must_use]
pub fn icon_rotation(heading: Option<f64>) -> f64 {
    heading.filter(|h| h.is_finite()).unwrap_or(0.0)
}

#[must_use]
pub fn meters_to_feet(meters: f64) -> f64 {
    meters * FEET_PER_METER
}

#[must_use]
pub fn mps_to_knots(mps: f64) -> f64 {
    mps * KNOTS_PER_MPS
}

#[must_use]
pub fn mps_to_feet_per_minute(mps: f64) -> f64 {
    mps * FEET_PER_METER * 60.0
}

/// Human label for a position source.
#[must_use]
pub fn position_source_label(source: PositionSource) -> &'static str {
    match source {
        PositionSource::AdsB => "ADS-B",
        PositionSource::Asterix => "ASTERIX",
        PositionSource::Mlat => "MLAT",
        PositionSource::Unknown => "Unknown",
    }
}

/// Altitude as displayed; ground status wins over any reported altitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltitudeReading {
    Ground,
    Feet(i64),
    Unknown,
}

impl AltitudeReading {
    #[must_use]
    pub fn new(altitude_m: Option<f64>, on_ground: bool) -> Self {
        if on_ground {
            return Self::Ground;
        }
        altitude_m
            .filter(|a| a.is_finite())
            .map_or(Self::Unknown, |a| Self::Feet(meters_to_feet(a).round() as i64))
    }
}

impl fmt::Display for AltitudeReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ground => write!(f, "GND"),
            Self::Feet(ft) => write!(f, "{ft} ft"),
            Self::Unknown => write!(f, "--- ft"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalTrend {
    Climbing,
    Descending,
    Level,
}

/// Vertical rate magnitude in ft/min plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerticalRateReading {
    pub trend: VerticalTrend,
    pub feet_per_minute: i64,
}

impl VerticalRateReading {
    #[must_use]
    pub fn new(vertical_rate_mps: Option<f64>) -> Self {
        let rate = vertical_rate_mps.filter(|r| r.is_finite()).unwrap_or(0.0);
        let trend = if rate > VERTICAL_TREND_THRESHOLD_MPS {
            VerticalTrend::Climbing
        } else if rate < -VERTICAL_TREND_THRESHOLD_MPS {
            VerticalTrend::Descending
        } else {
            VerticalTrend::Level
        };

        Self {
            trend,
            feet_per_minute: mps_to_feet_per_minute(rate).round().abs() as i64,
        }
    }
}

impl fmt::Display for VerticalRateReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let arrow = match self.trend {
            VerticalTrend::Climbing => '↑',
            VerticalTrend::Descending => '↓',
            VerticalTrend::Level => '—',
        };
        write!(f, "{} {} ft/min", arrow, self.feet_per_minute)
    }
}

fn knots_text(velocity_mps: Option<f64>) -> String {
    velocity_mps
        .filter(|v| v.is_finite())
        .map_or_else(|| "--- kt".to_string(), |v| format!("{} kt", mps_to_knots(v).round() as i64))
}

fn callsign_text(record: &StateVector) -> String {
    record.callsign.clone().unwrap_or_else(|| "N/A".to_string())
}

/// Short summary shown when a marker is clicked.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupView {
    pub callsign: String,
    pub altitude: AltitudeReading,
    pub speed: String,
    pub icao24: String,
}

/// Everything the sink needs to draw one aircraft marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerView {
    pub icao24: String,
    pub position: GeoPoint,
    pub rotation_deg: f64,
    pub color: &'static str,
    pub selected: bool,
    pub popup: PopupView,
}

/// Build the marker view for a record. `None` if the record has no position.
#[must_use]
pub fn marker_view(record: &StateVector, selected: bool) -> Option<MarkerView> {
    let position = record.position()?;
    Some(MarkerView {
        icao24: record.icao24.clone(),
        position,
        rotation_deg: icon_rotation(record.true_track),
        color: altitude_color(record.baro_altitude),
        selected,
        popup: PopupView {
            callsign: callsign_text(record),
            altitude: AltitudeReading::new(record.baro_altitude, record.on_ground),
            speed: knots_text(record.velocity),
            icao24: record.icao24.clone(),
        },
    })
}

/// Time since last contact, recomputed by the live ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastSeenView {
    pub seconds_ago: Option<i64>,
    pub stale: bool,
}

impl LastSeenView {
    #[must_use]
    pub fn new(last_contact: Option<i64>, now_epoch_secs: i64) -> Self {
        let seconds_ago = last_contact.map(|t| now_epoch_secs.saturating_sub(t));
        Self {
            seconds_ago,
            stale: seconds_ago.is_some_and(|s| s > STALE_AFTER_SECS),
        }
    }

    #[must_use]
    pub fn color(&self) -> &'static str {
        if self.stale {
            STALE_COLOR
        } else {
            LIVE_COLOR
        }
    }
}

impl fmt::Display for LastSeenView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.seconds_ago {
            Some(s) => write!(f, "{s}s ago"),
            None => write!(f, "---"),
        }
    }
}

/// External tracking links for the selected aircraft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlightLinks {
    pub flightradar24: String,
    pub flightaware: String,
}

/// Side-panel content for the selected aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub icao24: String,
    pub callsign: String,
    pub hex: String,
    pub country: String,
    pub speed: String,
    pub altitude: AltitudeReading,
    pub geo_altitude: AltitudeReading,
    pub vertical_rate: VerticalRateReading,
    pub track: String,
    pub position: String,
    pub squawk: String,
    pub source: &'static str,
    pub last_seen: LastSeenView,
    pub links: FlightLinks,
}

#[must_use]
pub fn detail_view(record: &StateVector, now_epoch_secs: i64) -> DetailView {
    let callsign = record.callsign.clone().unwrap_or_default();
    let position = record.position().map_or_else(
        || "---".to_string(),
        |p| format!("{:.4}, {:.4}", p.lat, p.lon),
    );
    let track = record
        .true_track
        .filter(|t| t.is_finite())
        .map_or_else(|| "---°".to_string(), |t| format!("{}°", t.round() as i64));

    DetailView {
        icao24: record.icao24.clone(),
        callsign: callsign_text(record),
        hex: format!("Hex: {}", record.icao24.to_uppercase()),
        country: record
            .origin_country
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        speed: knots_text(record.velocity),
        altitude: AltitudeReading::new(record.baro_altitude, record.on_ground),
        geo_altitude: AltitudeReading::new(record.geo_altitude, false),
        vertical_rate: VerticalRateReading::new(record.vertical_rate),
        track,
        position,
        squawk: record.squawk.clone().unwrap_or_else(|| "----".to_string()),
        source: position_source_label(record.position_source),
        last_seen: LastSeenView::new(record.last_contact, now_epoch_secs),
        links: FlightLinks {
            flightradar24: format!("https://www.flightradar24.com/{callsign}"),
            flightaware: format!("https://flightaware.com/live/flight/{callsign}"),
        },
    }
}
