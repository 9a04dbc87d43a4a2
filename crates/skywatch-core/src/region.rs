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

//! Query regions and the region-size policy.
//!
//! Large bounded queries are rejected upstream far more often than unbounded
//! ones, so any region wider than [`GLOBAL_QUERY_THRESHOLD_DEGREES`] on either
//! axis is sent as a global query instead.

use log::{info, warn};
use thiserror::Error;

/// Span (degrees) above which a global query is issued.
pub const GLOBAL_QUERY_THRESHOLD_DEGREES: f64 = 10.0;
/// Maximum span (degrees) per axis of a bounded query.
pub const MAX_BOX_SPAN_DEGREES: f64 = 180.0;

const KM_PER_DEGREE_LAT: f64 = 111.0;

#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    #[error("invalid coordinate: lat {lat}, lon {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("invalid radius: {0} km")]
    InvalidRadius(f64),
}

/// Check that a coordinate is finite and within world bounds.
#[must_use]
pub fn is_valid_coordinate(lat: f64, lon: f64) -> bool {
    lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon)
}

/// Geographic rectangle in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    #[must_use]
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Approximate box around a centre point.
    ///
    /// One degree of latitude is taken as 111 km; the longitude extent is
    /// scaled by the cosine of the centre latitude.
    pub fn around(lat: f64, lon: f64, radius_km: f64) -> Result<Self, RegionError> {
        if !is_valid_coordinate(lat, lon) {
            return Err(RegionError::InvalidCoordinate { lat, lon });
        }
        if !radius_km.is_finite() || radius_km <= 0.0 {
            return Err(RegionError::InvalidRadius(radius_km));
        }

        let lat_delta = radius_km / KM_PER_DEGREE_LAT;
        let lon_delta = radius_km / (KM_PER_DEGREE_LAT * lat.to_radians().cos());

        Ok(Self {
            north: lat + lat_delta,
            south: lat - lat_delta,
            east: lon + lon_delta,
            west: lon - lon_delta,
        })
    }

    #[must_use]
    pub fn lat_span(&self) -> f64 {
        (self.north - self.south).abs()
    }

    #[must_use]
    pub fn lon_span(&self) -> f64 {
        (self.east - self.west).abs()
    }

    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    /// Shrink any axis wider than `max_span` to exactly `max_span`, centred on
    /// the box's centre, then limit the result to world extents.
    #[must_use]
    pub fn clamped(&self, max_span: f64) -> Self {
        if self.lat_span() <= max_span && self.lon_span() <= max_span {
            return *self;
        }

        warn!("Bounding box too large, clamping query");
        let (center_lat, center_lon) = self.center();
        let half = max_span / 2.0;

        let (north, south) = if self.lat_span() > max_span {
            ((center_lat + half).min(90.0), (center_lat - half).max(-90.0))
        } else {
            (self.north, self.south)
        };
        let (east, west) = if self.lon_span() > max_span {
            ((center_lon + half).min(180.0), (center_lon - half).max(-180.0))
        } else {
            (self.east, self.west)
        };

        Self {
            north,
            south,
            east,
            west,
        }
    }
}

/// What a snapshot request asks the feed for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryScope {
    /// No bounding parameters: every aircraft the feed knows about.
    Global,
    /// Aircraft inside the given box.
    Bounded(BoundingBox),
}

/// Apply the region-size policy to a requested region.
#[must_use]
pub fn plan_query(region: &BoundingBox, global_threshold: f64, max_span: f64) -> QueryScope {
    if region.lat_span() > global_threshold || region.lon_span() > global_threshold {
        info!(
            "Region spans {:.1}° x {:.1}°, switching to global query",
            region.lat_span(),
            region.lon_span()
        );
        QueryScope::Global
    } else {
        QueryScope::Bounded(region.clamped(max_span))
    }
}
