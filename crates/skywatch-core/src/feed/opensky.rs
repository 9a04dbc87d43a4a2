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

//! Decoder for the `states/all` response body.
//!
//! Each aircraft is a fixed-position array:
//! ```text
//! [icao24, callsign, origin_country, time_position, last_contact,
//!  longitude, latitude, baro_altitude, on_ground, velocity, true_track,
//!  vertical_rate, sensors, geo_altitude, squawk, spi, position_source, (category)]
//! ```

use log::debug;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use super::{PositionSource, Snapshot, StateVector};

const IDX_ICAO24: usize = 0;
const IDX_CALLSIGN: usize = 1;
const IDX_ORIGIN_COUNTRY: usize = 2;
const IDX_TIME_POSITION: usize = 3;
const IDX_LAST_CONTACT: usize = 4;
const IDX_LONGITUDE: usize = 5;
const IDX_LATITUDE: usize = 6;
const IDX_BARO_ALTITUDE: usize = 7;
const IDX_ON_GROUND: usize = 8;
const IDX_VELOCITY: usize = 9;
const IDX_TRUE_TRACK: usize = 10;
const IDX_VERTICAL_RATE: usize = 11;
const IDX_GEO_ALTITUDE: usize = 13;
const IDX_SQUAWK: usize = 14;
const IDX_SPI: usize = 15;
const IDX_POSITION_SOURCE: usize = 16;

/// Errors that can occur while decoding a snapshot body.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid snapshot body: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct StatesResponse {
    time: Option<i64>,
    #[serde(default)]
    states: Option<Vec<Value>>,
}

/// Decode a response body into a [`Snapshot`].
///
/// A missing or `null` `states` field yields an empty snapshot. Entries that
/// are not arrays or carry no identifier are dropped.
pub fn decode_snapshot(body: &[u8]) -> Result<Snapshot, DecodeError> {
    let response: StatesResponse = serde_json::from_slice(body)?;

    let raw = response.states.unwrap_or_default();
    let total = raw.len();
    let records: Vec<StateVector> = raw.iter().filter_map(decode_state).collect();

    if records.len() != total {
        debug!("Dropped {} undecodable state vectors", total - records.len());
    }

    Ok(Snapshot {
        records,
        server_time: response.time,
    })
}

fn decode_state(value: &Value) -> Option<StateVector> {
    let fields = value.as_array()?;
    let icao24 = fields.get(IDX_ICAO24)?.as_str()?.trim().to_lowercase();
    if icao24.is_empty() {
        return None;
    }

    Some(StateVector {
        icao24,
        callsign: string_at(fields, IDX_CALLSIGN),
        origin_country: string_at(fields, IDX_ORIGIN_COUNTRY),
        time_position: int_at(fields, IDX_TIME_POSITION),
        last_contact: int_at(fields, IDX_LAST_CONTACT),
        longitude: float_at(fields, IDX_LONGITUDE),
        latitude: float_at(fields, IDX_LATITUDE),
        baro_altitude: float_at(fields, IDX_BARO_ALTITUDE),
        on_ground: bool_at(fields, IDX_ON_GROUND),
        velocity: float_at(fields, IDX_VELOCITY),
        true_track: float_at(fields, IDX_TRUE_TRACK),
        vertical_rate: float_at(fields, IDX_VERTICAL_RATE),
        geo_altitude: float_at(fields, IDX_GEO_ALTITUDE),
        squawk: string_at(fields, IDX_SQUAWK),
        spi: bool_at(fields, IDX_SPI),
        position_source: PositionSource::from_code(int_at(fields, IDX_POSITION_SOURCE)),
    })
}

fn string_at(fields: &[Value], idx: usize) -> Option<String> {
    fields
        .get(idx)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn float_at(fields: &[Value], idx: usize) -> Option<f64> {
    fields.get(idx).and_then(Value::as_f64)
}

// Timestamps are integers upstream but tolerate float encodings.
fn int_at(fields: &[Value], idx: usize) -> Option<i64> {
    let value = fields.get(idx)?;
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

fn bool_at(fields: &[Value], idx: usize) -> bool {
    fields.get(idx).and_then(Value::as_bool).unwrap_or(false)
}
