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

//! Aircraft tracking and snapshot reconciliation.
//!
//! The tracker owns exactly one [`TrackedAircraft`] per identifier that had a
//! position in the most recent snapshot. Each snapshot is diffed against the
//! previous identifier set: new identifiers get a marker, known ones are
//! updated in place, and everything not seen this cycle is torn down.

mod trail;

pub use trail::{Trail, DEFAULT_TRAIL_CAPACITY};

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use log::debug;

use crate::feed::StateVector;
use crate::presentation::marker_view;
use crate::render::{MarkerHandle, RenderSink};

/// Live state for one aircraft.
#[derive(Debug, Clone)]
pub struct TrackedAircraft {
    icao24: String,
    record: StateVector,
    trail: Trail,
    marker: MarkerHandle,
}

impl TrackedAircraft {
    #[must_use]
    pub fn icao24(&self) -> &str {
        &self.icao24
    }

    /// The most recent record for this aircraft.
    #[must_use]
    pub fn record(&self) -> &StateVector {
        &self.record
    }

    #[must_use]
    pub fn trail(&self) -> &Trail {
        &self.trail
    }

    #[must_use]
    pub fn marker(&self) -> MarkerHandle {
        self.marker
    }
}

/// What a single reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    /// Records dropped this cycle for lack of a position.
    pub skipped_without_position: usize,
}

impl ReconcileReport {
    #[must_use]
    pub fn was_removed(&self, icao24: &str) -> bool {
        self.removed.iter().any(|id| id == icao24)
    }
}

/// Identifier-keyed store of tracked aircraft.
#[derive(Debug)]
pub struct AircraftTracker {
    aircraft: HashMap<String, TrackedAircraft>,
    trail_capacity: usize,
}

impl Default for AircraftTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TRAIL_CAPACITY)
    }
}

impl AircraftTracker {
    #[must_use]
    pub fn new(trail_capacity: usize) -> Self {
        Self {
            aircraft: HashMap::new(),
            trail_capacity,
        }
    }

    /// Apply one snapshot.
    ///
    /// `selected` only affects marker highlighting; selection bookkeeping is
    /// left to the caller, who should inspect [`ReconcileReport::removed`].
    pub fn reconcile<S: RenderSink>(
        &mut self,
        records: Vec<StateVector>,
        selected: Option<&str>,
        sink: &mut S,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mut current: HashSet<String> = HashSet::with_capacity(records.len());

        for record in records {
            let Some(position) = record.position() else {
                report.skipped_without_position += 1;
                continue;
            };
            let is_selected = selected == Some(record.icao24.as_str());
            let Some(view) = marker_view(&record, is_selected) else {
                continue;
            };

            current.insert(record.icao24.clone());

            match self.aircraft.entry(record.icao24.clone()) {
                Entry::Occupied(mut entry) => {
                    let aircraft = entry.get_mut();
                    sink.update_marker(aircraft.marker, &view);
                    aircraft.trail.push(position);
                    aircraft.record = record;
                    report.updated.push(aircraft.icao24.clone());
                }
                Entry::Vacant(entry) => {
                    let marker = sink.create_marker(&view);
                    let mut trail = Trail::new(self.trail_capacity);
                    trail.push(position);
                    report.created.push(record.icao24.clone());
                    entry.insert(TrackedAircraft {
                        icao24: record.icao24.clone(),
                        record,
                        trail,
                        marker,
                    });
                }
            }
        }

        let stale: Vec<String> = self
            .aircraft
            .keys()
            .filter(|id| !current.contains(*id))
            .cloned()
            .collect();

        for icao24 in stale {
            if let Some(aircraft) = self.aircraft.remove(&icao24) {
                sink.remove_marker(aircraft.marker);
                report.removed.push(icao24);
            }
        }

        debug!(
            "Reconciled snapshot: {} created, {} updated, {} removed, {} without position",
            report.created.len(),
            report.updated.len(),
            report.removed.len(),
            report.skipped_without_position
        );

        report
    }

    /// Redraw one marker with a new highlight state. No-op if untracked.
    pub fn refresh_marker<S: RenderSink>(&self, icao24: &str, selected: bool, sink: &mut S) {
        if let Some(aircraft) = self.aircraft.get(icao24) {
            if let Some(view) = marker_view(&aircraft.record, selected) {
                sink.update_marker(aircraft.marker, &view);
            }
        }
    }

    /// Remove every marker and forget all state.
    pub fn clear<S: RenderSink>(&mut self, sink: &mut S) {
        for (_, aircraft) in self.aircraft.drain() {
            sink.remove_marker(aircraft.marker);
        }
    }

    #[must_use]
    pub fn get(&self, icao24: &str) -> Option<&TrackedAircraft> {
        self.aircraft.get(icao24)
    }

    #[must_use]
    pub fn contains(&self, icao24: &str) -> bool {
        self.aircraft.contains_key(icao24)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }
}
