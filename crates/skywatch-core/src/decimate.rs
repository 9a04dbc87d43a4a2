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

//! Display-budget decimation.
//!
//! Over-budget snapshots keep the fastest aircraft (fast traffic is the
//! interesting traffic) and always keep the selected one.

use log::warn;

use crate::feed::StateVector;

/// Default maximum number of aircraft rendered per snapshot.
pub const DEFAULT_DISPLAY_BUDGET: usize = 750;

/// Reduce `records` to at most `budget` entries.
///
/// Under budget the input is returned untouched. Otherwise records are
/// stably sorted by descending velocity (absent = 0), the selected record is
/// moved to the front, and the list is truncated.
#[must_use]
pub fn decimate(
    mut records: Vec<StateVector>,
    selected: Option<&str>,
    budget: usize,
) -> Vec<StateVector> {
    if records.len() <= budget {
        return records;
    }

    warn!("High traffic ({}), capping to {}", records.len(), budget);

    records.sort_by(|a, b| b.ranking_velocity().total_cmp(&a.ranking_velocity()));

    if let Some(id) = selected {
        if let Some(idx) = records.iter().position(|r| r.icao24 == id) {
            let pinned = records.remove(idx);
            records.insert(0, pinned);
        }
    }

    records.truncate(budget);
    records
}
