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

use std::collections::VecDeque;

use crate::feed::GeoPoint;

/// Maximum number of points kept per aircraft.
pub const DEFAULT_TRAIL_CAPACITY: usize = 50;

/// Bounded position history, oldest point first.
#[derive(Debug, Clone)]
pub struct Trail {
    points: VecDeque<GeoPoint>,
    capacity: usize,
}

impl Default for Trail {
    fn default() -> Self {
        Self::new(DEFAULT_TRAIL_CAPACITY)
    }
}

impl Trail {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point unless it repeats the last one.
    ///
    /// Returns `true` if the point was stored. The oldest point is evicted
    /// once the trail is full.
    pub fn push(&mut self, point: GeoPoint) -> bool {
        if self.capacity == 0 || self.points.back() == Some(&point) {
            return false;
        }
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
        true
    }

    #[must_use]
    pub fn last(&self) -> Option<GeoPoint> {
        self.points.back().copied()
    }

    /// Points in chronological order.
    #[must_use]
    pub fn points(&self) -> Vec<GeoPoint> {
        self.points.iter().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_point_is_noop() {
        let mut trail = Trail::default();
        assert!(trail.push(GeoPoint::new(1.0, 2.0)));
        assert!(!trail.push(GeoPoint::new(1.0, 2.0)));
        assert_eq!(trail.len(), 1);

        // Only the last point counts.
        assert!(trail.push(GeoPoint::new(3.0, 4.0)));
        assert!(trail.push(GeoPoint::new(1.0, 2.0)));
        assert_eq!(trail.len(), 3);
    }

    #[test]
    fn test_evicts_oldest_first() {
        let mut trail = Trail::new(3);
        for i in 0..5 {
            trail.push(GeoPoint::new(f64::from(i), 0.0));
        }
        let lats: Vec<f64> = trail.points().iter().map(|p| p.lat).collect();
        assert_eq!(lats, vec![2.0, 3.0, 4.0]);
        assert_eq!(trail.last(), Some(GeoPoint::new(4.0, 0.0)));
    }
}
