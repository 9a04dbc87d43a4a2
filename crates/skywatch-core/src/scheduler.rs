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

//! Cancellable one-shot and repeating timers keyed by deadline.
//!
//! The scheduler never sleeps on its own. An owner asks for
//! [`Scheduler::next_deadline`], waits until then, and drains
//! [`Scheduler::pop_expired`]. Every armed timer has a handle and can be
//! cancelled, so teardown leaves nothing behind.

use std::time::Duration;

use tokio::time::Instant;

/// Shortest period a repeating timer may have.
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a timer is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// One-second poll loop tick.
    PollTick,
    /// Inactivity deadline.
    IdleTimeout,
    /// Refresh of the selected aircraft's last-seen text.
    LiveTick,
}

/// First `deadline + k * period` (k >= 1) strictly after `now`.
fn next_boundary(deadline: Instant, period: Duration, now: Instant) -> Instant {
    let next = deadline + period;
    if next > now {
        return next;
    }
    let missed = now.duration_since(next).as_nanos() / period.as_nanos();
    next + period * u32::try_from(missed + 1).unwrap_or(u32::MAX)
}

#[derive(Debug)]
struct Timer {
    id: TimerId,
    kind: TimerKind,
    deadline: Instant,
    period: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
    next_id: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a timer that fires once, `delay` after `now`.
    pub fn schedule_once(&mut self, kind: TimerKind, delay: Duration, now: Instant) -> TimerId {
        self.insert(kind, now + delay, None)
    }

    /// Arm a timer that first fires one `period` after `now`, then every
    /// `period` until cancelled.
    pub fn schedule_repeating(
        &mut self,
        kind: TimerKind,
        period: Duration,
        now: Instant,
    ) -> TimerId {
        let period = period.max(MIN_PERIOD);
        self.insert(kind, now + period, Some(period))
    }

    fn insert(&mut self, kind: TimerKind, deadline: Instant, period: Option<Duration>) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.timers.push(Timer {
            id,
            kind,
            deadline,
            period,
        });
        id
    }

    /// Returns `false` if the timer had already fired (one-shot) or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.id != id);
        self.timers.len() != before
    }

    #[must_use]
    pub fn is_armed(&self, id: TimerId) -> bool {
        self.timers.iter().any(|t| t.id == id)
    }

    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    /// Take the earliest timer due at `now`, if any.
    ///
    /// One-shot timers are disarmed. Repeating timers are re-armed on their
    /// next period boundary after `now`; periods missed while the owner was
    /// not draining fire once, not once per period. Call in a loop to drain.
    pub fn pop_expired(&mut self, now: Instant) -> Option<(TimerId, TimerKind)> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| (t.deadline, t.id))
            .map(|(idx, _)| idx)?;

        let timer = &mut self.timers[idx];
        let fired = (timer.id, timer.kind);
        match timer.period {
            Some(period) => timer.deadline = next_boundary(timer.deadline, period, now),
            None => {
                self.timers.swap_remove(idx);
            }
        }
        Some(fired)
    }

    /// Disarm everything.
    pub fn clear(&mut self) {
        self.timers.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }
}
