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
use std::fmt;

use chrono::{DateTime, Utc};
use skywatch_core::{Countdown, Notice, StatusIndicator};

/// Diagnostic message with timestamp
#[derive(Debug, Clone)]
pub struct DiagnosticMessage {
    pub timestamp: DateTime<Utc>,
    pub level: DiagnosticLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

/// Feed status and diagnostics shared between the console sink and the
/// command reader
#[derive(Debug)]
pub struct SystemStatus {
    pub relay_url: String,
    pub credentials_source: Option<&'static str>,

    // Poll state
    pub indicator: StatusIndicator,
    pub countdown: Countdown,
    pub last_error: Option<String>,

    // Snapshot statistics
    pub snapshots_received: u64,
    pub last_snapshot_at: Option<DateTime<Utc>>,
    pub aircraft_in_feed: usize,
    pub markers_shown: usize,
    pub selected: Option<String>,

    // Diagnostic messages (keep last 50)
    pub diagnostics: VecDeque<DiagnosticMessage>,
    max_diagnostics: usize,
}

impl SystemStatus {
    pub fn new(relay_url: &str, credentials_source: Option<&'static str>) -> Self {
        Self {
            relay_url: relay_url.to_string(),
            credentials_source,

            indicator: StatusIndicator::Active,
            countdown: Countdown::Blank,
            last_error: None,

            snapshots_received: 0,
            last_snapshot_at: None,
            aircraft_in_feed: 0,
            markers_shown: 0,
            selected: None,

            diagnostics: VecDeque::with_capacity(50),
            max_diagnostics: 50,
        }
    }

    /// Record a new indicator, logging transitions worth keeping
    pub fn set_indicator(&mut self, indicator: StatusIndicator) {
        if indicator == self.indicator {
            return;
        }
        self.indicator = indicator;

        match indicator {
            StatusIndicator::Idle | StatusIndicator::Background => {
                self.add_diagnostic(DiagnosticLevel::Info, format!("Polling paused: {indicator}"));
            }
            StatusIndicator::RateLimited | StatusIndicator::AuthError | StatusIndicator::NetworkError => {
                self.add_diagnostic(DiagnosticLevel::Warning, indicator.to_string());
            }
            StatusIndicator::Updated => {
                self.last_error = None;
            }
            StatusIndicator::Active | StatusIndicator::Fetching => {}
        }
    }

    /// Fold a sink notice into the statistics
    pub fn record_notice(&mut self, notice: &Notice) {
        match notice {
            Notice::AircraftCount(count) => {
                self.snapshots_received += 1;
                self.last_snapshot_at = Some(Utc::now());
                self.aircraft_in_feed = *count;
            }
            Notice::NoAircraft => {
                self.snapshots_received += 1;
                self.last_snapshot_at = Some(Utc::now());
                self.aircraft_in_feed = 0;
            }
            Notice::HighTraffic { .. } => {
                self.add_diagnostic(DiagnosticLevel::Warning, notice.to_string());
            }
            Notice::FeedProblem(error) => {
                self.last_error = Some(error.to_string());
                self.add_diagnostic(DiagnosticLevel::Error, error.to_string());
            }
        }
    }

    /// Add a diagnostic message
    pub fn add_diagnostic(&mut self, level: DiagnosticLevel, message: String) {
        let diagnostic = DiagnosticMessage {
            timestamp: Utc::now(),
            level,
            message,
        };

        self.diagnostics.push_back(diagnostic);

        // Keep only the last N messages
        while self.diagnostics.len() > self.max_diagnostics {
            self.diagnostics.pop_front();
        }
    }

    /// Seconds since the last snapshot arrived
    pub fn snapshot_age_seconds(&self) -> Option<i64> {
        self.last_snapshot_at
            .map(|at| (Utc::now() - at).num_seconds())
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Status:      {} {}", self.indicator, self.countdown)?;
        writeln!(f, "Relay:       {}", self.relay_url)?;
        writeln!(
            f,
            "Credentials: {}",
            self.credentials_source.unwrap_or("anonymous")
        )?;
        match self.snapshot_age_seconds() {
            Some(age) => writeln!(
                f,
                "Snapshots:   {} (last {}s ago)",
                self.snapshots_received, age
            )?,
            None => writeln!(f, "Snapshots:   none yet")?,
        }
        writeln!(
            f,
            "Aircraft:    {} in feed, {} shown",
            self.aircraft_in_feed, self.markers_shown
        )?;
        writeln!(
            f,
            "Selected:    {}",
            self.selected.as_deref().unwrap_or("none")
        )?;
        if let Some(error) = &self.last_error {
            writeln!(f, "Last error:  {error}")?;
        }
        for diagnostic in self.diagnostics.iter().rev().take(5) {
            writeln!(
                f,
                "  [{}] {:?}: {}",
                diagnostic.timestamp.format("%H:%M:%S"),
                diagnostic.level,
                diagnostic.message
            )?;
        }
        Ok(())
    }
}
