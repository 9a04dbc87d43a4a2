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

//! Headless terminal front end.
//!
//! [`ConsoleSink`] renders the live session as log lines and a printed detail
//! panel. [`read_commands`] turns stdin lines into [`UiEvent`]s; every line,
//! even an empty one, counts as user interaction.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, error, info, warn};
use skywatch_core::presentation::{DetailView, LastSeenView, MarkerView};
use skywatch_core::{
    BoundingBox, Countdown, GeoPoint, MarkerHandle, Notice, RenderSink, StatusIndicator, UiEvent,
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::cli::parse_bbox;
use crate::status::SystemStatus;

const HELP: &str = "\
Commands:
  select <hex>            follow an aircraft
  clear                   stop following
  hide | show             simulate the view losing/regaining visibility
  login <user> <pass>     set feed credentials
  logout                  use anonymous access
  bbox <N> <S> <E> <W>    change the query region
  status                  print feed status
  help                    show this text
  quit                    exit";

/// Rendering sink that writes to the terminal
#[derive(Debug)]
pub struct ConsoleSink {
    status: Arc<Mutex<SystemStatus>>,
    markers: HashMap<MarkerHandle, String>,
    next_handle: u64,
}

impl ConsoleSink {
    pub fn new(status: Arc<Mutex<SystemStatus>>) -> Self {
        Self {
            status,
            markers: HashMap::new(),
            next_handle: 0,
        }
    }

    fn with_status(&self, update: impl FnOnce(&mut SystemStatus)) {
        if let Ok(mut status) = self.status.lock() {
            update(&mut status);
        }
    }
}

impl RenderSink for ConsoleSink {
    fn create_marker(&mut self, view: &MarkerView) -> MarkerHandle {
        self.next_handle += 1;
        let handle = MarkerHandle(self.next_handle);
        debug!(
            "+ {} {} at {:.4}, {:.4} ({})",
            view.icao24, view.popup.callsign, view.position.lat, view.position.lon, view.popup.altitude
        );
        self.markers.insert(handle, view.icao24.clone());
        let shown = self.markers.len();
        self.with_status(|status| status.markers_shown = shown);
        handle
    }

    fn update_marker(&mut self, _handle: MarkerHandle, view: &MarkerView) {
        if view.selected {
            debug!(
                "* {} at {:.4}, {:.4} heading {:.0}, {} {}",
                view.icao24,
                view.position.lat,
                view.position.lon,
                view.rotation_deg,
                view.popup.altitude,
                view.popup.speed
            );
        }
    }

    fn remove_marker(&mut self, handle: MarkerHandle) {
        if let Some(icao24) = self.markers.remove(&handle) {
            debug!("- {icao24}");
        }
        let shown = self.markers.len();
        self.with_status(|status| status.markers_shown = shown);
    }

    fn show_detail(&mut self, view: &DetailView) {
        let icao24 = view.icao24.clone();
        self.with_status(|status| status.selected = Some(icao24));

        println!("┌─ {} ({})", view.callsign, view.hex);
        println!("│ Country:   {}", view.country);
        println!("│ Speed:     {}", view.speed);
        println!("│ Altitude:  {} (geo {})", view.altitude, view.geo_altitude);
        println!("│ V/S:       {}", view.vertical_rate);
        println!("│ Track:     {}", view.track);
        println!("│ Position:  {}", view.position);
        println!("│ Squawk:    {}", view.squawk);
        println!("│ Source:    {}", view.source);
        println!("│ Last seen: {}", view.last_seen);
        println!("│ {}", view.links.flightradar24);
        println!("└ {}", view.links.flightaware);
    }

    fn update_last_seen(&mut self, view: &LastSeenView) {
        if view.stale {
            debug!("Selected aircraft last seen {view} (stale)");
        } else {
            debug!("Selected aircraft last seen {view}");
        }
    }

    fn hide_detail(&mut self) {
        self.with_status(|status| status.selected = None);
        println!("Detail closed");
    }

    fn draw_trail(&mut self, points: &[GeoPoint]) {
        debug!("Trail: {} points", points.len());
    }

    fn remove_trail(&mut self) {
        debug!("Trail removed");
    }

    fn set_status(&mut self, indicator: StatusIndicator) {
        if indicator.is_error() {
            warn!("Status: {indicator}");
        } else {
            debug!("Status: {indicator}");
        }
        self.with_status(|status| status.set_indicator(indicator));
    }

    fn set_countdown(&mut self, countdown: Countdown) {
        self.with_status(|status| status.countdown = countdown);
    }

    fn notify(&mut self, notice: &Notice) {
        match notice {
            Notice::AircraftCount(_) => info!("{notice}"),
            Notice::NoAircraft | Notice::HighTraffic { .. } => warn!("{notice}"),
            Notice::FeedProblem(_) => error!("{notice}"),
        }
        self.with_status(|status| status.record_notice(notice));
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("invalid region: {0}")]
    Region(String),
}

/// A parsed stdin line
#[derive(Debug, PartialEq)]
pub enum Command {
    Event(UiEvent),
    Status,
    Help,
}

pub fn parse_command(line: &str) -> Result<Command, CommandError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(Command::Event(UiEvent::Interaction));
    };
    let args: Vec<&str> = words.collect();

    let command = match (verb.to_lowercase().as_str(), args.as_slice()) {
        ("select", [hex]) => Command::Event(UiEvent::Select(hex.to_lowercase())),
        ("select", _) => return Err(CommandError::Usage("select <hex>")),
        ("clear", []) => Command::Event(UiEvent::ClearSelection),
        ("hide", []) => Command::Event(UiEvent::VisibilityChanged(false)),
        ("show", []) => Command::Event(UiEvent::VisibilityChanged(true)),
        ("login", [username, password]) => Command::Event(UiEvent::SetCredentials {
            username: (*username).to_string(),
            password: (*password).to_string(),
        }),
        ("login", _) => return Err(CommandError::Usage("login <user> <pass>")),
        ("logout", []) => Command::Event(UiEvent::ClearCredentials),
        ("bbox", [north, south, east, west]) => {
            let region: BoundingBox = parse_bbox(&format!("{north},{south},{east},{west}"))
                .map_err(CommandError::Region)?;
            Command::Event(UiEvent::SetRegion(region))
        }
        ("bbox", _) => return Err(CommandError::Usage("bbox <N> <S> <E> <W>")),
        ("status", []) => Command::Status,
        ("help" | "?", _) => Command::Help,
        ("quit" | "exit", []) => Command::Event(UiEvent::Shutdown),
        _ => return Err(CommandError::Unknown(verb.to_string())),
    };
    Ok(command)
}

fn track_credentials(status: &Mutex<SystemStatus>, event: &UiEvent) {
    let source = match event {
        UiEvent::SetCredentials { .. } => Some("console"),
        UiEvent::ClearCredentials => None,
        _ => return,
    };
    if let Ok(mut status) = status.lock() {
        status.credentials_source = source;
    }
}

/// Read commands from stdin until cancelled.
///
/// The sender is held until cancellation even after stdin closes, so a
/// detached run keeps polling.
pub async fn read_commands(
    events: mpsc::Sender<UiEvent>,
    status: Arc<Mutex<SystemStatus>>,
    cancel: CancellationToken,
) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            () = cancel.cancelled() => return,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("stdin closed, commands disabled");
                break;
            }
            Err(e) => {
                warn!("Failed to read command: {e}");
                break;
            }
        };

        let event = match parse_command(&line) {
            Ok(Command::Event(event)) => event,
            Ok(Command::Status) => {
                if let Ok(status) = status.lock() {
                    print!("{status}");
                }
                UiEvent::Interaction
            }
            Ok(Command::Help) => {
                println!("{HELP}");
                UiEvent::Interaction
            }
            Err(e) => {
                println!("{e}");
                UiEvent::Interaction
            }
        };

        track_credentials(&status, &event);
        let shutdown = event == UiEvent::Shutdown;
        if events.send(event).await.is_err() || shutdown {
            return;
        }
    }

    cancel.cancelled().await;
}
