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

use clap::{crate_authors, crate_description, crate_name, crate_version, Parser};
use skywatch_core::region::{is_valid_coordinate, RegionError};
use skywatch_core::{BoundingBox, GeoPoint};

use crate::config::AppConfig;

/// CLI options
#[derive(Parser, Debug)]
#[command(name = crate_name!(), about = crate_description!())]
#[command(version = crate_version!(), author = crate_authors!())]
pub struct Opts {
    /// Relay endpoint (overrides the config file)
    #[arg(long)]
    pub relay_url: Option<String>,
    /// Query region as NORTH,SOUTH,EAST,WEST degrees
    #[arg(long, value_parser = parse_bbox, allow_hyphen_values = true, conflicts_with = "center")]
    pub bbox: Option<BoundingBox>,
    /// Centre of the query region as LAT,LON
    #[arg(long, value_parser = parse_center, allow_hyphen_values = true)]
    pub center: Option<GeoPoint>,
    /// Radius of the query region around the centre
    #[arg(long)]
    pub radius_km: Option<f64>,
    /// Maximum aircraft drawn per snapshot
    #[arg(long)]
    pub budget: Option<usize>,
    /// Verbose mode.
    #[arg(short, long)]
    pub verbose: bool,
    /// Print the configuration file path and exit
    #[arg(long)]
    pub print_config_path: bool,
}

impl Opts {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(url) = &self.relay_url {
            config.relay_url.clone_from(url);
        }
        if let Some(budget) = self.budget {
            config.display_budget = budget;
        }
    }

    /// Initial query region: explicit box, else centre/radius, else the
    /// configured default location
    pub fn region(&self, config: &AppConfig) -> Result<BoundingBox, RegionError> {
        if let Some(bbox) = self.bbox {
            return Ok(bbox);
        }
        let center = self
            .center
            .unwrap_or_else(|| GeoPoint::new(config.default_latitude, config.default_longitude));
        let radius = self.radius_km.unwrap_or(config.default_radius_km);
        BoundingBox::around(center.lat, center.lon, radius)
    }
}

fn parse_numbers(value: &str, expected: usize) -> Result<Vec<f64>, String> {
    let numbers = value
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("'{}': {e}", part.trim()))
        })
        .collect::<Result<Vec<f64>, String>>()?;

    if numbers.len() == expected {
        Ok(numbers)
    } else {
        Err(format!(
            "expected {expected} comma-separated numbers, got {}",
            numbers.len()
        ))
    }
}

pub fn parse_bbox(value: &str) -> Result<BoundingBox, String> {
    let n = parse_numbers(value, 4)?;
    let (north, south, east, west) = (n[0], n[1], n[2], n[3]);

    if !is_valid_coordinate(north, east) || !is_valid_coordinate(south, west) {
        return Err(format!("coordinates out of range: {value}"));
    }
    if north < south {
        return Err(format!("north ({north}) is below south ({south})"));
    }
    Ok(BoundingBox::new(north, south, east, west))
}

pub fn parse_center(value: &str) -> Result<GeoPoint, String> {
    let n = parse_numbers(value, 2)?;
    if is_valid_coordinate(n[0], n[1]) {
        Ok(GeoPoint::new(n[0], n[1]))
    } else {
        Err(format!("coordinates out of range: {value}"))
    }
}
