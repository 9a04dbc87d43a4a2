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

//! Rate-limited snapshot polling client.
//!
//! The client issues at most one request per [`ClientConfig::min_poll_interval`],
//! measured from the completion of the previous attempt. It never queues or
//! retries; a call made too early fails fast with [`FeedError::RateLimited`]
//! without touching the network.

mod transport;

pub use transport::{
    Credentials, FeedRequest, FeedResponse, HttpTransport, Transport, TransportError,
};

use std::time::Duration;

use chrono::Utc;
use log::{debug, error, info, warn};
use reqwest::Url;
use thiserror::Error;
use tokio::time::Instant;

use crate::feed::{decode_snapshot, Snapshot};
use crate::region::{
    plan_query, BoundingBox, QueryScope, GLOBAL_QUERY_THRESHOLD_DEGREES, MAX_BOX_SPAN_DEGREES,
};

/// Default relay address.
pub const DEFAULT_RELAY_URL: &str = "http://localhost:3000";

/// Failure of a single snapshot fetch. None of these are fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    /// The local rate gate refused the call; no request was made.
    #[error("rate limited locally, poll skipped")]
    RateLimited,
    /// HTTP 429 from upstream.
    #[error("data temporarily unavailable (rate limited by server)")]
    RateLimitedByServer,
    /// HTTP 401 from upstream.
    #[error("authentication failed: invalid username/password")]
    AuthFailed,
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
}

impl FeedError {
    /// Whether this outcome should be skipped without telling the user.
    #[must_use]
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::RateLimited)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("HTTP {0}")]
    Status(u16),
    #[error("relay unreachable ({0}), is the local relay running?")]
    RelayUnreachable(String),
    #[error("{0}")]
    Transport(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
#[error("invalid relay url '{url}': {reason}")]
pub struct InvalidBaseUrl {
    pub url: String,
    pub reason: String,
}

/// Configuration for the polling client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay endpoint the query string is appended to.
    pub base_url: String,
    /// Minimum time between the completion of one request and the next call.
    pub min_poll_interval: Duration,
    /// Regions wider than this (degrees, either axis) are queried globally.
    pub global_query_threshold: f64,
    /// Maximum span (degrees) per axis of a bounded query.
    pub max_box_span: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_RELAY_URL.to_string(),
            min_poll_interval: Duration::from_millis(5000),
            global_query_threshold: GLOBAL_QUERY_THRESHOLD_DEGREES,
            max_box_span: MAX_BOX_SPAN_DEGREES,
        }
    }
}

/// Minimum-interval gate keyed on the last completed request.
#[derive(Debug, Clone)]
pub struct RateGate {
    min_interval: Duration,
    last_completed: Option<Instant>,
}

impl RateGate {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_completed: None,
        }
    }

    #[must_use]
    pub fn permits(&self, now: Instant) -> bool {
        self.last_completed
            .map_or(true, |last| now.saturating_duration_since(last) >= self.min_interval)
    }

    /// Time left until the gate opens.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        self.last_completed.map_or(Duration::ZERO, |last| {
            self.min_interval
                .saturating_sub(now.saturating_duration_since(last))
        })
    }

    pub fn record(&mut self, completed_at: Instant) {
        self.last_completed = Some(completed_at);
    }
}

/// Snapshot polling client.
#[derive(Debug)]
pub struct PollingClient<T> {
    base_url: Url,
    config: ClientConfig,
    transport: T,
    gate: RateGate,
    credentials: Option<Credentials>,
    last_cache_buster: i64,
}

impl<T: Transport> PollingClient<T> {
    pub fn new(config: ClientConfig, transport: T) -> Result<Self, InvalidBaseUrl> {
        let base_url = Url::parse(&config.base_url).map_err(|e| InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            base_url,
            gate: RateGate::new(config.min_poll_interval),
            config,
            transport,
            credentials: None,
            last_cache_buster: 0,
        })
    }

    /// Configure Basic credentials. Returns `false` (and leaves the current
    /// credentials untouched) if either part is empty.
    pub fn set_credentials(&mut self, username: &str, password: &str) -> bool {
        if username.is_empty() || password.is_empty() {
            return false;
        }
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        info!("Credentials set for {}", username);
        true
    }

    pub fn clear_credentials(&mut self) {
        self.credentials = None;
    }

    #[must_use]
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Whether the rate gate would let a request through right now.
    #[must_use]
    pub fn can_poll(&self) -> bool {
        self.gate.permits(Instant::now())
    }

    #[must_use]
    pub fn rate_gate(&self) -> &RateGate {
        &self.gate
    }

    /// Build the request for a region, advancing the cache buster.
    pub fn build_request(&mut self, region: &BoundingBox) -> FeedRequest {
        let scope = plan_query(
            region,
            self.config.global_query_threshold,
            self.config.max_box_span,
        );

        let mut url = self.base_url.clone();
        {
            let mut query = url.query_pairs_mut();
            if let QueryScope::Bounded(bbox) = scope {
                query
                    .append_pair("lamin", &bbox.south.to_string())
                    .append_pair("lomin", &bbox.west.to_string())
                    .append_pair("lamax", &bbox.north.to_string())
                    .append_pair("lomax", &bbox.east.to_string());
            }
            query.append_pair("_", &self.next_cache_buster().to_string());
        }

        FeedRequest {
            url: url.into(),
            credentials: self.credentials.clone(),
        }
    }

    /// Fetch one snapshot for `region`.
    pub async fn fetch_snapshot(&mut self, region: &BoundingBox) -> Result<Snapshot, FeedError> {
        let now = Instant::now();
        if !self.gate.permits(now) {
            debug!(
                "Skipping poll, rate gate closed for another {:?}",
                self.gate.remaining(now)
            );
            return Err(FeedError::RateLimited);
        }

        let request = self.build_request(region);
        debug!("Fetching {}", request.url);

        let result = self.transport.get(&request).await;
        self.gate.record(Instant::now());

        let response = match result {
            Ok(response) => response,
            Err(TransportError::Connect(detail)) => {
                error!(
                    "Cannot reach relay at {}: {}. Is the relay running?",
                    self.base_url, detail
                );
                return Err(NetworkError::RelayUnreachable(detail).into());
            }
            Err(e) => {
                error!("Fetch error: {}", e);
                return Err(NetworkError::Transport(e.to_string()).into());
            }
        };

        classify(response)
    }

    fn next_cache_buster(&mut self) -> i64 {
        let now_ms = Utc::now().timestamp_millis();
        self.last_cache_buster = now_ms.max(self.last_cache_buster + 1);
        self.last_cache_buster
    }
}

fn classify(response: FeedResponse) -> Result<Snapshot, FeedError> {
    match response.status {
        429 => {
            warn!("Feed rate limited by server (HTTP 429)");
            Err(FeedError::RateLimitedByServer)
        }
        401 => {
            warn!("Feed rejected credentials (HTTP 401)");
            Err(FeedError::AuthFailed)
        }
        status if !(200..300).contains(&status) => {
            warn!("Feed returned HTTP {}", status);
            Err(NetworkError::Status(status).into())
        }
        _ => decode_snapshot(&response.body).map_err(|e| {
            warn!("Could not decode snapshot: {}", e);
            FeedError::Network(NetworkError::Decode(e.to_string()))
        }),
    }
}
