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

//! HTTP transport seam for the polling client.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Basic-auth credentials for the feed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A fully-built snapshot request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRequest {
    pub url: String,
    pub credentials: Option<Credentials>,
}

/// Raw response: status code and body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Transport-level failure (no HTTP status was received).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The relay could not be reached at all.
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Other(String),
}

/// Performs a single GET for the polling client.
///
/// Implementations must not retry or queue; each call is exactly one attempt.
pub trait Transport {
    fn get(&self, request: &FeedRequest)
        -> impl Future<Output = Result<FeedResponse, TransportError>>;
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, request: &FeedRequest) -> Result<FeedResponse, TransportError> {
        let mut builder = self.client.get(&request.url);
        if let Some(creds) = &request.credentials {
            builder = builder.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = builder.send().await.map_err(TransportError::from)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(TransportError::from)?;

        Ok(FeedResponse {
            status,
            body: body.to_vec(),
        })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            Self::Connect(e.to_string())
        } else if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Other(e.to_string())
        }
    }
}
