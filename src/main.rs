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

mod cli;
mod config;
mod console;
mod status;

use std::sync::{Arc, Mutex};

use clap::Parser;
use log::{error, info, warn, LevelFilter};
use skywatch_core::{Driver, HttpTransport, LiveSession, PollingClient};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use cli::Opts;
use config::AppConfig;
use console::ConsoleSink;
use status::SystemStatus;

/// Queue depth for console commands
const EVENT_QUEUE: usize = 32;

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::parse();
    init_logging(opts.verbose);

    if opts.print_config_path {
        println!("{}", AppConfig::config_path()?.display());
        return Ok(());
    }

    let mut config = AppConfig::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {e}, using defaults");
        AppConfig::default()
    });
    opts.apply_overrides(&mut config);
    let region = opts.region(&config)?;

    info!("Starting skywatch against {}", config.relay_url);

    let transport = HttpTransport::new(config.request_timeout())?;
    let mut client = PollingClient::new(config.client_config(), transport)?;
    let credentials_source = match config.credentials() {
        Some((username, password)) if client.set_credentials(&username, &password) => {
            config.credentials_source()
        }
        _ => {
            warn!("No feed credentials configured, using anonymous access");
            None
        }
    };

    let status = Arc::new(Mutex::new(SystemStatus::new(
        &config.relay_url,
        credentials_source,
    )));
    let session = LiveSession::new(
        config.session_config(),
        ConsoleSink::new(Arc::clone(&status)),
    );
    let driver = Driver::new(session, client, region);

    let (tx, rx) = mpsc::channel(EVENT_QUEUE);
    let cancel = CancellationToken::new();

    tokio::spawn(console::read_commands(tx, status, cancel.clone()));

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            ctrl_c.cancel();
        }
    });

    driver.run(rx, cancel.clone()).await;
    cancel.cancel();

    info!("Stopped");
    Ok(())
}
