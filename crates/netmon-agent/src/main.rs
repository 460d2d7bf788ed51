// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod logger;

use std::process::ExitCode;

use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use netmon_core::{MonitorConfig, UnifiedMonitor};

// async_snmp reports every failed request at error level; netmon logs query failures itself
fn filter_directives(log_level: &str) -> String {
    format!("h2=off,hyper=off,rustls=off,async_snmp=off,{log_level}")
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = match MonitorConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            // No subscriber yet, the config decides the log level
            eprintln!("NETMON | ERROR | {}", e);
            return ExitCode::FAILURE;
        }
    };

    let filter = match EnvFilter::try_new(filter_directives(&config.log_level)) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("NETMON | ERROR | could not parse log level: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(filter)
        .event_format(logger::Formatter)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("NETMON | ERROR | setting default subscriber failed: {}", e);
        return ExitCode::FAILURE;
    }

    debug!("Logging subsystem enabled");

    let monitor = match UnifiedMonitor::from_config(config) {
        Ok(monitor) => monitor,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let handle = match monitor.start().await {
        Ok(handle) => handle,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for shutdown signal: {}", e);
    }
    info!("Received shutdown signal");

    match handle.shutdown().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
