// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use netmon::errors::{SinkError, StartupError};

/// Errors that can occur when configuring, starting or stopping the monitor
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to start monitor: {0}")]
    Startup(#[from] StartupError),

    #[error("Failed to build event sink: {0}")]
    Sink(#[from] SinkError),

    #[error("Shutdown timeout exceeded")]
    ShutdownTimeout,
}
