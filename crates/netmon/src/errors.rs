// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::time::Duration;

/// Why a remote query produced no result.
///
/// Callers collapse every variant into "no result"; the variant only feeds logs.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("no response from {address} within {timeout:?}")]
    Timeout {
        address: SocketAddr,
        timeout: Duration,
    },
    #[error("transport error talking to {address}: {source}")]
    Transport {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed response from {address}: {reason}")]
    Protocol { address: SocketAddr, reason: String },
    #[error("agent at {address} returned error-status {status} at index {index}")]
    Agent {
        address: SocketAddr,
        status: i32,
        index: u32,
    },
}

impl QueryError {
    /// Short label used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Timeout { .. } => "timeout",
            QueryError::Transport { .. } => "transport",
            QueryError::Protocol { .. } => "protocol",
            QueryError::Agent { .. } => "agent",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Timeout { .. })
    }
}

/// Fatal failure before the receive loop starts.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("couldn't bind syslog listener to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failure delivering an event downstream. Logged, never retried.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to send event: {0}")]
    Request(#[from] reqwest::Error),
    #[error("endpoint rejected event with status {0}")]
    Status(reqwest::StatusCode),
    #[error("event channel closed")]
    ChannelClosed,
}
