// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Egress for emitted events.
//!
//! Delivery is fire-and-forget: a sink logs its own failures and never reports them back
//! to the worker that emitted the event.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::errors::SinkError;
use crate::event::Event;

const LOG_EVENTS_PATH: &str = "log-events";
const UPTIME_STATUSES_PATH: &str = "uptime-statuses";

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

/// Writes every event as a JSON line through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn emit(&self, event: Event) {
        match event.to_record() {
            Ok(record) => info!(kind = event.kind(), "{}", record),
            Err(e) => error!(kind = event.kind(), "Failed to serialize event: {}", e),
        }
    }
}

/// Forwards events to an in-process consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelSink { tx }, rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            debug!("{}", SinkError::ChannelClosed);
        }
    }
}

/// POSTs each record as JSON to `{endpoint}/log-events` or `{endpoint}/uptime-statuses`.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSink {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpSink {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, event: &Event) -> String {
        let path = match event {
            Event::LogEvent(_) => LOG_EVENTS_PATH,
            Event::UptimeStatus(_) => UPTIME_STATUSES_PATH,
        };
        format!("{}/{}", self.endpoint, path)
    }

    pub async fn post(&self, event: &Event) -> Result<(), SinkError> {
        let record = event.to_record()?;
        let response = self
            .client
            .post(self.url(event))
            .json(&record)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status(status));
        }
        debug!(kind = event.kind(), ip = %event.ip(), "Delivered event");
        Ok(())
    }
}

#[async_trait]
impl EventSink for HttpSink {
    async fn emit(&self, event: Event) {
        if let Err(e) = self.post(&event).await {
            error!(kind = event.kind(), ip = %event.ip(), "Failed to deliver event: {}", e);
        }
    }
}
