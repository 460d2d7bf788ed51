// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Structured events handed to the [`EventSink`](crate::sink::EventSink).
//!
//! Both record types serialize to flat JSON objects:
//!
//! ```text
//! {"message": "link down", "ip": "10.6.26.1", "switch_name": "switch-A"}
//! {"up": true, "uptime": 12345, "ip": "10.6.26.1", "checked_at": 1718000000}
//! ```

use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::constants::UNKNOWN_DEVICE_NAME;

/// A syslog message correlated with the identity of the device that sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub message: String,
    pub ip: IpAddr,
    /// Resolved sysName, or [`UNKNOWN_DEVICE_NAME`] when resolution failed.
    pub switch_name: String,
}

impl LogEvent {
    pub fn new(payload: &[u8], ip: IpAddr, identity: Option<String>) -> Self {
        LogEvent {
            message: payload_text(payload),
            ip,
            switch_name: identity.unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string()),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.switch_name != UNKNOWN_DEVICE_NAME
    }
}

// Syslog senders commonly terminate datagrams with a newline or NUL.
fn payload_text(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload)
        .trim_end_matches(['\n', '\r', '\0'])
        .to_string()
}

/// Device uptime in SNMP TimeTicks (hundredths of a second).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Uptime(u64);

impl Uptime {
    pub fn from_ticks(ticks: u64) -> Self {
        Uptime(ticks)
    }

    pub fn ticks(self) -> u64 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.0.saturating_mul(10))
    }
}

/// Outcome of one health check against one device.
///
/// An unreachable status never carries an uptime and a reachable one always does; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UptimeStatus {
    up: bool,
    uptime: Option<Uptime>,
    ip: IpAddr,
    /// Unix timestamp, in seconds.
    checked_at: u64,
}

impl UptimeStatus {
    pub fn reachable(ip: IpAddr, uptime: Uptime) -> Self {
        UptimeStatus {
            up: true,
            uptime: Some(uptime),
            ip,
            checked_at: unix_now(),
        }
    }

    pub fn unreachable(ip: IpAddr) -> Self {
        UptimeStatus {
            up: false,
            uptime: None,
            ip,
            checked_at: unix_now(),
        }
    }

    pub fn is_up(&self) -> bool {
        self.up
    }

    pub fn uptime(&self) -> Option<Uptime> {
        self.uptime
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn checked_at(&self) -> u64 {
        self.checked_at
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// Everything the engine emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    LogEvent(LogEvent),
    UptimeStatus(UptimeStatus),
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::LogEvent(_) => "log_event",
            Event::UptimeStatus(_) => "uptime_status",
        }
    }

    pub fn ip(&self) -> IpAddr {
        match self {
            Event::LogEvent(event) => event.ip,
            Event::UptimeStatus(status) => status.ip,
        }
    }

    /// The flat key-value record, without the `type` discriminator.
    pub fn to_record(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            Event::LogEvent(event) => serde_json::to_value(event),
            Event::UptimeStatus(status) => serde_json::to_value(status),
        }
    }
}

impl From<LogEvent> for Event {
    fn from(event: LogEvent) -> Self {
        Event::LogEvent(event)
    }
}

impl From<UptimeStatus> for Event {
    fn from(status: UptimeStatus) -> Self {
        Event::UptimeStatus(status)
    }
}
