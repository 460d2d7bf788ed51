// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Concurrent ingestion-and-polling engine for network-device monitoring.
//!
//! Two independent flows share a device directory and a remote query client:
//!
//! ```text
//! UDP syslog ──> SyslogListener ──> WorkQueue ──> processing pool ──> EventSink (LogEvent)
//! PollingScheduler ──────────────> WorkQueue ──> polling pool    ──> EventSink (UptimeStatus)
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod constants;
pub mod device;
pub mod errors;
pub mod event;
pub mod listener;
pub mod poller;
pub mod pool;
pub mod processor;
pub mod query;
pub mod queue;
pub mod sink;

pub use async_snmp::{Oid, Value};

#[cfg(test)]
pub(crate) mod test_utils;
