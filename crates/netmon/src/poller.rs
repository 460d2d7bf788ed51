// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Periodic health checks.
//!
//! [`PollingScheduler`] enqueues one check per device at the start of every cycle without
//! waiting for earlier checks to finish, so a slow device can delay its own status but
//! never the next cycle. [`UptimeChecker`] is the polling pool's handler.

use std::sync::Arc;
use std::time::Duration;

use async_snmp::{Oid, Value};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::constants::SYS_UPTIME_OID;
use crate::device::{Device, DeviceDirectory};
use crate::event::{Uptime, UptimeStatus};
use crate::pool::Handler;
use crate::query::RemoteQueryClient;
use crate::queue::WorkSender;
use crate::sink::EventSink;

pub struct UptimeChecker {
    query: RemoteQueryClient,
    sink: Arc<dyn EventSink>,
    sys_uptime: Oid,
}

impl UptimeChecker {
    pub fn new(query: RemoteQueryClient, sink: Arc<dyn EventSink>) -> Self {
        UptimeChecker {
            query,
            sink,
            sys_uptime: Oid::from_slice(SYS_UPTIME_OID),
        }
    }

    /// Queries sysUpTime. No answer, or a non-numeric one, means the device is down.
    pub async fn check(&self, device: &Device) -> UptimeStatus {
        let Some(result) = self
            .query
            .fetch(device, std::slice::from_ref(&self.sys_uptime))
            .await
        else {
            return UptimeStatus::unreachable(device.address());
        };

        match result.get(&self.sys_uptime).and_then(Value::as_u64) {
            Some(ticks) => UptimeStatus::reachable(device.address(), Uptime::from_ticks(ticks)),
            None => {
                warn!(
                    ip = %device.address(),
                    "sysUpTime response is not numeric: {:?}",
                    result.get(&self.sys_uptime)
                );
                UptimeStatus::unreachable(device.address())
            }
        }
    }
}

#[async_trait]
impl Handler<Arc<Device>> for UptimeChecker {
    async fn handle(&self, device: Arc<Device>) {
        let status = self.check(&device).await;
        debug!(ip = %device, up = status.is_up(), "Checked device");
        self.sink.emit(status.into()).await;
    }
}

pub struct PollingScheduler {
    directory: Arc<DeviceDirectory>,
    interval: Duration,
    tasks: WorkSender<Arc<Device>>,
    cancel_token: CancellationToken,
}

impl PollingScheduler {
    pub fn new(
        directory: Arc<DeviceDirectory>,
        interval: Duration,
        tasks: WorkSender<Arc<Device>>,
        cancel_token: CancellationToken,
    ) -> Self {
        PollingScheduler {
            directory,
            interval,
            tasks,
            cancel_token,
        }
    }

    /// Enqueues one check per device, in directory order. Returns how many were queued.
    pub fn dispatch_cycle(&self) -> usize {
        let mut dispatched = 0;
        for device in self.directory.iter() {
            if self.tasks.push(Arc::clone(device)).is_err() {
                warn!("Polling pool is gone, skipping the rest of this cycle");
                break;
            }
            dispatched += 1;
        }
        dispatched
    }

    /// Dispatches a cycle immediately, then one every `interval` until cancelled.
    ///
    /// The interval is measured from the end of one dispatch to the start of the next.
    pub async fn run(self) {
        info!(
            "Polling {} devices every {:?}",
            self.directory.len(),
            self.interval
        );

        while !self.cancel_token.is_cancelled() {
            let dispatched = self.dispatch_cycle();
            debug!(
                dispatched,
                backlog = self.tasks.len(),
                "Dispatched uptime checks"
            );

            tokio::select! {
                () = self.cancel_token.cancelled() => break,
                () = tokio::time::sleep(self.interval) => {}
            }
        }

        info!("Polling scheduler stopped");
    }
}
