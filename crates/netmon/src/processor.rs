// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns accepted syslog datagrams into [`LogEvent`]s.
//!
//! Each message costs one sysName query against its sender. When the query yields
//! nothing the event is still emitted, with the identity set to "Unknown".

use std::net::IpAddr;
use std::sync::Arc;

use async_snmp::Oid;
use async_trait::async_trait;
use tracing::debug;

use crate::constants::SYS_NAME_OID;
use crate::device::DeviceDirectory;
use crate::event::LogEvent;
use crate::listener::InboundMessage;
use crate::pool::Handler;
use crate::query::RemoteQueryClient;
use crate::sink::EventSink;

pub struct LogEventProcessor {
    directory: Arc<DeviceDirectory>,
    query: RemoteQueryClient,
    sink: Arc<dyn EventSink>,
    sys_name: Oid,
}

impl LogEventProcessor {
    pub fn new(
        directory: Arc<DeviceDirectory>,
        query: RemoteQueryClient,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        LogEventProcessor {
            directory,
            query,
            sink,
            sys_name: Oid::from_slice(SYS_NAME_OID),
        }
    }

    /// The device's sysName as text, if the device is known and answered.
    pub async fn resolve_identity(&self, ip: IpAddr) -> Option<String> {
        let Some(device) = self.directory.get(ip) else {
            debug!("No device entry for {}, skipping identity lookup", ip);
            return None;
        };
        let result = self
            .query
            .fetch(device, std::slice::from_ref(&self.sys_name))
            .await?;
        result
            .get(&self.sys_name)
            .or_else(|| result.first())
            .map(ToString::to_string)
    }

    pub async fn process(&self, message: InboundMessage) -> LogEvent {
        let ip = message.source.ip().to_canonical();
        let identity = self.resolve_identity(ip).await;
        let event = LogEvent::new(&message.payload, ip, identity);
        debug!(ip = %ip, switch_name = %event.switch_name, "Processed syslog message");
        event
    }
}

#[async_trait]
impl Handler<InboundMessage> for LogEventProcessor {
    async fn handle(&self, message: InboundMessage) {
        let event = self.process(message).await;
        self.sink.emit(event.into()).await;
    }
}
