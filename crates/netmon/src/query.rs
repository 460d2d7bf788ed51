// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Remote queries against a device's management agent.
//!
//! [`DeviceQuery`] is the transport seam; [`SnmpQueryClient`] implements it with SNMPv2c
//! GET over UDP. Workers talk to [`RemoteQueryClient`], which collapses every failure into
//! "no result" after logging it.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_snmp::{Auth, Client, Oid, Value};
use async_trait::async_trait;
use tracing::{debug, trace, warn};

use crate::device::Device;
use crate::errors::QueryError;

/// Values returned by a device, in the order the agent sent them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    values: Vec<(Oid, Value)>,
}

impl QueryResult {
    pub fn new(values: Vec<(Oid, Value)>) -> Self {
        QueryResult { values }
    }

    pub fn get(&self, oid: &Oid) -> Option<&Value> {
        self.values
            .iter()
            .find_map(|(candidate, value)| (candidate == oid).then_some(value))
    }

    pub fn first(&self) -> Option<&Value> {
        self.values.first().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Oid, Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[async_trait]
pub trait DeviceQuery: Send + Sync {
    /// Reads `fields` from `device`. Must give up after a bounded time.
    async fn query(&self, device: &Device, fields: &[Oid]) -> Result<QueryResult, QueryError>;
}

/// Failure-collapsing front end shared by both worker pools.
#[derive(Clone)]
pub struct RemoteQueryClient {
    inner: Arc<dyn DeviceQuery>,
}

impl RemoteQueryClient {
    pub fn new(inner: Arc<dyn DeviceQuery>) -> Self {
        RemoteQueryClient { inner }
    }

    /// Returns `None` on timeout, transport failure, malformed or error responses.
    pub async fn fetch(&self, device: &Device, fields: &[Oid]) -> Option<QueryResult> {
        match self.inner.query(device, fields).await {
            Ok(result) => Some(result),
            Err(e) if e.is_timeout() => {
                debug!(ip = %device.address(), kind = e.kind(), "Query got no answer: {}", e);
                None
            }
            Err(e) => {
                warn!(ip = %device.address(), kind = e.kind(), "Query failed: {}", e);
                None
            }
        }
    }
}

/// SNMPv2c GET through [`async_snmp`], one client per call and a single attempt.
#[derive(Debug)]
pub struct SnmpQueryClient {
    port: u16,
    timeout: Duration,
}

impl SnmpQueryClient {
    pub fn new(port: u16, timeout: Duration) -> Self {
        SnmpQueryClient { port, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange(
        &self,
        target: SocketAddr,
        community: &str,
        fields: &[Oid],
    ) -> Result<QueryResult, QueryError> {
        let client = Client::builder(target.to_string(), Auth::v2c(community))
            .timeout(self.timeout)
            .retries(0)
            .connect()
            .await
            .map_err(|e| query_error(target, self.timeout, e))?;

        let varbinds = client
            .get_many(fields)
            .await
            .map_err(|e| query_error(target, self.timeout, e))?;
        trace!(%target, count = varbinds.len(), "Received GetResponse");

        if let Some(varbind) = varbinds.iter().find(|v| v.value.is_exception()) {
            return Err(QueryError::Protocol {
                address: target,
                reason: format!("{} returned {}", varbind.oid, varbind.value),
            });
        }

        Ok(QueryResult::new(
            varbinds
                .into_iter()
                .map(|varbind| (varbind.oid, varbind.value))
                .collect(),
        ))
    }
}

fn query_error(address: SocketAddr, timeout: Duration, error: async_snmp::Error) -> QueryError {
    match error {
        async_snmp::Error::Timeout { .. } => QueryError::Timeout { address, timeout },
        async_snmp::Error::Io { source, .. } => QueryError::Transport { address, source },
        async_snmp::Error::Snmp { status, index, .. } => QueryError::Agent {
            address,
            status: status.as_i32(),
            index,
        },
        other => QueryError::Protocol {
            address,
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl DeviceQuery for SnmpQueryClient {
    async fn query(&self, device: &Device, fields: &[Oid]) -> Result<QueryResult, QueryError> {
        self.exchange(
            SocketAddr::new(device.address(), self.port),
            device.community(),
            fields,
        )
        .await
    }
}
