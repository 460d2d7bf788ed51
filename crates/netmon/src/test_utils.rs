// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Test doubles for the query layer.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_snmp::message::CommunityMessage;
use async_snmp::{ErrorStatus, Oid, Pdu, Value};
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::device::Device;
use crate::errors::QueryError;
use crate::query::{DeviceQuery, QueryResult};

/// In-memory [`DeviceQuery`] answering from a fixed table.
///
/// Any device/OID pair missing from the table behaves like an unresponsive device.
#[derive(Default)]
pub struct MockQuery {
    responses: HashMap<(IpAddr, Oid), Value>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, ip: IpAddr, oid: &[u32], value: Value) -> Self {
        self.responses.insert((ip, Oid::from_slice(oid)), value);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceQuery for MockQuery {
    async fn query(&self, device: &Device, fields: &[Oid]) -> Result<QueryResult, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let values: Option<Vec<(Oid, Value)>> = fields
            .iter()
            .map(|oid| {
                self.responses
                    .get(&(device.address(), oid.clone()))
                    .map(|value| (oid.clone(), value.clone()))
            })
            .collect();
        values.map(QueryResult::new).ok_or(QueryError::Timeout {
            address: SocketAddr::new(device.address(), 161),
            timeout: Duration::from_secs(2),
        })
    }
}

/// How a [`FakeAgent`] answers GetRequests.
#[derive(Debug, Clone)]
pub enum AgentBehavior {
    /// Answer from the table, noSuchObject for anything else.
    Values(Vec<(Oid, Value)>),
    /// Send an unrelated response first, then the real one.
    StaleThenValues(Vec<(Oid, Value)>),
    ErrorStatus(ErrorStatus),
    Garbage,
    Silent,
}

impl AgentBehavior {
    pub fn values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (&'static [u32], Value)>,
    {
        AgentBehavior::Values(
            values
                .into_iter()
                .map(|(oid, value)| (Oid::from_slice(oid), value))
                .collect(),
        )
    }
}

/// A local SNMP agent on an ephemeral UDP port.
pub struct FakeAgent {
    addr: SocketAddr,
    communities: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl FakeAgent {
    pub async fn start(ip: IpAddr, behavior: AgentBehavior) -> Self {
        let socket = UdpSocket::bind(SocketAddr::new(ip, 0)).await.unwrap();
        let addr = socket.local_addr().unwrap();
        let communities = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&communities);
        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 65_535];
            loop {
                let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                    return;
                };
                let Ok(request) = CommunityMessage::decode(buf[..len].to_vec().into()) else {
                    continue;
                };
                seen.lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&request.community).into_owned());
                for reply in replies(&request, &behavior) {
                    let _ = socket.send_to(&reply, peer).await;
                }
            }
        });
        FakeAgent {
            addr,
            communities,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Community of every request received so far.
    pub fn communities(&self) -> Vec<String> {
        self.communities.lock().unwrap().clone()
    }
}

impl Drop for FakeAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn replies(request: &CommunityMessage, behavior: &AgentBehavior) -> Vec<Vec<u8>> {
    let respond = |pdu: Pdu| {
        CommunityMessage::new(request.version, request.community.clone(), pdu)
            .encode()
            .to_vec()
    };
    let lookup = |table: &[(Oid, Value)]| -> Pdu {
        let mut response = request.pdu.to_response();
        for varbind in &mut response.varbinds {
            varbind.value = table
                .iter()
                .find(|(oid, _)| *oid == varbind.oid)
                .map_or(Value::NoSuchObject, |(_, value)| value.clone());
        }
        response
    };

    match behavior {
        AgentBehavior::Values(table) => vec![respond(lookup(table))],
        AgentBehavior::StaleThenValues(table) => {
            let mut stale = lookup(&[]);
            stale.request_id = stale.request_id.wrapping_add(1);
            for varbind in &mut stale.varbinds {
                varbind.value = Value::from("stale");
            }
            vec![respond(stale), respond(lookup(table))]
        }
        AgentBehavior::ErrorStatus(status) => {
            vec![respond(request.pdu.to_error_response(*status, 1))]
        }
        AgentBehavior::Garbage => vec![b"\x01\x02garbage".to_vec()],
        AgentBehavior::Silent => Vec::new(),
    }
}
