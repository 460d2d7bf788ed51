// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A scripted SNMPv2c agent built from `async_snmp` message types.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_snmp::message::CommunityMessage;
use netmon::{Oid, Value};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

pub struct MockAgent {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl MockAgent {
    /// Answers GetRequests from `table`, noSuchObject for anything else.
    pub async fn start(table: Vec<(Oid, Value)>) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock agent");
        let addr = socket.local_addr().expect("mock agent has no address");
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&requests);

        let task = tokio::spawn(async move {
            let mut buf = vec![0u8; 65_535];
            while let Ok((len, peer)) = socket.recv_from(&mut buf).await {
                let Ok(request) = CommunityMessage::decode(buf[..len].to_vec().into()) else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut pdu = request.pdu.to_response();
                for varbind in &mut pdu.varbinds {
                    varbind.value = table
                        .iter()
                        .find(|(oid, _)| *oid == varbind.oid)
                        .map_or(Value::NoSuchObject, |(_, value)| value.clone());
                }
                let response = CommunityMessage::new(request.version, request.community, pdu);
                let _ = socket.send_to(&response.encode(), peer).await;
            }
        });

        MockAgent {
            addr,
            requests,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Drop for MockAgent {
    fn drop(&mut self) {
        self.task.abort();
    }
}
