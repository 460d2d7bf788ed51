// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Syslog receive loop.
//!
//! Binds a UDP socket, reads one datagram at a time and enqueues those whose source is a
//! monitored device. The loop does no other work, so a slow device lookup can never hold
//! up the socket.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::constants::BUFFER_SIZE;
use crate::device::DeviceDirectory;
use crate::errors::StartupError;
use crate::queue::WorkSender;

// Backoff after a failed receive: 10ms * 2^n, capped at 10ms * 2^MAX_BACKOFF_EXPONENT
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// Where the syslog socket binds.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Host to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Port to bind to, 0 picks an ephemeral port
    pub port: u16,
}

/// A datagram accepted from a monitored device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub payload: Vec<u8>,
    pub source: SocketAddr,
}

enum BufferReader {
    UdpSocket(tokio::net::UdpSocket),

    /// Replays a fixed datagram, for tests
    #[allow(dead_code)]
    MirrorTest(Vec<u8>, SocketAddr),
}

impl BufferReader {
    async fn read(&self) -> std::io::Result<(Vec<u8>, SocketAddr)> {
        match self {
            BufferReader::UdpSocket(socket) => {
                // Anything past BUFFER_SIZE is truncated by the kernel
                let mut buf = [0; BUFFER_SIZE];
                let (amt, src) = socket.recv_from(&mut buf).await?;
                Ok((buf[..amt].to_owned(), src))
            }
            BufferReader::MirrorTest(data, source) => Ok((data.clone(), *source)),
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        match self {
            BufferReader::UdpSocket(socket) => socket.local_addr().ok(),
            BufferReader::MirrorTest(..) => None,
        }
    }
}

pub struct SyslogListener {
    cancel_token: CancellationToken,
    directory: Arc<DeviceDirectory>,
    queue: WorkSender<InboundMessage>,
    buffer_reader: BufferReader,
}

impl SyslogListener {
    /// Binds the syslog socket. Failing to bind is the only fatal error of this component.
    pub async fn bind(
        config: &ListenerConfig,
        directory: Arc<DeviceDirectory>,
        queue: WorkSender<InboundMessage>,
        cancel_token: CancellationToken,
    ) -> Result<SyslogListener, StartupError> {
        let addr = format!("{}:{}", config.host, config.port);
        let socket = tokio::net::UdpSocket::bind(&addr)
            .await
            .map_err(|source| StartupError::Bind {
                address: addr.clone(),
                source,
            })?;

        Ok(SyslogListener {
            cancel_token,
            directory,
            queue,
            buffer_reader: BufferReader::UdpSocket(socket),
        })
    }

    /// The bound address, useful when binding to port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.buffer_reader.local_addr()
    }

    /// Receives until cancelled. Dropping the listener afterwards closes its end of the
    /// ingestion queue.
    pub async fn spin(self) {
        if let Some(addr) = self.local_addr() {
            info!("Listening for syslog on {}", addr);
        }

        let mut consecutive_errors = 0u32;
        loop {
            let consumed = tokio::select! {
                () = self.cancel_token.cancelled() => break,
                consumed = self.consume_datagram() => consumed,
            };

            if let Err(e) = consumed {
                error!("Failed to receive syslog datagram: {}", e);
                consecutive_errors = consecutive_errors.saturating_add(1);
                let backoff =
                    Duration::from_millis(10u64 << consecutive_errors.min(MAX_BACKOFF_EXPONENT));
                tokio::select! {
                    () = self.cancel_token.cancelled() => break,
                    () = tokio::time::sleep(backoff) => {}
                }
            } else {
                consecutive_errors = 0;
            }
        }

        info!("Syslog listener stopped");
    }

    /// Receive one datagram and enqueue it if its source is monitored. Returns whether it
    /// was enqueued.
    async fn consume_datagram(&self) -> std::io::Result<bool> {
        let (payload, source) = self.buffer_reader.read().await?;
        Ok(self.admit(payload, source))
    }

    fn admit(&self, payload: Vec<u8>, source: SocketAddr) -> bool {
        let source = SocketAddr::new(source.ip().to_canonical(), source.port());
        if !self.directory.contains(source.ip()) {
            debug!("Dropping datagram from unmonitored source {}", source.ip());
            return false;
        }

        trace!(
            "Received syslog from {}: {}",
            source,
            String::from_utf8_lossy(&payload)
        );
        if self.queue.push(InboundMessage { payload, source }).is_err() {
            error!("Ingestion queue closed, dropping datagram from {}", source);
            return false;
        }
        true
    }
}
