// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use netmon::{
    listener::{ListenerConfig, SyslogListener},
    poller::{PollingScheduler, UptimeChecker},
    pool::{Drain, PoolHandle, WorkerPool},
    processor::LogEventProcessor,
    query::{DeviceQuery, RemoteQueryClient, SnmpQueryClient},
    queue::work_queue,
    sink::{EventSink, HttpSink, LogSink},
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{config::MonitorConfig, error::MonitorError};

const PROCESSING_POOL: &str = "processing";
const POLLING_POOL: &str = "polling";
const EVENT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the running monitor.
///
/// Dropping the handle leaves the monitor running; call [`MonitorHandle::shutdown`] to
/// stop it.
pub struct MonitorHandle {
    local_addr: Option<SocketAddr>,
    cancel_token: CancellationToken,
    listener: JoinHandle<()>,
    scheduler: JoinHandle<()>,
    processing: PoolHandle,
    polling: PoolHandle,
    drain_timeout: Duration,
}

impl MonitorHandle {
    /// Address the syslog listener is bound to.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Cancelling this token stops the listener and the scheduler; queued work is left to
    /// the pools.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Stop accepting work, then give both pools `drain_timeout` to finish what is queued.
    ///
    /// Returns [`MonitorError::ShutdownTimeout`] if either pool had to be aborted.
    pub async fn shutdown(self) -> Result<(), MonitorError> {
        info!("Shutting down monitor");
        self.cancel_token.cancel();

        // Both producers drop their end of the queues on exit, which lets the pools finish
        if let Err(e) = self.listener.await {
            error!("Syslog listener task failed: {:?}", e);
        }
        if let Err(e) = self.scheduler.await {
            error!("Polling scheduler task failed: {:?}", e);
        }

        let (processing, polling) = tokio::join!(
            self.processing.drain(self.drain_timeout),
            self.polling.drain(self.drain_timeout)
        );
        if processing == Drain::Complete && polling == Drain::Complete {
            info!("Monitor stopped");
            Ok(())
        } else {
            Err(MonitorError::ShutdownTimeout)
        }
    }
}

/// Owns the configuration and capabilities needed to start the monitor.
pub struct UnifiedMonitor {
    config: MonitorConfig,
    query: Arc<dyn DeviceQuery>,
    sink: Arc<dyn EventSink>,
}

impl UnifiedMonitor {
    pub fn new(
        config: MonitorConfig,
        query: Arc<dyn DeviceQuery>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            query,
            sink,
        }
    }

    /// SNMP over UDP, with events POSTed to the configured endpoint or logged.
    pub fn from_config(config: MonitorConfig) -> Result<Self, MonitorError> {
        let query = Arc::new(SnmpQueryClient::new(config.snmp_port, config.query_timeout));
        let sink: Arc<dyn EventSink> = match &config.event_endpoint {
            Some(endpoint) => {
                debug!("Delivering events to {}", endpoint);
                Arc::new(HttpSink::new(endpoint, EVENT_DELIVERY_TIMEOUT)?)
            }
            None => {
                debug!("No event endpoint configured, logging events");
                Arc::new(LogSink)
            }
        };
        Ok(Self::new(config, query, sink))
    }

    /// Bind the syslog socket and start every component.
    ///
    /// Failing to bind is fatal and nothing is left running.
    pub async fn start(self) -> Result<MonitorHandle, MonitorError> {
        self.config.validate()?;

        let directory = Arc::new(self.config.directory());
        let query = RemoteQueryClient::new(self.query);
        let cancel_token = CancellationToken::new();

        let (ingest_tx, ingest_rx) = work_queue();
        let listener = SyslogListener::bind(
            &ListenerConfig {
                host: self.config.syslog_host.clone(),
                port: self.config.syslog_port,
            },
            Arc::clone(&directory),
            ingest_tx,
            cancel_token.clone(),
        )
        .await?;
        let local_addr = listener.local_addr();

        let processing = WorkerPool::spawn(
            PROCESSING_POOL,
            self.config.processor_workers,
            ingest_rx,
            Arc::new(LogEventProcessor::new(
                Arc::clone(&directory),
                query.clone(),
                Arc::clone(&self.sink),
            )),
        );

        let (poll_tx, poll_rx) = work_queue();
        let polling = WorkerPool::spawn(
            POLLING_POOL,
            self.config.checker_workers,
            poll_rx,
            Arc::new(UptimeChecker::new(query, self.sink)),
        );
        let scheduler = PollingScheduler::new(
            Arc::clone(&directory),
            self.config.check_interval,
            poll_tx,
            cancel_token.clone(),
        );

        let listener = tokio::spawn(listener.spin());
        let scheduler = tokio::spawn(scheduler.run());

        info!(
            "Monitoring {} devices with {} processing and {} polling workers",
            directory.len(),
            self.config.processor_workers,
            self.config.checker_workers
        );

        Ok(MonitorHandle {
            local_addr,
            cancel_token,
            listener,
            scheduler,
            processing,
            polling,
            drain_timeout: self.config.drain_timeout,
        })
    }
}
