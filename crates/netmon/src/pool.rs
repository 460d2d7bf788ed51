// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fixed-size worker pools draining a [`WorkQueue`].
//!
//! Each pool runs `size` workers under a supervisor task. A worker that panics is logged
//! and replaced so the pool keeps its size; the panicking item is lost. The pool finishes
//! once its queue is closed and drained.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, warn};

use crate::queue::WorkQueue;

/// Processes one item at a time; invoked concurrently by every worker of a pool.
#[async_trait]
pub trait Handler<T>: Send + Sync + 'static {
    async fn handle(&self, item: T);
}

/// How a pool ended when asked to drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Every queued item was processed and all workers exited.
    Complete,
    /// The deadline elapsed and remaining workers were aborted.
    Aborted,
}

pub struct WorkerPool;

impl WorkerPool {
    pub fn spawn<T>(
        name: &'static str,
        size: usize,
        queue: WorkQueue<T>,
        handler: Arc<dyn Handler<T>>,
    ) -> PoolHandle
    where
        T: Send + 'static,
    {
        let supervisor = tokio::spawn(supervise(name, size.max(1), queue, handler));
        PoolHandle { name, supervisor }
    }
}

async fn supervise<T>(
    name: &'static str,
    size: usize,
    queue: WorkQueue<T>,
    handler: Arc<dyn Handler<T>>,
) -> usize
where
    T: Send + 'static,
{
    let mut workers = JoinSet::new();
    for _ in 0..size {
        workers.spawn(run_worker(queue.clone(), Arc::clone(&handler)));
    }
    debug!(pool = name, size, "Worker pool started");

    let mut replaced = 0;
    while let Some(finished) = workers.join_next().await {
        match finished {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                // Don't shrink the pool on panic - log and replace
                error!(pool = name, "Worker panicked, replacing it: {:?}", e);
                workers.spawn(run_worker(queue.clone(), Arc::clone(&handler)));
                replaced += 1;
            }
            Err(e) => debug!(pool = name, "Worker cancelled: {:?}", e),
        }
    }

    debug!(pool = name, replaced, "Worker pool stopped");
    replaced
}

async fn run_worker<T: Send + 'static>(queue: WorkQueue<T>, handler: Arc<dyn Handler<T>>) {
    while let Some(item) = queue.pop().await {
        handler.handle(item).await;
    }
}

pub struct PoolHandle {
    name: &'static str,
    supervisor: JoinHandle<usize>,
}

impl PoolHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Waits up to `timeout` for the pool to work through its backlog, then aborts it.
    ///
    /// The queue's producers must already be dropped, otherwise the pool never finishes
    /// on its own.
    pub async fn drain(mut self, timeout: Duration) -> Drain {
        match tokio::time::timeout(timeout, &mut self.supervisor).await {
            Ok(Ok(replaced)) => {
                debug!(pool = self.name, replaced, "Worker pool drained");
                Drain::Complete
            }
            Ok(Err(e)) => {
                error!(pool = self.name, "Worker pool supervisor failed: {:?}", e);
                Drain::Aborted
            }
            Err(_) => {
                warn!(
                    pool = self.name,
                    "Worker pool did not drain within {:?}, aborting", timeout
                );
                self.supervisor.abort();
                Drain::Aborted
            }
        }
    }

    pub fn abort(&self) {
        self.supervisor.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::work_queue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;
    use tracing_test::traced_test;

    struct Recorder {
        tx: mpsc::UnboundedSender<u32>,
    }

    #[async_trait]
    impl Handler<u32> for Recorder {
        async fn handle(&self, item: u32) {
            if item == 13 {
                panic!("unlucky item");
            }
            let _ = self.tx.send(item);
        }
    }

    struct Gauge {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        done: AtomicUsize,
    }

    #[async_trait]
    impl Handler<u32> for Gauge {
        async fn handle(&self, _item: u32) {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.done.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn gauge(delay: Duration) -> Arc<Gauge> {
        Arc::new(Gauge {
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_pool_bounds_concurrency() {
        let (tx, rx) = work_queue();
        let handler = gauge(Duration::from_millis(20));
        let pool = WorkerPool::spawn("test", 3, rx, handler.clone());

        for i in 0..12 {
            tx.push(i).unwrap();
        }
        drop(tx);

        assert_eq!(pool.drain(Duration::from_secs(5)).await, Drain::Complete);
        assert_eq!(handler.done.load(Ordering::SeqCst), 12);
        assert_eq!(handler.peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_pool_replaces_panicked_worker() {
        let (tx, rx) = work_queue();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let pool = WorkerPool::spawn("test", 1, rx, Arc::new(Recorder { tx: out_tx }));

        for i in [12, 13, 14] {
            tx.push(i).unwrap();
        }
        drop(tx);

        assert_eq!(pool.drain(Duration::from_secs(5)).await, Drain::Complete);

        let mut processed = Vec::new();
        while let Ok(item) = out_rx.try_recv() {
            processed.push(item);
        }
        assert_eq!(processed, vec![12, 14]);
        assert!(logs_contain("Worker panicked, replacing it"));
    }

    #[tokio::test]
    async fn test_drain_aborts_after_timeout() {
        let (tx, rx) = work_queue();
        let handler = gauge(Duration::from_secs(60));
        let pool = WorkerPool::spawn("test", 1, rx, handler.clone());

        tx.push(1).unwrap();
        drop(tx);

        assert_eq!(
            pool.drain(Duration::from_millis(50)).await,
            Drain::Aborted
        );
        assert_eq!(handler.done.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_pool_waits_while_queue_open() {
        let (tx, rx) = work_queue::<u32>();
        let pool = WorkerPool::spawn("test", 2, rx, gauge(Duration::ZERO));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pool.is_finished());

        drop(tx);
        assert_eq!(pool.drain(Duration::from_secs(5)).await, Drain::Complete);
    }
}
