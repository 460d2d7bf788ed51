// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Unbounded multi-producer, multi-consumer FIFO between the receive loop and a worker
//! pool.
//!
//! Producers never block. Consumers park in [`WorkQueue::pop`] until an item arrives, and
//! get `None` once every [`WorkSender`] is dropped and the backlog is drained.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

pub fn work_queue<T>() -> (WorkSender<T>, WorkQueue<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        WorkSender {
            tx,
            depth: Arc::clone(&depth),
        },
        WorkQueue {
            rx: Arc::new(Mutex::new(rx)),
            depth,
        },
    )
}

pub struct WorkSender<T> {
    tx: mpsc::UnboundedSender<T>,
    depth: Arc<AtomicUsize>,
}

impl<T> WorkSender<T> {
    /// Appends an item. Hands it back if every consumer is gone.
    pub fn push(&self, item: T) -> Result<(), T> {
        self.depth.fetch_add(1, Ordering::Relaxed);
        self.tx.send(item).map_err(|e| {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            e.0
        })
    }

    /// Items pushed but not yet popped. Zero once every consumer is gone, since whatever
    /// is left in the channel will never be processed.
    pub fn len(&self) -> usize {
        if self.tx.is_closed() {
            return 0;
        }
        self.depth.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Clone for WorkSender<T> {
    fn clone(&self) -> Self {
        WorkSender {
            tx: self.tx.clone(),
            depth: Arc::clone(&self.depth),
        }
    }
}

pub struct WorkQueue<T> {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<T>>>,
    depth: Arc<AtomicUsize>,
}

impl<T> WorkQueue<T> {
    /// Waits for the next item; each item is handed to exactly one caller.
    pub async fn pop(&self) -> Option<T> {
        let item = self.rx.lock().await.recv().await;
        if item.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        item
    }

    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        WorkQueue {
            rx: Arc::clone(&self.rx),
            depth: Arc::clone(&self.depth),
        }
    }
}
