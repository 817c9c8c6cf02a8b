//! Bounded FIFO hand-off between the segment producer and the broadcaster.
//!
//! The producer waits when the queue is full; the broadcaster never waits
//! longer than the bound it asks for.

use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

use crate::segment::Segment;

pub fn segment_queue(capacity: usize) -> (SegmentSender, SegmentReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (SegmentSender { tx }, SegmentReceiver { rx })
}

#[derive(Clone)]
pub struct SegmentSender {
    tx: mpsc::Sender<Segment>,
}

impl SegmentSender {
    /// Appends a segment, waiting for a free slot if the queue is full.
    pub async fn send(&self, segment: Segment) -> Result<()> {
        self.tx
            .send(segment)
            .await
            .map_err(|_| anyhow!("Segment queue receiver dropped"))
    }

    /// Appends a segment only if a slot is free right now.
    pub fn try_send(&self, segment: Segment) -> Result<(), Segment> {
        match self.tx.try_send(segment) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(segment)) | Err(TrySendError::Closed(segment)) => Err(segment),
        }
    }

    /// Number of segments currently waiting.
    pub fn len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

pub struct SegmentReceiver {
    rx: mpsc::Receiver<Segment>,
}

impl SegmentReceiver {
    pub fn try_pop(&mut self) -> Option<Segment> {
        match self.rx.try_recv() {
            Ok(segment) => Some(segment),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Waits at most `wait` for the next segment.
    pub async fn pop_timeout(&mut self, wait: Duration) -> Option<Segment> {
        if wait.is_zero() {
            return self.try_pop();
        }

        match tokio::time::timeout(wait, self.rx.recv()).await {
            Ok(segment) => segment,
            Err(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
