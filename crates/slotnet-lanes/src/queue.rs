use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::error::{LaneError, Result};

/// A two-stage FIFO.
///
/// Any number of producers append to the incoming stage. The tick context
/// periodically moves everything incoming to the back of the staging stage
/// and pops staged items from the front. Incoming is an unbounded lock-free
/// channel, so enqueueing never blocks and never drops.
#[derive(Debug)]
pub struct WorkQueue<T> {
    sender: Sender<T>,
    receiver: Receiver<T>,
    staging: Mutex<VecDeque<T>>,
    closed: AtomicBool,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            staging: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Append an item to the incoming stage.
    pub fn enqueue(&self, item: T) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(LaneError::Closed);
        }
        // The queue owns a receiver, so the channel cannot be disconnected.
        self.sender.send(item).map_err(|_| LaneError::Closed)
    }

    /// Move every incoming item to the back of staging, preserving order.
    ///
    /// Items already staged stay ahead of the new ones. Returns the number
    /// of items moved.
    pub fn drain_to_staging(&self) -> usize {
        let mut staging = self.lock_staging();
        let before = staging.len();
        staging.extend(self.receiver.try_iter());
        staging.len() - before
    }

    /// Pop the oldest staged item.
    pub fn dequeue_staged(&self) -> Option<T> {
        self.lock_staging().pop_front()
    }

    /// Items waiting in the incoming stage.
    pub fn incoming_len(&self) -> usize {
        self.receiver.len()
    }

    /// Items waiting in the staging stage.
    pub fn staged_len(&self) -> usize {
        self.lock_staging().len()
    }

    /// Refuse further items. Items already queued stay drainable.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn lock_staging(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.staging.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
