use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::runtime::Handle;
use tracing::{debug, trace};

use crate::error::{LaneError, Result};
use crate::queue::WorkQueue;

/// A unit of work executed on the runtime's blocking pool.
pub type WorkItem = Box<dyn FnOnce() + Send + 'static>;

/// Lane that receives inbound packet dispatch.
pub const INBOUND_LANE: usize = 0;

/// Lane reserved for long-lived startup tasks when the scheduler has one.
pub const BOOTSTRAP_LANE: usize = 1;

/// Point-in-time counters for one lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LaneStats {
    pub lane: usize,
    /// Items waiting in the incoming stage.
    pub queued: usize,
    /// Items drained but not yet started.
    pub staged: usize,
    /// Items handed to the blocking pool so far.
    pub executed: u64,
}

struct Lane {
    queue: WorkQueue<WorkItem>,
    executing: AtomicBool,
    executed: AtomicU64,
}

impl Lane {
    fn new() -> Self {
        Self {
            queue: WorkQueue::new(),
            executing: AtomicBool::new(false),
            executed: AtomicU64::new(0),
        }
    }
}

/// A fixed set of work lanes driven by a single tick context.
///
/// With a configured max concurrency of `N` there are `N - 1` lanes; the
/// remaining worker is the context that calls [`tick`](Self::tick).
pub struct LaneScheduler {
    lanes: Vec<Lane>,
    runtime: Handle,
}

impl fmt::Debug for LaneScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaneScheduler")
            .field("lanes", &self.lanes.len())
            .finish()
    }
}

impl LaneScheduler {
    /// Create a scheduler that runs work on `runtime`'s blocking pool.
    pub fn new(max_concurrency: usize, runtime: Handle) -> Result<Self> {
        if max_concurrency < 2 {
            return Err(LaneError::InvalidConcurrency(max_concurrency));
        }
        let lanes = (1..max_concurrency).map(|_| Lane::new()).collect();
        debug!(lanes = max_concurrency - 1, "lane scheduler created");
        Ok(Self { lanes, runtime })
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Queue `work` on the given lane. Safe to call from any thread.
    pub fn request_work<F>(&self, lane: usize, work: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.lane(lane)?.queue.enqueue(Box::new(work))
    }

    /// Advance every lane by one step.
    ///
    /// Each lane drains its incoming work into staging, then starts at most
    /// one staged item. A lane whose executing flag is already held skips
    /// the start for this tick; its staged items wait for the next one.
    /// Returns the number of items started.
    pub fn tick(&self) -> usize {
        let mut started = 0;
        for (index, lane) in self.lanes.iter().enumerate() {
            lane.queue.drain_to_staging();

            if lane
                .executing
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                trace!(lane = index, "lane busy, skipping this tick");
                continue;
            }

            if let Some(work) = lane.queue.dequeue_staged() {
                drop(self.runtime.spawn_blocking(work));
                lane.executed.fetch_add(1, Ordering::Relaxed);
                started += 1;
            }

            lane.executing.store(false, Ordering::Release);
        }
        started
    }

    /// Counters for one lane.
    pub fn stats(&self, lane: usize) -> Result<LaneStats> {
        let l = self.lane(lane)?;
        Ok(LaneStats {
            lane,
            queued: l.queue.incoming_len(),
            staged: l.queue.staged_len(),
            executed: l.executed.load(Ordering::Relaxed),
        })
    }

    /// Counters for every lane, in lane order.
    pub fn all_stats(&self) -> Vec<LaneStats> {
        (0..self.lanes.len())
            .filter_map(|lane| self.stats(lane).ok())
            .collect()
    }

    /// Stop accepting new work on every lane.
    pub fn shutdown(&self) {
        for lane in &self.lanes {
            lane.queue.close();
        }
        debug!("lane scheduler shut down");
    }

    fn lane(&self, lane: usize) -> Result<&Lane> {
        self.lanes.get(lane).ok_or(LaneError::NoSuchLane {
            lane,
            lanes: self.lanes.len(),
        })
    }
}
