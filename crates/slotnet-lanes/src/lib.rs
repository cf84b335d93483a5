//! Work lanes for slotnet.
//!
//! Network tasks hand work to a [`LaneScheduler`] through
//! [`request_work`](LaneScheduler::request_work); a single tick context moves
//! it along with [`tick`](LaneScheduler::tick), which starts at most one
//! staged item per lane on the runtime's blocking pool.

pub mod error;
pub mod queue;
pub mod scheduler;

pub use error::{LaneError, Result};
pub use queue::WorkQueue;
pub use scheduler::{LaneScheduler, LaneStats, WorkItem, BOOTSTRAP_LANE, INBOUND_LANE};
