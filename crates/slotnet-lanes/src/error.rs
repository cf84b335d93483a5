/// Errors raised by work queues and the lane scheduler.
#[derive(Debug, thiserror::Error)]
pub enum LaneError {
    /// At least two workers are required: one tick context plus one lane.
    #[error("max concurrency must be at least 2 (got {0})")]
    InvalidConcurrency(usize),

    /// The addressed lane does not exist.
    #[error("no such lane: {lane} (scheduler has {lanes})")]
    NoSuchLane { lane: usize, lanes: usize },

    /// The queue has been shut down and accepts no more work.
    #[error("work queue closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, LaneError>;
