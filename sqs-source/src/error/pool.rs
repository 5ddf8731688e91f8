use thiserror::Error;

/// Lifecycle errors of the [`WorkerPool`](crate::worker::pool::WorkerPool).
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PoolError {
    /// `start()` may be called once per pool.
    #[error("Worker pool has already been started")]
    AlreadyStarted,

    #[error("Worker pool has been stopped")]
    Stopped,

    /// The execution context no longer accepts work, or is at capacity.
    #[error("Task submission rejected: {0}")]
    SubmissionRejected(String),

    /// An external interrupt arrived while waiting for workers to finish.
    /// Remaining workers were aborted and the queue client closed before this was returned.
    #[error("Shutdown interrupted with {remaining} worker(s) still running")]
    InterruptedShutdown { remaining: usize },
}
