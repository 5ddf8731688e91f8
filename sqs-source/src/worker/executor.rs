use crate::error::PoolError;
use std::future::Future;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error};

/// Bounded set of spawned tasks owned by a worker pool.
///
/// Holds at most `capacity` tasks. Once [`shutdown`](Self::shutdown) is called no
/// further submissions are accepted; tasks already running are left alone until they
/// finish or [`shutdown_now`](Self::shutdown_now) aborts them.
#[derive(Debug)]
pub struct ExecutionContext {
    capacity: usize,
    tasks: JoinSet<()>,
    accepting: bool,
}

impl ExecutionContext {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, tasks: JoinSet::new(), accepting: true }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks submitted and not yet reaped.
    pub fn active(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_shutdown(&self) -> bool {
        !self.accepting
    }

    pub fn submit<F>(&mut self, task: F) -> Result<(), PoolError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.accepting {
            return Err(PoolError::SubmissionRejected("execution context is shut down".to_string()));
        }
        if self.tasks.len() >= self.capacity {
            return Err(PoolError::SubmissionRejected(format!("capacity of {} tasks reached", self.capacity)));
        }
        self.tasks.spawn(task);
        Ok(())
    }

    /// Stop accepting new submissions.
    pub fn shutdown(&mut self) {
        self.accepting = false;
    }

    /// Wait until every task has finished. Cancel safe: dropping this future leaves
    /// unfinished tasks in the set.
    pub async fn await_termination(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            Self::handle_task_result(result);
        }
    }

    /// Abort all remaining tasks and reap them. Returns how many were still running.
    pub async fn shutdown_now(&mut self) -> usize {
        self.accepting = false;
        let remaining = self.tasks.len();
        self.tasks.abort_all();
        while let Some(result) = self.tasks.join_next().await {
            Self::handle_task_result(result);
        }
        remaining
    }

    fn handle_task_result(result: Result<(), JoinError>) {
        match result {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => debug!("Task aborted"),
            Err(e) => error!("Task panicked: {:?}", e),
        }
    }
}
