use crate::core::client::queue::QueueClient;
use crate::error::{ConfigError, PoolError};
use crate::types::params::WorkerPoolConfig;
use crate::worker::executor::ExecutionContext;
use crate::worker::metrics::WorkerMetrics;
use crate::worker::processor::MessageProcessor;
use crate::worker::sqs_worker::{SqsWorker, WorkerHandle, WorkerState};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PoolState {
    Created,
    Running,
    Stopped,
}

/// How a call to [`WorkerPool::stop`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every worker stopped on its own within the shutdown timeout.
    Graceful,
    /// The timeout elapsed; `remaining` workers were aborted.
    Forced { remaining: usize },
    /// The pool had already been stopped; nothing was done.
    AlreadyStopped,
}

/// Owns N [`SqsWorker`]s, the execution context they run in, and the queue client
/// they share.
///
/// `start` may be called once. `stop` signals the workers, waits up to the shutdown
/// timeout, aborts stragglers and finally closes the queue client. The client is
/// closed exactly once and never while a worker task can still use it.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    client: Arc<dyn QueueClient>,
    executor: ExecutionContext,
    pending_workers: Vec<SqsWorker>,
    handles: Vec<WorkerHandle>,
    shutdown_token: CancellationToken,
    interrupt_token: CancellationToken,
    state: PoolState,
}

impl WorkerPool {
    /// new - Create a new WorkerPool
    /// Builds `config.num_workers` workers sharing `client`, `processor` and `metrics`.
    /// Every worker gets its own backoff state and a child of the pool's shutdown token.
    /// # Errors
    /// * `ConfigError` - If the configuration is invalid
    pub fn new(
        config: WorkerPoolConfig,
        client: Arc<dyn QueueClient>,
        processor: Arc<dyn MessageProcessor>,
        metrics: Arc<dyn WorkerMetrics>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let shutdown_token = CancellationToken::new();
        let settings = config.worker_settings();
        let pending_workers: Vec<SqsWorker> = (0..config.num_workers)
            .map(|id| {
                SqsWorker::new(
                    id,
                    client.clone(),
                    processor.clone(),
                    metrics.clone(),
                    settings,
                    shutdown_token.child_token(),
                )
            })
            .collect();
        let handles = pending_workers.iter().map(SqsWorker::handle).collect();

        Ok(Self {
            executor: ExecutionContext::new(config.num_workers),
            config,
            client,
            pending_workers,
            handles,
            shutdown_token,
            interrupt_token: CancellationToken::new(),
            state: PoolState::Created,
        })
    }

    /// Use `token` as the external interrupt: cancelling it while `stop` is waiting
    /// aborts the workers at once and makes `stop` fail.
    pub fn with_interrupt(mut self, token: CancellationToken) -> Self {
        self.interrupt_token = token;
        self
    }

    pub fn interrupt_token(&self) -> CancellationToken {
        self.interrupt_token.clone()
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }

    pub fn worker_handles(&self) -> &[WorkerHandle] {
        &self.handles
    }

    pub fn worker_states(&self) -> Vec<WorkerState> {
        self.handles.iter().map(WorkerHandle::state).collect()
    }

    /// Worker tasks submitted and not yet reaped.
    pub fn active_workers(&self) -> usize {
        self.executor.active()
    }

    /// start - Submit every worker to the execution context
    /// # Errors
    /// * `PoolError::AlreadyStarted` - If the pool is already running
    /// * `PoolError::Stopped` - If the pool has been stopped
    pub fn start(&mut self) -> Result<(), PoolError> {
        match self.state {
            PoolState::Running => return Err(PoolError::AlreadyStarted),
            PoolState::Stopped => return Err(PoolError::Stopped),
            PoolState::Created => {}
        }

        info!(num_workers = self.pending_workers.len(), "Starting worker pool");
        for worker in std::mem::take(&mut self.pending_workers) {
            self.executor.submit(worker.run())?;
        }
        self.state = PoolState::Running;
        Ok(())
    }

    /// stop - Stop all workers within the shutdown timeout
    ///
    /// 1. The execution context stops accepting submissions
    /// 2. Every worker's stop flag is raised
    /// 3. Workers get up to `shutdown_timeout` to finish
    /// 4. Stragglers are aborted, with a single warning
    /// 5. The queue client is closed, on every path
    ///
    /// # Errors
    /// * `PoolError::InterruptedShutdown` - If the interrupt token fired while waiting.
    ///   The workers have been aborted and the client closed before this is returned.
    pub async fn stop(&mut self) -> Result<ShutdownOutcome, PoolError> {
        if self.state == PoolState::Stopped {
            return Ok(ShutdownOutcome::AlreadyStopped);
        }
        self.state = PoolState::Stopped;

        info!(
            num_workers = self.handles.len(),
            timeout_secs = self.config.shutdown_timeout.as_secs(),
            "Initiating worker pool shutdown"
        );
        self.executor.shutdown();
        self.handles.iter().for_each(WorkerHandle::stop);
        self.shutdown_token.cancel();
        // Workers never submitted have nothing to wait for.
        self.pending_workers.clear();

        let result = self.await_workers().await;

        self.client.close().await;
        info!("Worker pool shutdown completed");
        result
    }

    async fn await_workers(&mut self) -> Result<ShutdownOutcome, PoolError> {
        let timeout = self.config.shutdown_timeout;
        let executor = &mut self.executor;
        let interrupt = &self.interrupt_token;

        tokio::select! {
            biased;

            _ = interrupt.cancelled() => {
                error!("Interrupted during shutdown, exiting uncleanly");
                let remaining = executor.shutdown_now().await;
                Err(PoolError::InterruptedShutdown { remaining })
            }
            waited = tokio::time::timeout(timeout, executor.await_termination()) => match waited {
                Ok(()) => {
                    info!("All workers stopped");
                    Ok(ShutdownOutcome::Graceful)
                }
                Err(_) => {
                    let running = executor.active();
                    warn!(
                        remaining = running,
                        timeout_secs = timeout.as_secs(),
                        "Failed to terminate workers within shutdown timeout, forcing termination"
                    );
                    let remaining = executor.shutdown_now().await;
                    Ok(ShutdownOutcome::Forced { remaining })
                }
            },
        }
    }
}
