use crate::cli::RunCmd;
use crate::core::client::queue::{ReceiveOptions, MAX_RECEIVE_MESSAGES, MAX_VISIBILITY_TIMEOUT, MAX_WAIT_TIME};
use crate::error::ConfigError;
use crate::worker::backoff::BackoffConfig;
use crate::worker::sqs_worker::WorkerSettings;
use std::time::Duration;

/// How long `stop()` waits for workers before aborting them.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable configuration of a worker pool, validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerPoolConfig {
    pub num_workers: usize,
    pub receive_options: ReceiveOptions,
    pub poll_delay: Duration,
    pub backoff: BackoffConfig,
    pub shutdown_timeout: Duration,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 1,
            receive_options: ReceiveOptions::default(),
            poll_delay: Duration::ZERO,
            backoff: BackoffConfig::default(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl WorkerPoolConfig {
    pub fn new(num_workers: usize) -> Self {
        Self { num_workers, ..Self::default() }
    }

    pub fn with_receive_options(mut self, receive_options: ReceiveOptions) -> Self {
        self.receive_options = receive_options;
        self
    }

    pub fn with_poll_delay(mut self, poll_delay: Duration) -> Self {
        self.poll_delay = poll_delay;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_shutdown_timeout(mut self, shutdown_timeout: Duration) -> Self {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        let max_messages = self.receive_options.max_messages;
        if !(1..=MAX_RECEIVE_MESSAGES).contains(&max_messages) {
            return Err(ConfigError::MaxMessagesOutOfRange { value: max_messages, max: MAX_RECEIVE_MESSAGES });
        }
        if self.receive_options.wait_time > MAX_WAIT_TIME {
            return Err(ConfigError::WaitTimeOutOfRange {
                value_secs: self.receive_options.wait_time.as_secs(),
                max_secs: MAX_WAIT_TIME.as_secs(),
            });
        }
        let visibility_timeout = self.receive_options.visibility_timeout;
        if let Some(timeout) = visibility_timeout.filter(|timeout| *timeout > MAX_VISIBILITY_TIMEOUT) {
            return Err(ConfigError::VisibilityTimeoutOutOfRange {
                value_secs: timeout.as_secs(),
                max_secs: MAX_VISIBILITY_TIMEOUT.as_secs(),
            });
        }
        if self.shutdown_timeout.is_zero() {
            return Err(ConfigError::ZeroShutdownTimeout);
        }
        self.backoff.validate()
    }

    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings { receive_options: self.receive_options, poll_delay: self.poll_delay, backoff: self.backoff }
    }
}

impl TryFrom<&RunCmd> for WorkerPoolConfig {
    type Error = ConfigError;

    fn try_from(run_cmd: &RunCmd) -> Result<Self, Self::Error> {
        let sqs = &run_cmd.aws_sqs_args;
        let workers = &run_cmd.worker_args;

        let config = WorkerPoolConfig {
            num_workers: workers.num_workers,
            receive_options: ReceiveOptions {
                max_messages: sqs.max_messages,
                wait_time: Duration::from_secs(sqs.wait_time_seconds),
                visibility_timeout: sqs.visibility_timeout_seconds.map(Duration::from_secs),
            },
            poll_delay: Duration::from_millis(sqs.poll_delay_ms),
            backoff: BackoffConfig::new(
                Duration::from_millis(workers.backoff_initial_ms),
                Duration::from_millis(workers.backoff_max_ms),
                workers.backoff_multiplier,
            )
            .with_jitter(workers.backoff_jitter),
            shutdown_timeout: Duration::from_secs(workers.shutdown_timeout_seconds),
        };
        config.validate()?;
        Ok(config)
    }
}
