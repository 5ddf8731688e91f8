use clap::Args;

fn parse_positive_usize(s: &str) -> Result<usize, String> {
    let value: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if value == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(value)
}

#[derive(Debug, Clone, Args)]
pub struct WorkerPoolCliArgs {
    /// Number of concurrent polling workers.
    #[arg(env = "SQS_SOURCE_NUM_WORKERS", long, default_value = "1", value_parser = parse_positive_usize)]
    pub num_workers: usize,

    /// Seconds to wait for workers to stop before they are aborted.
    #[arg(env = "SQS_SOURCE_SHUTDOWN_TIMEOUT_SECONDS", long, default_value = "30")]
    pub shutdown_timeout_seconds: u64,

    /// First backoff delay after an empty or failed poll, in milliseconds.
    #[arg(env = "SQS_SOURCE_BACKOFF_INITIAL_MS", long, default_value = "20000")]
    pub backoff_initial_ms: u64,

    /// Upper bound of the backoff delay, in milliseconds.
    #[arg(env = "SQS_SOURCE_BACKOFF_MAX_MS", long, default_value = "300000")]
    pub backoff_max_ms: u64,

    /// Growth factor of the backoff delay per consecutive empty or failed poll.
    #[arg(env = "SQS_SOURCE_BACKOFF_MULTIPLIER", long, default_value = "2.0")]
    pub backoff_multiplier: f64,

    /// Random spread applied to each backoff delay, as a fraction in [0, 1).
    #[arg(env = "SQS_SOURCE_BACKOFF_JITTER", long, default_value = "0.2")]
    pub backoff_jitter: f64,
}
