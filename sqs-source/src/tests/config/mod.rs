use crate::cli::{Cli, Commands, RunCmd};
use crate::core::client::queue::ReceiveOptions;
use crate::error::ConfigError;
use crate::types::params::worker_pool::DEFAULT_SHUTDOWN_TIMEOUT;
use crate::types::params::{QueueArgs, WorkerPoolConfig};
use crate::worker::backoff::BackoffConfig;
use clap::Parser as _;
use rstest::*;
use std::time::Duration;

const QUEUE_URL: &str = "https://sqs.us-east-1.amazonaws.com/123456789012/ingest-events";

fn parse_run(extra: &[&str]) -> Result<RunCmd, clap::Error> {
    let mut args = vec!["sqs-source", "run", "--queue-url", QUEUE_URL];
    args.extend_from_slice(extra);
    let cli = Cli::try_parse_from(args)?;
    match cli.command {
        Commands::Run { run_command } => Ok(*run_command),
        Commands::Check { .. } => panic!("expected the run command"),
    }
}

#[test]
fn run_defaults_match_documented_values() {
    let run_cmd = parse_run(&[]).unwrap();
    let config = WorkerPoolConfig::try_from(&run_cmd).unwrap();

    assert_eq!(config.num_workers, 1);
    assert_eq!(config.receive_options, ReceiveOptions::default());
    assert_eq!(config.poll_delay, Duration::ZERO);
    assert_eq!(config.shutdown_timeout, DEFAULT_SHUTDOWN_TIMEOUT);
    assert_eq!(config.backoff, BackoffConfig::default());
}

#[test]
fn run_flags_are_applied() {
    let run_cmd = parse_run(&[
        "--num-workers",
        "8",
        "--max-messages",
        "5",
        "--wait-time-seconds",
        "10",
        "--visibility-timeout-seconds",
        "120",
        "--poll-delay-ms",
        "250",
        "--shutdown-timeout-seconds",
        "45",
        "--backoff-initial-ms",
        "500",
        "--backoff-max-ms",
        "60000",
        "--backoff-multiplier",
        "3.0",
        "--backoff-jitter",
        "0",
    ])
    .unwrap();
    let config = WorkerPoolConfig::try_from(&run_cmd).unwrap();

    assert_eq!(
        config,
        WorkerPoolConfig {
            num_workers: 8,
            receive_options: ReceiveOptions {
                max_messages: 5,
                wait_time: Duration::from_secs(10),
                visibility_timeout: Some(Duration::from_secs(120)),
            },
            poll_delay: Duration::from_millis(250),
            backoff: BackoffConfig::new(Duration::from_millis(500), Duration::from_secs(60), 3.0),
            shutdown_timeout: Duration::from_secs(45),
        }
    );
}

#[rstest]
#[case(&["--max-messages", "11"], ConfigError::MaxMessagesOutOfRange { value: 11, max: 10 })]
#[case(&["--max-messages", "0"], ConfigError::MaxMessagesOutOfRange { value: 0, max: 10 })]
#[case(&["--wait-time-seconds", "21"], ConfigError::WaitTimeOutOfRange { value_secs: 21, max_secs: 20 })]
#[case(
    &["--visibility-timeout-seconds", "43201"],
    ConfigError::VisibilityTimeoutOutOfRange { value_secs: 43_201, max_secs: 43_200 }
)]
#[case(
    &["--visibility-timeout-seconds", "4294967296"],
    ConfigError::VisibilityTimeoutOutOfRange { value_secs: 4_294_967_296, max_secs: 43_200 }
)]
#[case(&["--shutdown-timeout-seconds", "0"], ConfigError::ZeroShutdownTimeout)]
fn out_of_range_values_are_rejected(#[case] extra: &[&str], #[case] expected: ConfigError) {
    let run_cmd = parse_run(extra).unwrap();
    assert_eq!(WorkerPoolConfig::try_from(&run_cmd), Err(expected));
}

#[test]
fn maximum_visibility_timeout_is_accepted() {
    let run_cmd = parse_run(&["--visibility-timeout-seconds", "43200"]).unwrap();
    let config = WorkerPoolConfig::try_from(&run_cmd).unwrap();

    assert_eq!(config.receive_options.visibility_timeout, Some(Duration::from_secs(43_200)));
}

#[rstest]
#[case(&["--backoff-initial-ms", "0"])]
#[case(&["--backoff-initial-ms", "10000", "--backoff-max-ms", "5000"])]
#[case(&["--backoff-multiplier", "0.5"])]
#[case(&["--backoff-jitter", "1.5"])]
fn invalid_backoff_is_rejected(#[case] extra: &[&str]) {
    let run_cmd = parse_run(extra).unwrap();
    assert!(matches!(WorkerPoolConfig::try_from(&run_cmd), Err(ConfigError::InvalidBackoff(_))));
}

#[test]
fn zero_workers_is_a_parse_error() {
    assert!(parse_run(&["--num-workers", "0"]).is_err());
}

#[test]
fn queue_args_carry_endpoint_override() {
    let run_cmd = parse_run(&["--aws-endpoint-url", "http://localhost:4566"]).unwrap();
    let queue_args = QueueArgs::try_from(&run_cmd).unwrap();

    assert_eq!(queue_args.queue_url, QUEUE_URL);
    assert_eq!(queue_args.endpoint_url.as_deref(), Some("http://localhost:4566/"));
}

#[test]
fn non_http_queue_url_is_rejected() {
    let cli = Cli::try_parse_from(["sqs-source", "check", "--queue-url", "ftp://example.com/queue"]).unwrap();
    let Commands::Check { check_command } = cli.command else { panic!("expected the check command") };

    assert_eq!(
        QueueArgs::try_from(check_command.as_ref()),
        Err(ConfigError::InvalidQueueUrl("ftp://example.com/queue".to_string()))
    );
}
