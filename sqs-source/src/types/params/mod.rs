pub mod worker_pool;

use crate::cli::provider::aws::AWSConfigCliArgs;
use crate::cli::queue::aws_sqs::AWSSQSCliArgs;
use crate::cli::{CheckCmd, RunCmd};
use crate::error::ConfigError;
pub use worker_pool::WorkerPoolConfig;

/// QueueArgs - Connection parameters of the consumed queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueArgs {
    pub queue_url: String,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
}

impl QueueArgs {
    fn from_cli(aws_args: &AWSConfigCliArgs, sqs_args: &AWSSQSCliArgs) -> Result<Self, ConfigError> {
        if !matches!(sqs_args.queue_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidQueueUrl(sqs_args.queue_url.to_string()));
        }
        Ok(Self {
            queue_url: sqs_args.queue_url.to_string(),
            region: aws_args.aws_region.clone(),
            endpoint_url: aws_args.aws_endpoint_url.as_ref().map(|url| url.to_string()),
        })
    }
}

impl TryFrom<&RunCmd> for QueueArgs {
    type Error = ConfigError;

    fn try_from(run_cmd: &RunCmd) -> Result<Self, Self::Error> {
        Self::from_cli(&run_cmd.aws_config_args, &run_cmd.aws_sqs_args)
    }
}

impl TryFrom<&CheckCmd> for QueueArgs {
    type Error = ConfigError;

    fn try_from(check_cmd: &CheckCmd) -> Result<Self, Self::Error> {
        Self::from_cli(&check_cmd.aws_config_args, &check_cmd.aws_sqs_args)
    }
}
