use clap::{Parser, Subcommand};
use provider::aws::AWSConfigCliArgs;
use queue::aws_sqs::AWSSQSCliArgs;
use worker::WorkerPoolCliArgs;

pub mod provider;
pub mod queue;
pub mod worker;

#[derive(Parser, Debug)]
#[command(
    name = "sqs-source",
    about = "Consume S3 event notifications from an SQS queue with a bounded pool of workers",
    after_help = "Examples:\n  \
    sqs-source run --queue-url https://sqs.us-east-1.amazonaws.com/123456789012/events --num-workers 4\n  \
    sqs-source check --queue-url http://localhost:4566/000000000000/events --aws-endpoint-url http://localhost:4566"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the worker pool until SIGINT/SIGTERM
    Run {
        #[command(flatten)]
        run_command: Box<RunCmd>,
    },
    /// Verify that the queue is reachable with the configured credentials
    Check {
        #[command(flatten)]
        check_command: Box<CheckCmd>,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct RunCmd {
    #[clap(flatten, next_help_heading = "AWS")]
    pub aws_config_args: AWSConfigCliArgs,

    #[clap(flatten, next_help_heading = "Queue")]
    pub aws_sqs_args: AWSSQSCliArgs,

    #[clap(flatten, next_help_heading = "Workers")]
    pub worker_args: WorkerPoolCliArgs,
}

#[derive(Parser, Debug, Clone)]
pub struct CheckCmd {
    #[clap(flatten, next_help_heading = "AWS")]
    pub aws_config_args: AWSConfigCliArgs,

    #[clap(flatten, next_help_heading = "Queue")]
    pub aws_sqs_args: AWSSQSCliArgs,
}
