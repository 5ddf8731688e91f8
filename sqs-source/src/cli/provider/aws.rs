use clap::Args;
use url::Url;

/// Parameters used to config AWS.
#[derive(Debug, Clone, Args)]
pub struct AWSConfigCliArgs {
    /// The AWS region of the queue. Falls back to the default provider chain when unset.
    #[arg(env = "AWS_REGION", long)]
    pub aws_region: Option<String>,

    /// Override the SQS endpoint, e.g. http://localhost:4566 for localstack.
    #[arg(env = "SQS_SOURCE_AWS_ENDPOINT_URL", long)]
    pub aws_endpoint_url: Option<Url>,
}
