use clap::Parser as _;
use dotenvy::dotenv;
use sqs_source::cli::{CheckCmd, Cli, Commands, RunCmd};
use sqs_source::core::client::{QueueClient, SqsQueueClient};
use sqs_source::types::params::{QueueArgs, WorkerPoolConfig};
use sqs_source::utils::logging::init_logging;
use sqs_source::utils::signal_handler::SignalHandler;
use sqs_source::worker::metrics::TracingMetrics;
use sqs_source::worker::notification::{LoggingObjectHandler, S3EventProcessor};
use sqs_source::worker::{ShutdownOutcome, WorkerPool};
use sqs_source::SourceResult;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    dotenv().ok();
    if let Err(e) = init_logging() {
        panic!("Failed to initialize logging: {:#}", e);
    }
    let cli = Cli::parse();

    match &cli.command {
        Commands::Run { run_command } => {
            info!("Executing run command with args: {:?}", run_command);
            if let Err(e) = run_source(run_command).await {
                error!(error = %e, error_chain = ?e, "sqs-source exited with an error");
                std::process::exit(1);
            }
        }
        Commands::Check { check_command } => {
            info!("Executing check command with args: {:?}", check_command);
            match check_queue(check_command).await {
                Ok(()) => info!("Queue is reachable"),
                Err(e) => {
                    error!(error = %e, error_chain = ?e, "Queue check failed");
                    std::process::exit(1);
                }
            }
        }
    }
}

async fn run_source(run_cmd: &RunCmd) -> SourceResult<()> {
    let queue_args = QueueArgs::try_from(run_cmd)?;
    let pool_config = WorkerPoolConfig::try_from(run_cmd)?;
    debug!(?pool_config, "Configuration initialized");

    let client = Arc::new(SqsQueueClient::from_args(&queue_args).await);
    client.health_check().await?;
    info!(queue_url = %queue_args.queue_url, "Connected to queue");

    let processor = Arc::new(S3EventProcessor::new(Arc::new(LoggingObjectHandler)));
    let interrupt = CancellationToken::new();
    let mut pool = WorkerPool::new(pool_config, client, processor, Arc::new(TracingMetrics))?
        .with_interrupt(interrupt.clone());

    let mut signal_handler = SignalHandler::new();
    pool.start()?;

    if let Err(e) = signal_handler.wait_for_shutdown().await {
        error!(error = %e, "Failed to listen for shutdown signals, stopping");
    }
    let interrupt_watcher = signal_handler.interrupt_on_next_signal(interrupt);

    let stopped = pool.stop().await;
    interrupt_watcher.abort();

    match stopped {
        Ok(ShutdownOutcome::Graceful) | Ok(ShutdownOutcome::AlreadyStopped) => {
            info!("sqs-source shut down cleanly");
            Ok(())
        }
        Ok(ShutdownOutcome::Forced { remaining }) => {
            warn!(remaining, "sqs-source shut down after aborting workers");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

async fn check_queue(check_cmd: &CheckCmd) -> SourceResult<()> {
    let queue_args = QueueArgs::try_from(check_cmd)?;
    let client = SqsQueueClient::from_args(&queue_args).await;
    let checked = client.health_check().await;
    client.close().await;
    Ok(checked?)
}
