use crate::core::client::queue::{MockQueueClient, QueueError, ReceiveOptions};
use crate::error::ProcessingError;
use crate::tests::common::{fast_backoff, message, FakeQueue, PanickingProcessor, RecordingProcessor};
use crate::worker::backoff::BackoffConfig;
use crate::worker::metrics::InMemoryMetrics;
use crate::worker::processor::MockMessageProcessor;
use crate::worker::sqs_worker::{PollOutcome, SqsWorker, WorkerHandle, WorkerSettings, WorkerState};
use rstest::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing_test::traced_test;

fn settings(backoff: BackoffConfig) -> WorkerSettings {
    WorkerSettings {
        receive_options: ReceiveOptions { wait_time: Duration::ZERO, ..ReceiveOptions::default() },
        poll_delay: Duration::ZERO,
        backoff,
    }
}

fn worker(
    client: MockQueueClient,
    processor: MockMessageProcessor,
    metrics: Arc<InMemoryMetrics>,
    backoff: BackoffConfig,
) -> SqsWorker {
    SqsWorker::new(0, Arc::new(client), Arc::new(processor), metrics, settings(backoff), CancellationToken::new())
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn empty_polls_back_off_exponentially_up_to_cap(fast_backoff: BackoffConfig) {
    let mut client = MockQueueClient::new();
    client.expect_receive().returning(|_| Ok(vec![]));
    let metrics = Arc::new(InMemoryMetrics::new());
    let mut worker = worker(client, MockMessageProcessor::new(), metrics.clone(), fast_backoff);

    let start = Instant::now();
    let mut delays = Vec::new();
    for _ in 0..6 {
        match worker.poll_once().await {
            PollOutcome::Empty { backoff } => delays.push(backoff.as_secs()),
            other => panic!("expected an empty poll, got {:?}", other),
        }
    }

    assert_eq!(delays, vec![1, 2, 4, 8, 8, 8]);
    assert!(start.elapsed() >= Duration::from_secs(31) && start.elapsed() < Duration::from_secs(32));
    assert_eq!(metrics.snapshot().empty_polls, 6);
    assert_eq!(metrics.snapshot().total_backoff_ms, 31_000);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn receiving_messages_resets_backoff(fast_backoff: BackoffConfig) {
    let calls = AtomicUsize::new(0);
    let mut client = MockQueueClient::new();
    client.expect_receive().returning(move |_| match calls.fetch_add(1, Ordering::SeqCst) {
        2 => Ok(vec![message(1)]),
        _ => Ok(vec![]),
    });
    client.expect_delete().times(1).returning(|_| Ok(()));
    let mut processor = MockMessageProcessor::new();
    processor.expect_process().times(1).returning(|_| Ok(()));
    let mut worker = worker(client, processor, Arc::new(InMemoryMetrics::new()), fast_backoff);

    let mut outcomes = Vec::new();
    for _ in 0..4 {
        outcomes.push(worker.poll_once().await);
    }

    assert_eq!(
        outcomes,
        vec![
            PollOutcome::Empty { backoff: Duration::from_secs(1) },
            PollOutcome::Empty { backoff: Duration::from_secs(2) },
            PollOutcome::Processed(1),
            PollOutcome::Empty { backoff: Duration::from_secs(1) },
        ]
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn receive_failures_back_off_and_polling_continues(fast_backoff: BackoffConfig) {
    let calls = AtomicUsize::new(0);
    let mut client = MockQueueClient::new();
    client.expect_receive().returning(move |_| match calls.fetch_add(1, Ordering::SeqCst) {
        0 | 1 => Err(QueueError::Transport("connection reset".to_string())),
        _ => Ok(vec![message(7)]),
    });
    client.expect_delete().returning(|_| Ok(()));
    let mut processor = MockMessageProcessor::new();
    processor.expect_process().returning(|_| Ok(()));
    let metrics = Arc::new(InMemoryMetrics::new());
    let mut worker = worker(client, processor, metrics.clone(), fast_backoff);

    assert_eq!(worker.poll_once().await, PollOutcome::Failed { backoff: Duration::from_secs(1) });
    assert_eq!(worker.poll_once().await, PollOutcome::Failed { backoff: Duration::from_secs(2) });
    assert_eq!(worker.poll_once().await, PollOutcome::Processed(1));
    assert_eq!(worker.backoff().attempts(), 0);

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.receive_failures, 2);
    assert_eq!(snapshot.messages_deleted, 1);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn failed_message_is_not_deleted_and_batch_continues(fast_backoff: BackoffConfig) {
    let mut client = MockQueueClient::new();
    client.expect_receive().times(1).returning(|_| Ok(vec![message(1), message(2), message(3)]));
    client.expect_delete().times(2).withf(|m| m.message_id != "msg-2").returning(|_| Ok(()));
    let mut processor = MockMessageProcessor::new();
    processor.expect_process().times(3).returning(|m| {
        if m.message_id == "msg-2" {
            Err(ProcessingError::Other("handler rejected object".to_string()))
        } else {
            Ok(())
        }
    });
    let metrics = Arc::new(InMemoryMetrics::new());
    let mut worker = worker(client, processor, metrics.clone(), fast_backoff);

    assert_eq!(worker.poll_once().await, PollOutcome::Processed(3));

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.messages_processed, 2);
    assert_eq!(snapshot.processing_failures, 1);
    assert_eq!(snapshot.messages_deleted, 2);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn delete_failure_is_tolerated(fast_backoff: BackoffConfig) {
    let calls = AtomicUsize::new(0);
    let mut client = MockQueueClient::new();
    client.expect_receive().returning(move |_| match calls.fetch_add(1, Ordering::SeqCst) {
        0 => Ok(vec![message(1)]),
        _ => Ok(vec![]),
    });
    client.expect_delete().times(1).returning(|_| Err(QueueError::Transport("throttled".to_string())));
    let mut processor = MockMessageProcessor::new();
    processor.expect_process().times(1).returning(|_| Ok(()));
    let metrics = Arc::new(InMemoryMetrics::new());
    let mut worker = worker(client, processor, metrics.clone(), fast_backoff);

    assert_eq!(worker.poll_once().await, PollOutcome::Processed(1));
    assert_eq!(worker.poll_once().await, PollOutcome::Empty { backoff: Duration::from_secs(1) });
    assert_eq!(metrics.snapshot().delete_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn stop_interrupts_backoff_sleep() {
    let mut client = MockQueueClient::new();
    client.expect_receive().returning(|_| Ok(vec![]));
    let long_backoff = BackoffConfig::new(Duration::from_secs(60), Duration::from_secs(300), 2.0);
    let worker = worker(client, MockMessageProcessor::new(), Arc::new(InMemoryMetrics::new()), long_backoff);
    let handle = worker.handle();
    assert_eq!(handle.state(), WorkerState::Idle);

    let task = tokio::spawn(worker.run());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.state(), WorkerState::Running);

    let start = Instant::now();
    handle.stop();
    tokio::time::timeout(Duration::from_secs(1), task).await.expect("worker should stop during backoff").unwrap();

    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(handle.state(), WorkerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn stop_mid_batch_drains_remaining_messages() {
    let token = CancellationToken::new();
    let states = Arc::new(Mutex::new(Vec::new()));

    let mut client = MockQueueClient::new();
    client.expect_receive().times(1).returning(|_| Ok(vec![message(1), message(2), message(3)]));
    client.expect_delete().times(3).returning(|_| Ok(()));

    let worker_ref: Arc<Mutex<Option<WorkerHandle>>> = Arc::new(Mutex::new(None));
    let mut processor = MockMessageProcessor::new();
    {
        let token = token.clone();
        let states = states.clone();
        let worker_ref = worker_ref.clone();
        processor.expect_process().times(3).returning(move |_| {
            if let Some(handle) = worker_ref.lock().unwrap().as_ref() {
                states.lock().unwrap().push(handle.state());
            }
            token.cancel();
            Ok(())
        });
    }

    let worker = SqsWorker::new(
        3,
        Arc::new(client),
        Arc::new(processor),
        Arc::new(InMemoryMetrics::new()),
        settings(BackoffConfig::default()),
        token,
    );
    let handle = worker.handle();
    *worker_ref.lock().unwrap() = Some(handle.clone());

    worker.run().await;

    assert_eq!(*states.lock().unwrap(), vec![WorkerState::Running, WorkerState::Draining, WorkerState::Draining]);
    assert_eq!(handle.state(), WorkerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn workers_sharing_a_queue_keep_independent_backoff() {
    let queue = Arc::new(FakeQueue::default());
    let processor = Arc::new(RecordingProcessor::default());
    let metrics = Arc::new(InMemoryMetrics::new());
    let backoff = BackoffConfig::new(Duration::from_secs(1), Duration::from_secs(8), 2.0);

    let mut first =
        SqsWorker::new(0, queue.clone(), processor.clone(), metrics.clone(), settings(backoff), CancellationToken::new());
    let mut second =
        SqsWorker::new(1, queue.clone(), processor.clone(), metrics, settings(backoff), CancellationToken::new());

    first.poll_once().await;
    first.poll_once().await;
    assert_eq!(first.backoff().attempts(), 2);

    queue.push([message(1)]);
    assert_eq!(second.poll_once().await, PollOutcome::Processed(1));
    assert_eq!(second.backoff().attempts(), 0);
    assert_eq!(first.poll_once().await, PollOutcome::Empty { backoff: Duration::from_secs(4) });

    assert_eq!(processor.processed(), vec!["msg-1".to_string()]);
    assert_eq!(queue.deleted(), vec!["msg-1".to_string()]);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn panicking_processor_fails_only_that_message(fast_backoff: BackoffConfig) {
    let mut client = MockQueueClient::new();
    client.expect_receive().times(1).returning(|_| Ok(vec![message(1), message(2)]));
    client.expect_delete().times(1).withf(|message| message.message_id == "msg-2").returning(|_| Ok(()));
    let mut processor = MockMessageProcessor::new();
    processor.expect_process().times(2).returning(|message| {
        if message.message_id == "msg-1" {
            panic!("processor blew up");
        }
        Ok(())
    });
    let metrics = Arc::new(InMemoryMetrics::new());
    let mut worker = worker(client, processor, metrics.clone(), fast_backoff);

    assert_eq!(worker.poll_once().await, PollOutcome::Processed(2));
    assert_eq!(metrics.snapshot().processing_failures, 1);
    assert_eq!(metrics.snapshot().messages_processed, 1);
    assert_eq!(metrics.snapshot().messages_deleted, 1);
}

#[traced_test]
#[tokio::test(start_paused = true)]
async fn worker_keeps_polling_after_processor_panic() {
    let queue = Arc::new(FakeQueue::with_messages(1));
    let processor = Arc::new(PanickingProcessor::new("msg-0"));
    let metrics = Arc::new(InMemoryMetrics::new());
    let token = CancellationToken::new();
    let worker = SqsWorker::new(
        0,
        queue.clone(),
        processor.clone(),
        metrics.clone(),
        settings(BackoffConfig::new(Duration::from_millis(100), Duration::from_secs(1), 2.0)),
        token.clone(),
    );
    let handle = worker.handle();
    let task = tokio::spawn(worker.run());

    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.push((1..=5).map(message));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(handle.state(), WorkerState::Running);
    assert_eq!(queue.pending(), 0);
    assert_eq!(processor.processed(), (1..=5).map(|n| format!("msg-{n}")).collect::<Vec<_>>());
    assert_eq!(queue.deleted(), processor.processed());
    assert_eq!(metrics.snapshot().processing_failures, 1);
    assert!(logs_contain("Message processor panicked"));
    assert!(logs_contain("processor blew up on msg-0"));

    token.cancel();
    task.await.unwrap();
    assert_eq!(handle.state(), WorkerState::Stopped);
}
