//! Durable named-queue abstraction backing the scheduler and dispatchers:
//! delayed visibility, idempotent enqueue, authoritative repeatable
//! entries, and a worker pool with configurable concurrency.

pub mod error;
pub mod migrations;
pub mod queue;
pub mod testing;
pub mod types;
pub mod worker;

pub use error::{QueueError, Result};
pub use queue::Queue;
pub use types::{
	Backoff, BackoffKind, EnqueueOptions, JobState, QueueEvent, QueueJob, QueueJobId,
	RepeatSchedule, RepeatableSpec, RetentionPolicy,
};
pub use worker::{Processor, Worker, REQUEUED_MARKER};

#[cfg(test)]
mod tests {
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::time::Duration;

	use async_trait::async_trait;
	use chrono::Utc;

	use super::*;
	use crate::testing::create_test_pool;

	#[tokio::test]
	async fn duplicate_job_id_is_silently_rejected() {
		let pool = create_test_pool().await;
		let queue = Queue::new(pool);

		let opts = EnqueueOptions { job_id: Some("run-1".into()), ..Default::default() };
		let first = queue
			.enqueue("job-execution", serde_json::json!({"jobId": "run-1"}), opts.clone())
			.await
			.unwrap();
		assert!(first.is_some());

		let second = queue
			.enqueue("job-execution", serde_json::json!({"jobId": "run-1"}), opts)
			.await
			.unwrap();
		assert!(second.is_none());
	}

	#[tokio::test]
	async fn move_to_delayed_reschedules_without_consuming_attempts() {
		let pool = create_test_pool().await;
		let queue = Queue::new(pool);

		let id = queue
			.enqueue("job-execution", serde_json::json!({}), EnqueueOptions::default())
			.await
			.unwrap()
			.unwrap();

		let until = Utc::now() + chrono::Duration::seconds(5);
		queue.move_to_delayed(id, until).await.unwrap();

		let job = queue.get_job(id).await.unwrap();
		assert_eq!(job.attempts_made, 0);
		assert_eq!(job.state, JobState::Waiting);
	}

	#[tokio::test]
	async fn upsert_repeatable_is_idempotent_on_key() {
		let pool = create_test_pool().await;
		let queue = Queue::new(pool);
		let due = Utc::now() - chrono::Duration::seconds(1);

		let spec = RepeatableSpec { key: "monitor-1".into(), schedule: RepeatSchedule::EveryMs(60_000) };
		queue
			.upsert_repeatable("monitor-scheduler", serde_json::json!({"v": 1}), spec.clone(), due)
			.await
			.unwrap();
		queue
			.upsert_repeatable("monitor-scheduler", serde_json::json!({"v": 2}), spec, due)
			.await
			.unwrap();

		let fired = queue.sweep_repeatables(|_, due| Some(due + chrono::Duration::minutes(1))).await.unwrap();
		assert_eq!(fired, 1, "a single key must only ever produce one due entry");

		let jobs = queue.claim_ready("monitor-scheduler", 10).await.unwrap();
		assert_eq!(jobs.len(), 1);
		assert_eq!(jobs[0].payload, serde_json::json!({"v": 2}));
	}

	#[tokio::test]
	async fn delete_repeatable_missing_key_errors() {
		let pool = create_test_pool().await;
		let queue = Queue::new(pool);
		let err = queue.delete_repeatable("nope").await.unwrap_err();
		assert!(matches!(err, QueueError::RepeatableNotFound(_)));
	}

	#[tokio::test]
	async fn active_count_tracks_claimed_jobs() {
		let pool = create_test_pool().await;
		let queue = Queue::new(pool);

		queue
			.enqueue("job-execution", serde_json::json!({}), EnqueueOptions::default())
			.await
			.unwrap();
		assert_eq!(queue.active_count("job-execution").await.unwrap(), 0);

		let claimed = queue.claim_ready("job-execution", 10).await.unwrap();
		assert_eq!(claimed.len(), 1);
		assert_eq!(queue.active_count("job-execution").await.unwrap(), 1);
	}

	struct CountingProcessor {
		calls: AtomicUsize,
		fail_until: usize,
	}

	#[async_trait]
	impl Processor for CountingProcessor {
		async fn process(&self, _job: &QueueJob) -> std::result::Result<serde_json::Value, String> {
			let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			if n <= self.fail_until {
				Err("transient failure".into())
			} else {
				Ok(serde_json::json!({"ok": true}))
			}
		}
	}

	#[tokio::test]
	async fn worker_retries_then_succeeds() {
		let pool = create_test_pool().await;
		let queue = Queue::new(pool);

		let opts = EnqueueOptions { attempts: 3, backoff: Backoff::fixed(10), ..Default::default() };
		let id = queue
			.enqueue("job-execution", serde_json::json!({}), opts)
			.await
			.unwrap()
			.unwrap();

		let processor = Arc::new(CountingProcessor { calls: AtomicUsize::new(0), fail_until: 1 });
		let worker = Worker::new(queue.clone(), "job-execution", processor, 4)
			.with_poll_interval(Duration::from_millis(20));
		let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
		let handle = worker.spawn(shutdown_rx);

		tokio::time::sleep(Duration::from_millis(300)).await;
		let _ = shutdown_tx.send(());
		handle.await.unwrap();

		let job = queue.get_job(id).await.unwrap();
		assert_eq!(job.state, JobState::Completed);
	}

	#[tokio::test]
	async fn worker_exhausts_retries_and_marks_failed() {
		let pool = create_test_pool().await;
		let queue = Queue::new(pool);

		let opts = EnqueueOptions { attempts: 2, backoff: Backoff::fixed(5), ..Default::default() };
		let id = queue
			.enqueue("job-execution", serde_json::json!({}), opts)
			.await
			.unwrap()
			.unwrap();

		let processor = Arc::new(CountingProcessor { calls: AtomicUsize::new(0), fail_until: 100 });
		let worker = Worker::new(queue.clone(), "job-execution", processor, 1)
			.with_poll_interval(Duration::from_millis(20));
		let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
		let handle = worker.spawn(shutdown_rx);

		tokio::time::sleep(Duration::from_millis(300)).await;
		let _ = shutdown_tx.send(());
		handle.await.unwrap();

		let job = queue.get_job(id).await.unwrap();
		assert_eq!(job.state, JobState::Failed);
	}

	#[test]
	fn exponential_backoff_doubles_each_attempt() {
		let backoff = Backoff::exponential(100);
		assert_eq!(backoff.delay_ms(1), 100);
		assert_eq!(backoff.delay_ms(2), 200);
		assert_eq!(backoff.delay_ms(3), 400);
	}

	#[test]
	fn fixed_backoff_is_constant() {
		let backoff = Backoff::fixed(250);
		assert_eq!(backoff.delay_ms(1), 250);
		assert_eq!(backoff.delay_ms(5), 250);
	}
}
