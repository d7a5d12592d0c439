//! A worker polls one named queue and runs a `Processor` against each job
//! it claims, with up to `concurrency` jobs in flight at once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::Result as QueueResult;
use crate::queue::Queue;
use crate::types::QueueJob;

/// Reserved result key a processor sets to tell the worker it already
/// rescheduled the job itself (e.g. admission-control delay via
/// `Queue::move_to_delayed`) and that `mark_completed`/`mark_retry`/
/// `mark_failed` must not run — that requeue must not consume an attempt.
pub const REQUEUED_MARKER: &str = "__requeued";

fn is_requeued(result: &serde_json::Value) -> bool {
	result.get(REQUEUED_MARKER).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Processes one queued job. Processor errors are surfaced to the worker
/// so queue retry/backoff applies; they must not be swallowed.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
	async fn process(&self, job: &QueueJob) -> std::result::Result<serde_json::Value, String>;
}

pub struct Worker {
	queue: Queue,
	queue_name: String,
	processor: Arc<dyn Processor>,
	concurrency: usize,
	poll_interval: Duration,
}

impl Worker {
	pub fn new(
		queue: Queue,
		queue_name: impl Into<String>,
		processor: Arc<dyn Processor>,
		concurrency: usize,
	) -> Self {
		Self {
			queue,
			queue_name: queue_name.into(),
			processor,
			concurrency: concurrency.max(1),
			poll_interval: Duration::from_millis(500),
		}
	}

	pub fn with_poll_interval(mut self, interval: Duration) -> Self {
		self.poll_interval = interval;
		self
	}

	/// Runs the poll loop until `shutdown` fires, awaiting in-flight jobs
	/// before returning.
	pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
		tokio::spawn(async move {
			let semaphore = Arc::new(Semaphore::new(self.concurrency));
			let mut in_flight: Vec<JoinHandle<()>> = Vec::new();

			loop {
				tokio::select! {
					_ = tokio::time::sleep(self.poll_interval) => {
						if let Err(e) = self.poll_once(&semaphore, &mut in_flight).await {
							warn!(queue = %self.queue_name, error = %e, "poll failed");
						}
					}
					_ = shutdown.recv() => {
						info!(queue = %self.queue_name, "worker shutting down");
						break;
					}
				}
			}

			for handle in in_flight.drain(..) {
				let _ = handle.await;
			}
		})
	}

	async fn poll_once(
		&self,
		semaphore: &Arc<Semaphore>,
		in_flight: &mut Vec<JoinHandle<()>>,
	) -> QueueResult<()> {
		in_flight.retain(|h| !h.is_finished());

		let available = semaphore.available_permits();
		if available == 0 {
			return Ok(());
		}

		let jobs = self.queue.claim_ready(&self.queue_name, available as i64).await?;
		for job in jobs {
			let permit = semaphore.clone().acquire_owned().await.expect("semaphore closed");
			let queue = self.queue.clone();
			let processor = Arc::clone(&self.processor);

			let handle = tokio::spawn(async move {
				let _permit = permit;
				run_with_retry(&queue, &processor, job).await;
			});
			in_flight.push(handle);
		}
		Ok(())
	}
}

async fn run_with_retry(queue: &Queue, processor: &Arc<dyn Processor>, job: QueueJob) {
	match processor.process(&job).await {
		Ok(result) => {
			if is_requeued(&result) {
				return;
			}
			if let Err(e) = queue.mark_completed(&job, result).await {
				warn!(job_id = %job.id, error = %e, "failed recording job completion");
			}
		}
		Err(reason) => {
			let next_attempt = job.attempts_made + 1;
			if next_attempt < job.max_attempts {
				warn!(job_id = %job.id, attempt = next_attempt, %reason, "job failed, retrying");
				if let Err(e) = queue.mark_retry(&job, &reason, next_attempt).await {
					warn!(job_id = %job.id, error = %e, "failed recording job retry");
				}
			} else {
				warn!(job_id = %job.id, %reason, "job failed, exhausted retries");
				if let Err(e) = queue.mark_failed(&job, &reason).await {
					warn!(job_id = %job.id, error = %e, "failed recording job failure");
				}
			}
		}
	}
}
