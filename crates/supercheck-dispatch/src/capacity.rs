//! Global admission control (`spec.md` §4.4): bounds how many
//! job/test executions run concurrently across both execution queues.
//!
//! `queuedCapacity` is an enqueue-boundary concern owned by the
//! out-of-scope API layer; this module only enforces `runningCapacity`.

use chrono::{Duration as ChronoDuration, Utc};
use supercheck_core::{JOB_EXECUTION_QUEUE, TEST_EXECUTION_QUEUE};
use supercheck_queue::{Queue, QueueJobId};
use tracing::warn;

/// Re-delay window applied when a task is bounced for being over capacity.
const REQUEUE_DELAY_SECS: i64 = 5;

pub struct Capacity {
	queue: Queue,
	running_capacity: u32,
}

impl Capacity {
	pub fn new(queue: Queue, running_capacity: u32) -> Self {
		Self { queue, running_capacity }
	}

	/// Combined active count across both execution queues. A count-read
	/// failure fails open (admits the task) rather than starving the
	/// system on a transient db hiccup.
	async fn active_total(&self) -> u32 {
		let job_count = self.queue.active_count(JOB_EXECUTION_QUEUE).await;
		let test_count = self.queue.active_count(TEST_EXECUTION_QUEUE).await;

		match (job_count, test_count) {
			(Ok(a), Ok(b)) => (a + b).max(0) as u32,
			(job_count, test_count) => {
				warn!(?job_count, ?test_count, "active_count read failed, admitting task (fail-open)");
				0
			}
		}
	}

	/// Returns `true` if `job_id` was admitted. Returns `false` (having
	/// already called `move_to_delayed`) if capacity is exhausted — the
	/// caller must then return `REQUEUED_MARKER` from its `Processor` so
	/// the worker does not also call `mark_completed`/`mark_retry`.
	pub async fn admit(&self, job_id: QueueJobId) -> bool {
		if self.active_total().await < self.running_capacity {
			return true;
		}

		let until = Utc::now() + ChronoDuration::seconds(REQUEUE_DELAY_SECS);
		if let Err(e) = self.queue.move_to_delayed(job_id, until).await {
			warn!(%job_id, error = %e, "failed to requeue over-capacity task, admitting instead");
			return true;
		}
		false
	}
}
