//! Reconciles the `jobs` table into `job-scheduler` repeatable entries, and
//! processes their firings into `Run`s enqueued onto `job-execution`.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use supercheck_core::{TestScript, Trigger, JOB_EXECUTION_QUEUE, JOB_SCHEDULER_QUEUE};
use supercheck_cron::CronPlanner;
use supercheck_db::Repo;
use supercheck_queue::{Backoff, EnqueueOptions, Processor, Queue, QueueJob, RepeatSchedule, RepeatableSpec};

use crate::error::Result;

const EXECUTION_BACKOFF_BASE_MS: i64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSchedulePayload {
	pub job_id: Uuid,
	pub test_cases: Vec<TestScript>,
	pub retry_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecutionPayload {
	pub job_id: Uuid,
	pub run_id: Uuid,
	pub test_cases: Vec<TestScript>,
	pub retry_limit: u32,
}

fn repeatable_key(job_id: Uuid) -> String {
	format!("job:{job_id}")
}

/// Keeps `job-scheduler` repeatable entries in sync with `jobs.cron_schedule`.
///
/// Jobs that lose their schedule between reconcile passes aren't reported by
/// `Repo::list_schedulable_jobs` any more, so removal is tracked against the
/// previous pass's key set rather than a server-side diff.
pub struct JobScheduler<R: Repo> {
	repo: Arc<R>,
	queue: Queue,
	cron: CronPlanner,
	known_keys: Mutex<HashSet<String>>,
}

impl<R: Repo> JobScheduler<R> {
	pub fn new(repo: Arc<R>, queue: Queue) -> Self {
		Self { repo, queue, cron: CronPlanner::new(), known_keys: Mutex::new(HashSet::new()) }
	}

	#[tracing::instrument(skip(self))]
	pub async fn reconcile(&self) -> Result<()> {
		let jobs = self.repo.list_schedulable_jobs().await?;
		let mut current_keys = HashSet::with_capacity(jobs.len());

		for job in &jobs {
			let Some(expr) = job.cron_schedule.as_deref() else { continue };
			if let Err(e) = self.cron.validate(expr) {
				warn!(job_id = %job.id, error = %e, "skipping job with invalid cron schedule");
				continue;
			}

			let key = repeatable_key(job.id.as_uuid());
			let test_cases = self.repo.list_test_scripts(job.id.as_uuid()).await?;
			let payload = JobSchedulePayload {
				job_id: job.id.as_uuid(),
				test_cases,
				retry_limit: job.retry_limit,
			};
			let next_fire = self.cron.next_fire_after(expr, Utc::now())?;

			self.queue
				.upsert_repeatable(
					JOB_SCHEDULER_QUEUE,
					serde_json::to_value(&payload)?,
					RepeatableSpec { key: key.clone(), schedule: RepeatSchedule::Cron(expr.to_string()) },
					next_fire,
				)
				.await?;
			current_keys.insert(key);
		}

		let mut known = self.known_keys.lock().await;
		for stale_key in known.difference(&current_keys).cloned().collect::<Vec<_>>() {
			if let Err(e) = self.queue.delete_repeatable(&stale_key).await {
				warn!(key = %stale_key, error = %e, "failed removing stale job repeatable");
			}
		}
		info!(scheduled = current_keys.len(), "job scheduler reconciled");
		*known = current_keys;
		Ok(())
	}
}

/// Processes a `job-scheduler` firing: skips a job already mid-run, creates
/// its `Run`, and enqueues the execution task.
pub struct JobSchedulerProcessor<R: Repo + 'static> {
	repo: Arc<R>,
	queue: Queue,
}

impl<R: Repo + 'static> JobSchedulerProcessor<R> {
	pub fn new(repo: Arc<R>, queue: Queue) -> Self {
		Self { repo, queue }
	}
}

#[async_trait]
impl<R: Repo + 'static> Processor for JobSchedulerProcessor<R> {
	async fn process(&self, job: &QueueJob) -> std::result::Result<serde_json::Value, String> {
		let payload: JobSchedulePayload =
			serde_json::from_value(job.payload.clone()).map_err(|e| e.to_string())?;

		let run = match self.repo.create_run(payload.job_id, Trigger::Schedule).await {
			Ok(run) => run,
			Err(supercheck_db::DbError::Conflict(_)) => {
				info!(job_id = %payload.job_id, "job already running, skipping this firing");
				return Ok(serde_json::json!({"skipped": "already_running"}));
			}
			Err(e) => return Err(e.to_string()),
		};

		let execution = JobExecutionPayload {
			job_id: payload.job_id,
			run_id: run.id.as_uuid(),
			test_cases: payload.test_cases,
			retry_limit: payload.retry_limit,
		};

		let opts = EnqueueOptions {
			job_id: Some(run.id.as_uuid().to_string()),
			attempts: payload.retry_limit.max(1),
			backoff: Backoff::exponential(EXECUTION_BACKOFF_BASE_MS),
			..Default::default()
		};

		self.queue
			.enqueue(JOB_EXECUTION_QUEUE, serde_json::to_value(&execution).map_err(|e| e.to_string())?, opts)
			.await
			.map_err(|e| e.to_string())?;

		Ok(serde_json::json!({"runId": run.id.as_uuid()}))
	}
}
