//! Periodic queue-residue and orphan-repeatable cleanup (`spec.md` §2.12,
//! §5, §6). Grounded on `loom-server-jobs/src/scheduler.rs`'s
//! periodic-registration loop shape (sleep-then-run on a fixed interval,
//! shut down on broadcast), generalized from a one-shot query per job to a
//! cursor-based walk per `spec.md` §5's "must use incremental scans to
//! bound memory."

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use supercheck_config::JanitorConfig;
use supercheck_db::{DbError, Repo};
use supercheck_queue::Queue;

use crate::error::Result;

/// Page size for the cursor-based walk over `queue_repeatables`.
const SCAN_PAGE_SIZE: i64 = 200;

/// Batch size for the terminal-row prune's internal delete loop.
const PRUNE_BATCH_SIZE: i64 = 500;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JanitorReport {
	pub repeatables_scanned: usize,
	pub repeatables_removed: usize,
	pub terminal_rows_pruned: u64,
}

/// Walks `queue_repeatables` in bounded pages, deletes entries whose
/// owning Job/Monitor no longer exists, and prunes queue rows the
/// scheduler's own `removeOnComplete`/`removeOnFail` policy never caught
/// (e.g. a worker crashed before calling `mark_completed`/`mark_failed`).
pub struct Janitor<R: Repo> {
	repo: Arc<R>,
	queue: Queue,
	config: JanitorConfig,
}

impl<R: Repo> Janitor<R> {
	pub fn new(repo: Arc<R>, queue: Queue, config: JanitorConfig) -> Self {
		Self { repo, queue, config }
	}

	#[tracing::instrument(skip(self))]
	pub async fn sweep(&self) -> Result<JanitorReport> {
		let mut report = JanitorReport::default();
		let mut cursor = String::new();

		loop {
			let keys = self.queue.list_repeatable_keys(&cursor, SCAN_PAGE_SIZE).await?;
			if keys.is_empty() {
				break;
			}
			report.repeatables_scanned += keys.len();

			for key in &keys {
				if self.is_orphaned(key).await {
					if let Err(e) = self.queue.delete_repeatable(key).await {
						warn!(%key, error = %e, "failed removing orphaned repeatable during sweep");
					} else {
						report.repeatables_removed += 1;
					}
				}
			}

			let exhausted = (keys.len() as i64) < SCAN_PAGE_SIZE;
			cursor = keys.into_iter().last().unwrap_or(cursor);
			if exhausted {
				break;
			}
		}

		let cutoff = chrono::Utc::now() - chrono::Duration::days(self.config.job_data_ttl_days);
		report.terminal_rows_pruned = self.queue.prune_orphaned_terminal(cutoff, PRUNE_BATCH_SIZE).await?;

		info!(
			repeatables_scanned = report.repeatables_scanned,
			repeatables_removed = report.repeatables_removed,
			terminal_rows_pruned = report.terminal_rows_pruned,
			"janitor sweep complete"
		);
		Ok(report)
	}

	/// A `job:<uuid>`/`monitor:<uuid>` repeatable is orphaned once its
	/// owning row is gone — the scheduler's own reconcile loop only removes
	/// keys it still knows about from its in-memory `known_keys` set, which
	/// doesn't survive a restart, so this is the backstop for entities
	/// deleted while the scheduler process was down.
	async fn is_orphaned(&self, key: &str) -> bool {
		let Some((kind, id)) = key.split_once(':') else { return false };
		let Ok(id) = id.parse::<uuid::Uuid>() else { return false };

		let exists = match kind {
			"job" => match self.repo.get_job(id).await {
				Ok(_) => true,
				Err(DbError::NotFound(_)) => false,
				Err(e) => {
					warn!(%id, error = %e, "failed checking job existence during sweep, assuming present");
					true
				}
			},
			"monitor" => match self.repo.get_monitor(id).await {
				Ok(_) => true,
				Err(DbError::NotFound(_)) => false,
				Err(e) => {
					warn!(%id, error = %e, "failed checking monitor existence during sweep, assuming present");
					true
				}
			},
			_ => true,
		};
		!exists
	}

	/// Runs `sweep` on a fixed interval until `shutdown` fires.
	pub fn spawn(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
		let interval = Duration::from_secs(self.config.interval_hours * 3600);
		tokio::spawn(async move {
			loop {
				tokio::select! {
					_ = tokio::time::sleep(interval) => {
						if let Err(e) = self.sweep().await {
							warn!(error = %e, "janitor sweep failed");
						}
					}
					_ = shutdown.recv() => {
						info!("janitor shutting down");
						break;
					}
				}
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use chrono::Utc;
	use uuid::Uuid;

	use supercheck_db::SqliteRepo;
	use supercheck_queue::{EnqueueOptions, RepeatSchedule, RepeatableSpec};

	use super::*;

	async fn seed_job(pool: &sqlx::SqlitePool) -> Uuid {
		let id = Uuid::new_v4();
		let now = Utc::now();
		sqlx::query(
			"INSERT INTO jobs (id, name, cron_schedule, status, last_run_at, next_run_at, alert_config_json, retry_limit, created_at, updated_at)
             VALUES (?, 'nightly-smoke', '*/5 * * * *', 'pending', NULL, NULL, NULL, 0, ?, ?)",
		)
		.bind(id.to_string())
		.bind(now)
		.bind(now)
		.execute(pool)
		.await
		.unwrap();
		id
	}

	fn test_config() -> JanitorConfig {
		JanitorConfig { interval_hours: 12, job_data_ttl_days: 7, event_stream_ttl_hours: 24, metrics_ttl_hours: 48 }
	}

	#[tokio::test]
	async fn sweep_removes_repeatable_for_deleted_job() {
		let db_pool = supercheck_db::testing::create_test_pool().await;
		let queue_pool = supercheck_queue::testing::create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool.clone()));
		let queue = Queue::new(queue_pool);

		let job_id = seed_job(&db_pool).await;
		queue
			.upsert_repeatable(
				"job-scheduler",
				serde_json::json!({"jobId": job_id}),
				RepeatableSpec { key: format!("job:{job_id}"), schedule: RepeatSchedule::Cron("*/5 * * * *".into()) },
				Utc::now() + chrono::Duration::minutes(5),
			)
			.await
			.unwrap();

		sqlx::query("DELETE FROM jobs WHERE id = ?").bind(job_id.to_string()).execute(&db_pool).await.unwrap();

		let janitor = Janitor::new(repo, queue.clone(), test_config());
		let report = janitor.sweep().await.unwrap();

		assert_eq!(report.repeatables_removed, 1);
		let err = queue.delete_repeatable(&format!("job:{job_id}")).await;
		assert!(err.is_err(), "repeatable should already be gone");
	}

	#[tokio::test]
	async fn sweep_keeps_repeatable_for_live_job() {
		let db_pool = supercheck_db::testing::create_test_pool().await;
		let queue_pool = supercheck_queue::testing::create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool.clone()));
		let queue = Queue::new(queue_pool);

		let job_id = seed_job(&db_pool).await;
		let key = format!("job:{job_id}");
		queue
			.upsert_repeatable(
				"job-scheduler",
				serde_json::json!({"jobId": job_id}),
				RepeatableSpec { key: key.clone(), schedule: RepeatSchedule::Cron("*/5 * * * *".into()) },
				Utc::now() + chrono::Duration::minutes(5),
			)
			.await
			.unwrap();

		let janitor = Janitor::new(repo, queue.clone(), test_config());
		let report = janitor.sweep().await.unwrap();

		assert_eq!(report.repeatables_removed, 0);
		queue.delete_repeatable(&key).await.unwrap();
	}

	#[tokio::test]
	async fn sweep_prunes_stale_terminal_rows() {
		let db_pool = supercheck_db::testing::create_test_pool().await;
		let queue_pool = supercheck_queue::testing::create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool));
		let queue = Queue::new(queue_pool.clone());

		let id = queue
			.enqueue("job-execution", serde_json::json!({}), EnqueueOptions::default())
			.await
			.unwrap()
			.unwrap();

		// Simulate a worker that claimed and finished a job but crashed
		// before its `removeOnComplete` retention ran.
		let stale = Utc::now() - chrono::Duration::days(10);
		sqlx::query("UPDATE queue_jobs SET state = 'completed', updated_at = ? WHERE id = ?")
			.bind(stale)
			.bind(id.0.to_string())
			.execute(&queue_pool)
			.await
			.unwrap();

		let janitor = Janitor::new(repo, queue.clone(), test_config());
		let report = janitor.sweep().await.unwrap();

		assert_eq!(report.terminal_rows_pruned, 1);
		assert!(queue.get_job(id).await.is_err());
	}
}
