//! Persistent named-queue: `enqueue`, `upsertRepeatable`, `deleteRepeatable`,
//! `getJob`, `moveToDelayed`, and the plumbing workers poll against.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::{Row, SqlitePool};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::{QueueError, Result};
use crate::types::{
	Backoff, BackoffKind, EnqueueOptions, JobState, QueueEvent, QueueJob, QueueJobId,
	RepeatSchedule, RepeatableSpec, RetentionPolicy,
};

const EVENT_CHANNEL_CAPACITY: usize = 1_024;

/// A durable, SQLite-backed queue. Cheap to clone — state lives in the pool
/// and a shared broadcast sender.
#[derive(Clone)]
pub struct Queue {
	pool: SqlitePool,
	events: broadcast::Sender<QueueEvent>,
}

impl Queue {
	pub fn new(pool: SqlitePool) -> Self {
		let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
		Self { pool, events }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
		self.events.subscribe()
	}

	#[tracing::instrument(skip(self, payload, opts))]
	pub async fn enqueue(
		&self,
		queue_name: &str,
		payload: serde_json::Value,
		opts: EnqueueOptions,
	) -> Result<Option<QueueJobId>> {
		let id = QueueJobId::new();
		let now = Utc::now();
		let run_at = now + ChronoDuration::milliseconds(opts.delay_ms.max(0));
		let backoff_kind = match opts.backoff.kind {
			BackoffKind::Fixed => "fixed",
			BackoffKind::Exponential => "exponential",
		};

		let result = sqlx::query(
			"INSERT INTO queue_jobs (
                id, queue_name, job_key, payload_json, state, attempts_made, max_attempts,
                backoff_kind, backoff_base_ms, run_at,
                remove_on_complete_count, remove_on_complete_age_sec,
                remove_on_fail_count, remove_on_fail_age_sec,
                result_json, failed_reason, created_at, updated_at
            ) VALUES (?, ?, ?, ?, 'waiting', 0, ?, ?, ?, ?, ?, ?, ?, ?, NULL, NULL, ?, ?)
            ON CONFLICT (queue_name, job_key) WHERE job_key IS NOT NULL AND state IN ('waiting', 'active') DO NOTHING",
		)
		.bind(id.0.to_string())
		.bind(queue_name)
		.bind(&opts.job_id)
		.bind(serde_json::to_string(&payload)?)
		.bind(opts.attempts as i64)
		.bind(backoff_kind)
		.bind(opts.backoff.base_delay_ms)
		.bind(run_at)
		.bind(opts.remove_on_complete.count as i64)
		.bind(opts.remove_on_complete.age_seconds)
		.bind(opts.remove_on_fail.count as i64)
		.bind(opts.remove_on_fail.age_seconds)
		.bind(now)
		.bind(now)
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			tracing::debug!(queue = queue_name, job_id = ?opts.job_id, "duplicate enqueue rejected");
			return Ok(None);
		}

		let _ = self.events.send(QueueEvent::Waiting { queue: queue_name.to_string(), job_id: id });
		Ok(Some(id))
	}

	/// A single authoritative repeatable entry per `key`, idempotent.
	#[tracing::instrument(skip(self, payload))]
	pub async fn upsert_repeatable(
		&self,
		queue_name: &str,
		payload: serde_json::Value,
		spec: RepeatableSpec,
		next_run_at: DateTime<Utc>,
	) -> Result<()> {
		let now = Utc::now();
		let (cron, every_ms) = match &spec.schedule {
			RepeatSchedule::Cron(expr) => (Some(expr.as_str()), None),
			RepeatSchedule::EveryMs(ms) => (None, Some(*ms)),
		};

		sqlx::query(
			"INSERT INTO queue_repeatables (key, queue_name, payload_json, cron, every_ms, next_run_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET
                queue_name = excluded.queue_name,
                payload_json = excluded.payload_json,
                cron = excluded.cron,
                every_ms = excluded.every_ms,
                next_run_at = excluded.next_run_at,
                updated_at = excluded.updated_at",
		)
		.bind(&spec.key)
		.bind(queue_name)
		.bind(serde_json::to_string(&payload)?)
		.bind(cron)
		.bind(every_ms)
		.bind(next_run_at)
		.bind(now)
		.bind(now)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_repeatable(&self, key: &str) -> Result<()> {
		let result = sqlx::query("DELETE FROM queue_repeatables WHERE key = ?")
			.bind(key)
			.execute(&self.pool)
			.await?;

		if result.rows_affected() == 0 {
			return Err(QueueError::RepeatableNotFound(key.to_string()));
		}
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_job(&self, id: QueueJobId) -> Result<QueueJob> {
		let row = sqlx::query("SELECT * FROM queue_jobs WHERE id = ?")
			.bind(id.0.to_string())
			.fetch_optional(&self.pool)
			.await?
			.ok_or(QueueError::NotFound(id.0))?;

		row_to_job(&row)
	}

	/// Reschedules a job to fire no earlier than `until`, leaving its
	/// attempt count untouched (used by admission-control delay, which is
	/// not a retry).
	#[tracing::instrument(skip(self))]
	pub async fn move_to_delayed(&self, id: QueueJobId, until: DateTime<Utc>) -> Result<()> {
		let result = sqlx::query(
			"UPDATE queue_jobs SET state = 'waiting', run_at = ?, updated_at = ? WHERE id = ?",
		)
		.bind(until)
		.bind(Utc::now())
		.bind(id.0.to_string())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(QueueError::NotFound(id.0));
		}
		Ok(())
	}

	/// Count of jobs currently `active` in the named queue — what
	/// admission control reads to enforce `runningCapacity`.
	#[tracing::instrument(skip(self))]
	pub async fn active_count(&self, queue_name: &str) -> Result<i64> {
		let row = sqlx::query("SELECT COUNT(*) as n FROM queue_jobs WHERE queue_name = ? AND state = 'active'")
			.bind(queue_name)
			.fetch_one(&self.pool)
			.await?;
		Ok(row.try_get::<i64, _>("n")?)
	}

	/// Claims up to `limit` due jobs from `queue_name`, transitioning them
	/// to `active`. Used by `Worker::run`.
	#[tracing::instrument(skip(self))]
	pub(crate) async fn claim_ready(&self, queue_name: &str, limit: i64) -> Result<Vec<QueueJob>> {
		let now = Utc::now();
		let rows = sqlx::query(
			"SELECT * FROM queue_jobs
             WHERE queue_name = ? AND state = 'waiting' AND run_at <= ?
             ORDER BY run_at ASC LIMIT ?",
		)
		.bind(queue_name)
		.bind(now)
		.bind(limit)
		.fetch_all(&self.pool)
		.await?;

		let mut claimed = Vec::with_capacity(rows.len());
		for row in &rows {
			let job = row_to_job(row)?;
			let updated = sqlx::query(
				"UPDATE queue_jobs SET state = 'active', updated_at = ? WHERE id = ? AND state = 'waiting'",
			)
			.bind(now)
			.bind(job.id.0.to_string())
			.execute(&self.pool)
			.await?;

			if updated.rows_affected() == 1 {
				let _ = self
					.events
					.send(QueueEvent::Active { queue: queue_name.to_string(), job_id: job.id });
				claimed.push(job);
			}
		}
		Ok(claimed)
	}

	#[tracing::instrument(skip(self, result))]
	pub(crate) async fn mark_completed(&self, job: &QueueJob, result: serde_json::Value) -> Result<()> {
		let now = Utc::now();
		sqlx::query(
			"UPDATE queue_jobs SET state = 'completed', result_json = ?, updated_at = ? WHERE id = ?",
		)
		.bind(serde_json::to_string(&result)?)
		.bind(now)
		.bind(job.id.0.to_string())
		.execute(&self.pool)
		.await?;

		let _ = self.events.send(QueueEvent::Completed {
			queue: job.queue_name.clone(),
			job_id: job.id,
			result,
		});

		self.prune(&job.queue_name, JobState::Completed, job.remove_on_complete).await
	}

	#[tracing::instrument(skip(self))]
	pub(crate) async fn mark_retry(&self, job: &QueueJob, reason: &str, attempt: u32) -> Result<()> {
		let delay = ChronoDuration::milliseconds(job.backoff.delay_ms(attempt).max(0));
		let run_at = Utc::now() + delay;
		sqlx::query(
			"UPDATE queue_jobs SET state = 'waiting', attempts_made = ?, run_at = ?, failed_reason = ?, updated_at = ? WHERE id = ?",
		)
		.bind(attempt as i64)
		.bind(run_at)
		.bind(reason)
		.bind(Utc::now())
		.bind(job.id.0.to_string())
		.execute(&self.pool)
		.await?;

		let _ = self.events.send(QueueEvent::Waiting { queue: job.queue_name.clone(), job_id: job.id });
		Ok(())
	}

	#[tracing::instrument(skip(self))]
	pub(crate) async fn mark_failed(&self, job: &QueueJob, reason: &str) -> Result<()> {
		let now = Utc::now();
		sqlx::query(
			"UPDATE queue_jobs SET state = 'failed', failed_reason = ?, updated_at = ? WHERE id = ?",
		)
		.bind(reason)
		.bind(now)
		.bind(job.id.0.to_string())
		.execute(&self.pool)
		.await?;

		let _ = self.events.send(QueueEvent::Failed {
			queue: job.queue_name.clone(),
			job_id: job.id,
			reason: reason.to_string(),
		});

		self.prune(&job.queue_name, JobState::Failed, job.remove_on_fail).await
	}

	/// Enforces the terminal-state retention policy: keep rows younger
	/// than `policy.age_seconds`, and never more than `policy.count` of
	/// them, oldest first.
	async fn prune(&self, queue_name: &str, state: JobState, policy: RetentionPolicy) -> Result<()> {
		let cutoff = Utc::now() - ChronoDuration::seconds(policy.age_seconds);
		sqlx::query(
			"DELETE FROM queue_jobs WHERE queue_name = ? AND state = ? AND updated_at < ?",
		)
		.bind(queue_name)
		.bind(state.as_str())
		.bind(cutoff)
		.execute(&self.pool)
		.await?;

		sqlx::query(
			"DELETE FROM queue_jobs WHERE id IN (
                SELECT id FROM queue_jobs WHERE queue_name = ? AND state = ?
                ORDER BY updated_at DESC LIMIT -1 OFFSET ?
            )",
		)
		.bind(queue_name)
		.bind(state.as_str())
		.bind(policy.count as i64)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// One page of `queue_repeatables` keys, ordered for cursor pagination.
	/// Used by the janitor to walk the whole table in bounded batches
	/// rather than loading it into memory at once.
	#[tracing::instrument(skip(self))]
	pub async fn list_repeatable_keys(&self, after_key: &str, limit: i64) -> Result<Vec<String>> {
		let rows = sqlx::query("SELECT key FROM queue_repeatables WHERE key > ? ORDER BY key ASC LIMIT ?")
			.bind(after_key)
			.bind(limit)
			.fetch_all(&self.pool)
			.await?;

		rows.iter().map(|row| Ok(row.try_get::<String, _>("key")?)).collect()
	}

	/// Deletes up to `batch_size` terminal (`completed`/`failed`) rows older
	/// than `before`, across every queue, repeating in bounded batches until
	/// none remain. A backstop against rows whose owning job's
	/// `remove_on_complete`/`remove_on_fail` policy never ran (e.g. a worker
	/// crashed before calling `mark_completed`/`mark_failed`).
	#[tracing::instrument(skip(self))]
	pub async fn prune_orphaned_terminal(&self, before: DateTime<Utc>, batch_size: i64) -> Result<u64> {
		let mut total = 0u64;
		loop {
			let ids: Vec<String> = sqlx::query(
				"SELECT id FROM queue_jobs WHERE state IN ('completed', 'failed') AND updated_at < ? LIMIT ?",
			)
			.bind(before)
			.bind(batch_size)
			.fetch_all(&self.pool)
			.await?
			.iter()
			.map(|row| row.try_get::<String, _>("id"))
			.collect::<std::result::Result<_, _>>()?;

			if ids.is_empty() {
				return Ok(total);
			}

			let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
			let query = format!("DELETE FROM queue_jobs WHERE id IN ({placeholders})");
			let mut q = sqlx::query(&query);
			for id in &ids {
				q = q.bind(id);
			}
			let result = q.execute(&self.pool).await?;
			total += result.rows_affected();

			if (ids.len() as i64) < batch_size {
				return Ok(total);
			}
		}
	}

	/// Sweeps due repeatable entries, enqueuing one job per entry and
	/// advancing `next_run_at`. `advance` computes the following fire time
	/// from a schedule and the current due time.
	#[tracing::instrument(skip(self, advance))]
	pub async fn sweep_repeatables<F>(&self, advance: F) -> Result<usize>
	where
		F: Fn(&RepeatSchedule, DateTime<Utc>) -> Option<DateTime<Utc>>,
	{
		let now = Utc::now();
		let rows = sqlx::query("SELECT * FROM queue_repeatables WHERE next_run_at <= ?")
			.bind(now)
			.fetch_all(&self.pool)
			.await?;

		let mut fired = 0;
		for row in rows {
			let key: String = row.try_get("key")?;
			let queue_name: String = row.try_get("queue_name")?;
			let payload_json: String = row.try_get("payload_json")?;
			let cron: Option<String> = row.try_get("cron")?;
			let every_ms: Option<i64> = row.try_get("every_ms")?;
			let due: DateTime<Utc> = row.try_get("next_run_at")?;

			let schedule = match (cron, every_ms) {
				(Some(expr), _) => RepeatSchedule::Cron(expr),
				(None, Some(ms)) => RepeatSchedule::EveryMs(ms),
				(None, None) => continue,
			};

			let payload: serde_json::Value = serde_json::from_str(&payload_json)?;
			let opts = EnqueueOptions { job_id: Some(format!("{key}:{}", due.timestamp())), ..Default::default() };
			self.enqueue(&queue_name, payload, opts).await?;

			if let Some(next) = advance(&schedule, due) {
				sqlx::query("UPDATE queue_repeatables SET next_run_at = ?, updated_at = ? WHERE key = ?")
					.bind(next)
					.bind(Utc::now())
					.bind(&key)
					.execute(&self.pool)
					.await?;
			}
			fired += 1;
		}
		Ok(fired)
	}
}

fn row_to_job(row: &sqlx::sqlite::SqliteRow) -> Result<QueueJob> {
	let id: String = row.try_get("id")?;
	let job_key: Option<String> = row.try_get("job_key")?;
	let payload_json: String = row.try_get("payload_json")?;
	let state: String = row.try_get("state")?;
	let backoff_kind: String = row.try_get("backoff_kind")?;
	let result_json: Option<String> = row.try_get("result_json")?;

	Ok(QueueJob {
		id: QueueJobId(Uuid::parse_str(&id).map_err(|e| QueueError::ProcessorFailed(e.to_string()))?),
		queue_name: row.try_get("queue_name")?,
		job_key,
		payload: serde_json::from_str(&payload_json)?,
		state: state.parse().map_err(QueueError::ProcessorFailed)?,
		attempts_made: row.try_get::<i64, _>("attempts_made")? as u32,
		max_attempts: row.try_get::<i64, _>("max_attempts")? as u32,
		backoff: Backoff {
			kind: match backoff_kind.as_str() {
				"exponential" => BackoffKind::Exponential,
				_ => BackoffKind::Fixed,
			},
			base_delay_ms: row.try_get("backoff_base_ms")?,
		},
		run_at: row.try_get("run_at")?,
		remove_on_complete: RetentionPolicy {
			count: row.try_get::<i64, _>("remove_on_complete_count")? as u32,
			age_seconds: row.try_get("remove_on_complete_age_sec")?,
		},
		remove_on_fail: RetentionPolicy {
			count: row.try_get::<i64, _>("remove_on_fail_count")? as u32,
			age_seconds: row.try_get("remove_on_fail_age_sec")?,
		},
		result: result_json.map(|s| serde_json::from_str(&s)).transpose()?,
		failed_reason: row.try_get("failed_reason")?,
		created_at: row.try_get("created_at")?,
		updated_at: row.try_get("updated_at")?,
	})
}
