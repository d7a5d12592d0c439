//! SQLite implementation of [`Repo`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::error::DatabaseError;
use sqlx::SqlitePool;
use uuid::Uuid;

use supercheck_core::{
	AlertHistory, AlertKind, EntityType, Job, JobId, JobStatus, Monitor, MonitorResult,
	MonitorResultDetails, MonitorResultId, MonitorStatus, NotificationProvider, ProbeStatus,
	ProviderId, Report, Run, RunArtifact, RunId, RunStatus, TestScript, Trigger,
};

use crate::convert::{
	alert_status_str, row_to_alert_history, row_to_job, row_to_monitor, row_to_monitor_result,
	row_to_provider, row_to_run, row_to_test_script,
};
use crate::error::{DbError, Result};
use crate::repo::{MonitorPatch, Repo};

#[derive(Clone)]
pub struct SqliteRepo {
	pool: SqlitePool,
}

impl SqliteRepo {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	async fn fetch_run(&self, id: Uuid) -> Result<Run> {
		let row = sqlx::query("SELECT * FROM runs WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("run {id}")))?;
		row_to_run(row)
	}
}

/// A job has no dedicated `timeout` state (§3's Job status enum is
/// `{pending, running, passed, failed, error}`), so a timed-out run leaves
/// its job in `error` rather than inventing a sixth Job status.
fn job_status_for_run(status: RunStatus) -> JobStatus {
	match status {
		RunStatus::Passed => JobStatus::Passed,
		RunStatus::Failed => JobStatus::Failed,
		RunStatus::Error | RunStatus::Timeout => JobStatus::Error,
		RunStatus::Running => JobStatus::Running,
	}
}

#[async_trait]
impl Repo for SqliteRepo {
	#[tracing::instrument(skip(self))]
	async fn create_run(&self, job_id: Uuid, trigger: Trigger) -> Result<Run> {
		let mut tx = self.pool.begin().await?;
		let run_id = RunId::new();
		let started_at = Utc::now();

		let insert = sqlx::query(
			"INSERT INTO runs (id, job_id, status, started_at, completed_at, duration_sec, trigger, error_details, report_url, created_at)
             VALUES (?, ?, 'running', ?, NULL, NULL, ?, NULL, NULL, ?)",
		)
		.bind(run_id.to_string())
		.bind(job_id.to_string())
		.bind(started_at)
		.bind(trigger.to_string())
		.bind(started_at)
		.execute(&mut *tx)
		.await;

		if let Err(sqlx::Error::Database(db_err)) = &insert {
			if db_err.is_unique_violation() {
				tx.rollback().await.ok();
				return Err(DbError::Conflict(format!(
					"job {job_id} already has a running run"
				)));
			}
		}
		insert?;

		sqlx::query("UPDATE jobs SET status = 'running', last_run_at = ?, updated_at = ? WHERE id = ?")
			.bind(started_at)
			.bind(started_at)
			.bind(job_id.to_string())
			.execute(&mut *tx)
			.await?;

		tx.commit().await?;

		Ok(Run {
			id: run_id,
			job_id: JobId::from(job_id),
			status: RunStatus::Running,
			started_at,
			completed_at: None,
			duration_sec: None,
			trigger,
			error_details: None,
			artifact: RunArtifact::default(),
			created_at: started_at,
		})
	}

	#[tracing::instrument(skip(self, error_details, report_url))]
	async fn finish_run(
		&self,
		run_id: RunId,
		status: RunStatus,
		duration_sec: i64,
		error_details: Option<String>,
		report_url: Option<String>,
	) -> Result<Run> {
		let mut tx = self.pool.begin().await?;
		let completed_at = Utc::now();

		let result = sqlx::query(
			"UPDATE runs SET status = ?, completed_at = ?, duration_sec = ?, error_details = ?, report_url = ?
             WHERE id = ? AND status = 'running'",
		)
		.bind(status.to_string())
		.bind(completed_at)
		.bind(duration_sec)
		.bind(&error_details)
		.bind(&report_url)
		.bind(run_id.to_string())
		.execute(&mut *tx)
		.await?;

		// Idempotent: a second call against an already-terminal run affects
		// zero rows and simply returns the existing row below.
		if result.rows_affected() > 0 {
			let job_id: String = sqlx::query_scalar("SELECT job_id FROM runs WHERE id = ?")
				.bind(run_id.to_string())
				.fetch_one(&mut *tx)
				.await?;

			sqlx::query("UPDATE jobs SET status = ?, updated_at = ? WHERE id = ?")
				.bind(job_status_for_run(status).to_string())
				.bind(completed_at)
				.bind(job_id)
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;
		self.fetch_run(run_id.as_uuid()).await
	}

	#[tracing::instrument(skip(self))]
	async fn get_run_statuses_for_job(&self, job_id: Uuid, limit: u32) -> Result<Vec<RunStatus>> {
		let rows: Vec<(String,)> =
			sqlx::query_as("SELECT status FROM runs WHERE job_id = ? ORDER BY started_at DESC LIMIT ?")
				.bind(job_id.to_string())
				.bind(limit as i64)
				.fetch_all(&self.pool)
				.await?;

		rows.into_iter()
			.map(|(s,)| s.parse::<RunStatus>().map_err(DbError::Internal))
			.collect()
	}

	#[tracing::instrument(skip(self))]
	async fn get_job(&self, job_id: Uuid) -> Result<Job> {
		let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
			.bind(job_id.to_string())
			.fetch_optional(&self.pool)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("job {job_id}")))?;
		row_to_job(row)
	}

	#[tracing::instrument(skip(self))]
	async fn list_schedulable_jobs(&self) -> Result<Vec<Job>> {
		let rows = sqlx::query("SELECT * FROM jobs WHERE cron_schedule IS NOT NULL")
			.fetch_all(&self.pool)
			.await?;
		rows.into_iter().map(row_to_job).collect()
	}

	#[tracing::instrument(skip(self))]
	async fn list_test_scripts(&self, job_id: Uuid) -> Result<Vec<TestScript>> {
		let rows = sqlx::query("SELECT * FROM test_scripts WHERE job_id = ? ORDER BY order_position")
			.bind(job_id.to_string())
			.fetch_all(&self.pool)
			.await?;
		rows.into_iter().map(row_to_test_script).collect()
	}

	#[tracing::instrument(skip(self, artifact_path, artifact_url))]
	async fn upsert_report(
		&self,
		entity_type: EntityType,
		entity_id: Uuid,
		status: String,
		artifact_path: String,
		artifact_url: Option<String>,
	) -> Result<Report> {
		let updated_at = Utc::now();

		sqlx::query(
			"INSERT INTO reports (entity_type, entity_id, status, artifact_url, artifact_path, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(entity_type, entity_id) DO UPDATE SET
                status = excluded.status,
                artifact_url = excluded.artifact_url,
                artifact_path = excluded.artifact_path,
                updated_at = excluded.updated_at",
		)
		.bind(entity_type.to_string())
		.bind(entity_id.to_string())
		.bind(&status)
		.bind(&artifact_url)
		.bind(&artifact_path)
		.bind(updated_at)
		.execute(&self.pool)
		.await?;

		Ok(Report {
			entity_type,
			entity_id,
			status,
			artifact_url,
			artifact_path,
			updated_at,
		})
	}

	#[tracing::instrument(skip(self, details))]
	async fn insert_monitor_result(
		&self,
		monitor_id: Uuid,
		checked_at: DateTime<Utc>,
		status: ProbeStatus,
		response_time_ms: Option<u64>,
		details: MonitorResultDetails,
		is_up: bool,
	) -> Result<MonitorResult> {
		let mut tx = self.pool.begin().await?;

		let previous_up: Option<bool> = sqlx::query_scalar(
			"SELECT is_up FROM monitor_results WHERE monitor_id = ? ORDER BY checked_at DESC LIMIT 1",
		)
		.bind(monitor_id.to_string())
		.fetch_optional(&mut *tx)
		.await?;
		let is_status_change = previous_up.map(|prev| prev != is_up).unwrap_or(true);

		let id = MonitorResultId::new();
		let details_json = serde_json::to_string(&details)?;

		sqlx::query(
			"INSERT INTO monitor_results (id, monitor_id, checked_at, status, response_time_ms, details_json, is_up, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
		)
		.bind(id.to_string())
		.bind(monitor_id.to_string())
		.bind(checked_at)
		.bind(status.to_string())
		.bind(response_time_ms.map(|v| v as i64))
		.bind(&details_json)
		.bind(is_up)
		.bind(checked_at)
		.execute(&mut *tx)
		.await?;

		// Apply the monitor status-transition rule: `status` always tracks
		// the latest result, but `last_status_change_at` only moves on a
		// genuine up<->down flip (not paused/maintenance, and not the very
		// first result out of `pending`).
		let current_status: String = sqlx::query_scalar("SELECT status FROM monitors WHERE id = ?")
			.bind(monitor_id.to_string())
			.fetch_one(&mut *tx)
			.await?;
		let current_status: MonitorStatus = current_status.parse().map_err(DbError::Internal)?;
		let next_status = if is_up { MonitorStatus::Up } else { MonitorStatus::Down };

		if MonitorStatus::is_counted_transition(current_status, next_status) {
			sqlx::query(
				"UPDATE monitors SET status = ?, last_check_at = ?, last_status_change_at = ?, updated_at = ? WHERE id = ?",
			)
			.bind(next_status.to_string())
			.bind(checked_at)
			.bind(checked_at)
			.bind(checked_at)
			.bind(monitor_id.to_string())
			.execute(&mut *tx)
			.await?;
		} else {
			sqlx::query("UPDATE monitors SET status = ?, last_check_at = ?, updated_at = ? WHERE id = ?")
				.bind(next_status.to_string())
				.bind(checked_at)
				.bind(checked_at)
				.bind(monitor_id.to_string())
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;

		Ok(MonitorResult {
			id,
			monitor_id: supercheck_core::MonitorId::from(monitor_id),
			checked_at,
			status,
			response_time_ms,
			details,
			is_up,
			is_status_change,
			created_at: checked_at,
		})
	}

	#[tracing::instrument(skip(self, patch))]
	async fn update_monitor(&self, id: Uuid, patch: MonitorPatch) -> Result<Monitor> {
		let mut tx = self.pool.begin().await?;
		let now = Utc::now();

		if let Some(config_patch) = patch.config_patch {
			let current_json: String = sqlx::query_scalar("SELECT config_json FROM monitors WHERE id = ?")
				.bind(id.to_string())
				.fetch_optional(&mut *tx)
				.await?
				.ok_or_else(|| DbError::NotFound(format!("monitor {id}")))?;

			let mut current: serde_json::Value = serde_json::from_str(&current_json)?;
			if let (Some(current_obj), Some(patch_obj)) = (current.as_object_mut(), config_patch.as_object()) {
				for (key, value) in patch_obj {
					current_obj.insert(key.clone(), value.clone());
				}
			}
			let merged = serde_json::to_string(&current)?;

			sqlx::query("UPDATE monitors SET config_json = ?, updated_at = ? WHERE id = ?")
				.bind(merged)
				.bind(now)
				.bind(id.to_string())
				.execute(&mut *tx)
				.await?;
		}

		if let Some(status) = patch.status {
			sqlx::query("UPDATE monitors SET status = ?, updated_at = ? WHERE id = ?")
				.bind(status.to_string())
				.bind(now)
				.bind(id.to_string())
				.execute(&mut *tx)
				.await?;
		}
		if let Some(last_check_at) = patch.last_check_at {
			sqlx::query("UPDATE monitors SET last_check_at = ? WHERE id = ?")
				.bind(last_check_at)
				.bind(id.to_string())
				.execute(&mut *tx)
				.await?;
		}
		if let Some(last_status_change_at) = patch.last_status_change_at {
			sqlx::query("UPDATE monitors SET last_status_change_at = ? WHERE id = ?")
				.bind(last_status_change_at)
				.bind(id.to_string())
				.execute(&mut *tx)
				.await?;
		}
		if let Some(enabled) = patch.enabled {
			sqlx::query("UPDATE monitors SET enabled = ?, updated_at = ? WHERE id = ?")
				.bind(enabled)
				.bind(now)
				.bind(id.to_string())
				.execute(&mut *tx)
				.await?;
		}
		if let Some(ssl_last_checked_at) = patch.ssl_last_checked_at {
			sqlx::query("UPDATE monitors SET ssl_last_checked_at = ? WHERE id = ?")
				.bind(ssl_last_checked_at)
				.bind(id.to_string())
				.execute(&mut *tx)
				.await?;
		}
		if let Some(last_ping_at) = patch.last_ping_at {
			sqlx::query("UPDATE monitors SET last_ping_at = ? WHERE id = ?")
				.bind(last_ping_at)
				.bind(id.to_string())
				.execute(&mut *tx)
				.await?;
		}

		tx.commit().await?;
		self.get_monitor(id).await
	}

	#[tracing::instrument(skip(self))]
	async fn get_monitor(&self, id: Uuid) -> Result<Monitor> {
		let row = sqlx::query("SELECT * FROM monitors WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await?
			.ok_or_else(|| DbError::NotFound(format!("monitor {id}")))?;
		row_to_monitor(row)
	}

	#[tracing::instrument(skip(self))]
	async fn list_enabled_monitors(&self) -> Result<Vec<Monitor>> {
		let rows = sqlx::query("SELECT * FROM monitors WHERE enabled = 1")
			.fetch_all(&self.pool)
			.await?;
		rows.into_iter().map(row_to_monitor).collect()
	}

	#[tracing::instrument(skip(self))]
	async fn recent_monitor_results(&self, monitor_id: Uuid, limit: u32) -> Result<Vec<MonitorResult>> {
		let rows = sqlx::query(
			"SELECT id, monitor_id, checked_at, status, response_time_ms, details_json, is_up, created_at,
                    CASE
                        WHEN LAG(is_up) OVER (PARTITION BY monitor_id ORDER BY checked_at) IS NULL THEN 1
                        WHEN LAG(is_up) OVER (PARTITION BY monitor_id ORDER BY checked_at) != is_up THEN 1
                        ELSE 0
                    END AS is_status_change
             FROM monitor_results
             WHERE monitor_id = ?
             ORDER BY checked_at DESC
             LIMIT ?",
		)
		.bind(monitor_id.to_string())
		.bind(limit as i64)
		.fetch_all(&self.pool)
		.await?;

		rows.into_iter().map(row_to_monitor_result).collect()
	}

	#[tracing::instrument(skip(self, alert))]
	async fn insert_alert_history(&self, alert: AlertHistory) -> Result<AlertHistory> {
		let providers_json = serde_json::to_string(&alert.providers)?;

		sqlx::query(
			"INSERT INTO alert_history (id, type, target_kind, target_id, message, providers_json, status, error_message, sent_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
		)
		.bind(alert.id.to_string())
		.bind(alert.kind.to_string())
		.bind(alert.target_kind.to_string())
		.bind(alert.target_id.to_string())
		.bind(&alert.message)
		.bind(&providers_json)
		.bind(alert_status_str(alert.status))
		.bind(&alert.error_message)
		.bind(alert.sent_at)
		.execute(&self.pool)
		.await?;

		Ok(alert)
	}

	#[tracing::instrument(skip(self))]
	async fn last_alert_of_kind(&self, target_id: Uuid, kind: AlertKind) -> Result<Option<AlertHistory>> {
		let row = sqlx::query(
			"SELECT * FROM alert_history WHERE target_id = ? AND type = ? ORDER BY sent_at DESC LIMIT 1",
		)
		.bind(target_id.to_string())
		.bind(kind.to_string())
		.fetch_optional(&self.pool)
		.await?;

		row.map(row_to_alert_history).transpose()
	}

	#[tracing::instrument(skip(self))]
	async fn get_providers(&self, ids: &[ProviderId]) -> Result<Vec<NotificationProvider>> {
		if ids.is_empty() {
			return Ok(Vec::new());
		}

		let placeholders = vec!["?"; ids.len()].join(",");
		let query = format!("SELECT * FROM notification_providers WHERE id IN ({placeholders}) AND enabled = 1");
		let mut q = sqlx::query(&query);
		for id in ids {
			q = q.bind(id.to_string());
		}

		let rows = q.fetch_all(&self.pool).await?;
		rows.into_iter().map(row_to_provider).collect()
	}
}
