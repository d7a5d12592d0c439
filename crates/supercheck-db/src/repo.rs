//! The `Repo` contract: every write that must be consistent executes in a
//! single transaction; reads are plain queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use supercheck_core::{
	AlertHistory, AlertKind, Job, Monitor, MonitorResult, MonitorResultDetails, MonitorStatus,
	NotificationProvider, ProbeStatus, ProviderId, Report, Run, RunId, RunStatus, TestScript, Trigger,
};

use crate::error::Result;

/// Partial update applied to a monitor outside the `insertMonitorResult`
/// compound write — e.g. enabling/disabling, or editing its config.
/// `config_patch`'s top-level keys are merged onto the stored config JSON
/// rather than replacing it wholesale.
#[derive(Debug, Clone, Default)]
pub struct MonitorPatch {
	pub status: Option<MonitorStatus>,
	pub last_check_at: Option<DateTime<Utc>>,
	pub last_status_change_at: Option<DateTime<Utc>>,
	pub enabled: Option<bool>,
	pub config_patch: Option<serde_json::Value>,
	/// Set by the HTTP prober after it actually performs an SSL check on a
	/// `website` monitor (`§4.10`'s "on success, write `sslLastCheckedAt`").
	pub ssl_last_checked_at: Option<DateTime<Utc>>,
	/// Set by the heartbeat ingress endpoint on each inbound ping.
	pub last_ping_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Repo: Send + Sync {
	/// Atomic guard: fails with `DbError::Conflict` if a run already exists
	/// for `job_id` with `status='running'`. Also sets `Job.last_run_at`
	/// and `Job.status=running` in the same transaction.
	async fn create_run(&self, job_id: Uuid, trigger: Trigger) -> Result<Run>;

	/// Idempotent on terminal state: a second call against an
	/// already-terminal run is a no-op that returns the existing row.
	/// Also updates the owning Job's `status` to match the run outcome.
	async fn finish_run(
		&self,
		run_id: RunId,
		status: RunStatus,
		duration_sec: i64,
		error_details: Option<String>,
		report_url: Option<String>,
	) -> Result<Run>;

	/// Recent statuses newest-first, for job alert thresholding.
	async fn get_run_statuses_for_job(&self, job_id: Uuid, limit: u32) -> Result<Vec<RunStatus>>;

	async fn get_job(&self, job_id: Uuid) -> Result<Job>;

	/// Jobs whose `cron_schedule` is set, for `JobScheduler` to plan.
	async fn list_schedulable_jobs(&self) -> Result<Vec<Job>>;

	/// A job's scripts in `order_position` order; used for the repeatable
	/// entry's `testCases` payload and for populating the dispatcher's
	/// working directory.
	async fn list_test_scripts(&self, job_id: Uuid) -> Result<Vec<TestScript>>;

	/// Insert or update keyed by `(entity_type, entity_id)`.
	async fn upsert_report(
		&self,
		entity_type: supercheck_core::EntityType,
		entity_id: Uuid,
		status: String,
		artifact_path: String,
		artifact_url: Option<String>,
	) -> Result<Report>;

	/// Inserts the result and, in the same transaction, applies the
	/// monitor status-transition rule (`lastStatusChangeAt` moves only on
	/// `up<->down`, never for `paused`/`maintenance`).
	async fn insert_monitor_result(
		&self,
		monitor_id: Uuid,
		checked_at: DateTime<Utc>,
		status: ProbeStatus,
		response_time_ms: Option<u64>,
		details: MonitorResultDetails,
		is_up: bool,
	) -> Result<MonitorResult>;

	async fn update_monitor(&self, id: Uuid, patch: MonitorPatch) -> Result<Monitor>;

	async fn get_monitor(&self, id: Uuid) -> Result<Monitor>;

	async fn list_enabled_monitors(&self) -> Result<Vec<Monitor>>;

	/// Newest-first.
	async fn recent_monitor_results(&self, monitor_id: Uuid, limit: u32) -> Result<Vec<MonitorResult>>;

	async fn insert_alert_history(&self, alert: AlertHistory) -> Result<AlertHistory>;

	/// Most recent `AlertHistory` row for `(target_id, kind)`, for cooldown
	/// checks (e.g. the SSL-expiry 24h cooldown).
	async fn last_alert_of_kind(&self, target_id: Uuid, kind: AlertKind) -> Result<Option<AlertHistory>>;

	/// Providers referenced by an `alertConfig.providerIds` list. Missing
	/// providers are silently skipped, not errored — the alert engine logs
	/// a warning and continues with whatever resolved.
	async fn get_providers(&self, ids: &[ProviderId]) -> Result<Vec<NotificationProvider>>;
}
