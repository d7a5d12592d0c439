//! `SqliteRow` → domain-type conversions. Centralized here so the compound
//! writes in `sqlite_repo.rs` can re-fetch the row they just wrote without
//! repeating the column mapping.

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use supercheck_core::{
	AlertHistory, AlertId, AlertKind, AlertStatus, Job, JobId, JobStatus, Monitor, MonitorConfig,
	MonitorId, MonitorResult, MonitorResultDetails, MonitorResultId, MonitorStatus,
	NotificationProvider, ProbeStatus, ProviderConfig, ProviderId, Report, Run, RunId, RunArtifact,
	RunStatus, TargetKind, TestScript, TestScriptId, Trigger,
};

use crate::error::{DbError, Result};

fn parse_uuid(s: &str) -> Result<Uuid> {
	Uuid::parse_str(s).map_err(|e| DbError::Internal(format!("invalid uuid '{s}': {e}")))
}

pub fn row_to_job(row: SqliteRow) -> Result<Job> {
	let id: String = row.try_get("id")?;
	let status: String = row.try_get("status")?;
	let alert_config_json: Option<String> = row.try_get("alert_config_json")?;
	let retry_limit: i64 = row.try_get("retry_limit")?;

	Ok(Job {
		id: JobId::from(parse_uuid(&id)?),
		name: row.try_get("name")?,
		cron_schedule: row.try_get("cron_schedule")?,
		status: status.parse::<JobStatus>().map_err(DbError::Internal)?,
		last_run_at: row.try_get("last_run_at")?,
		next_run_at: row.try_get("next_run_at")?,
		alert_config: alert_config_json
			.map(|s| serde_json::from_str(&s))
			.transpose()?,
		retry_limit: retry_limit as u32,
		created_at: row.try_get("created_at")?,
		updated_at: row.try_get("updated_at")?,
	})
}

pub fn row_to_run(row: SqliteRow) -> Result<Run> {
	let id: String = row.try_get("id")?;
	let job_id: String = row.try_get("job_id")?;
	let status: String = row.try_get("status")?;
	let trigger: String = row.try_get("trigger")?;
	let duration_sec: Option<i64> = row.try_get("duration_sec")?;
	let report_url: Option<String> = row.try_get("report_url")?;

	Ok(Run {
		id: RunId::from(parse_uuid(&id)?),
		job_id: JobId::from(parse_uuid(&job_id)?),
		status: status.parse::<RunStatus>().map_err(DbError::Internal)?,
		started_at: row.try_get("started_at")?,
		completed_at: row.try_get("completed_at")?,
		duration_sec,
		trigger: trigger.parse::<Trigger>().map_err(DbError::Internal)?,
		error_details: row.try_get("error_details")?,
		artifact: RunArtifact { report_url },
		created_at: row.try_get("created_at")?,
	})
}

pub fn row_to_monitor(row: SqliteRow) -> Result<Monitor> {
	let id: String = row.try_get("id")?;
	let config_json: String = row.try_get("config_json")?;
	let status: String = row.try_get("status")?;
	let enabled: bool = row.try_get("enabled")?;
	let alert_config_json: Option<String> = row.try_get("alert_config_json")?;

	Ok(Monitor {
		id: MonitorId::from(parse_uuid(&id)?),
		target: row.try_get("target")?,
		frequency_minutes: {
			let v: i64 = row.try_get("frequency_minutes")?;
			v as u32
		},
		enabled,
		status: status.parse::<MonitorStatus>().map_err(DbError::Internal)?,
		config: serde_json::from_str::<MonitorConfig>(&config_json)?,
		last_check_at: row.try_get("last_check_at")?,
		last_status_change_at: row.try_get("last_status_change_at")?,
		alert_config: alert_config_json
			.map(|s| serde_json::from_str(&s))
			.transpose()?,
		ssl_last_checked_at: row.try_get("ssl_last_checked_at")?,
		last_ping_at: row.try_get("last_ping_at")?,
		created_at: row.try_get("created_at")?,
		updated_at: row.try_get("updated_at")?,
	})
}

pub fn row_to_monitor_result(row: SqliteRow) -> Result<MonitorResult> {
	let id: String = row.try_get("id")?;
	let monitor_id: String = row.try_get("monitor_id")?;
	let status: String = row.try_get("status")?;
	let details_json: String = row.try_get("details_json")?;
	let response_time_ms: Option<i64> = row.try_get("response_time_ms")?;
	let is_status_change: i64 = row.try_get("is_status_change").unwrap_or(0);

	Ok(MonitorResult {
		id: MonitorResultId::from(parse_uuid(&id)?),
		monitor_id: MonitorId::from(parse_uuid(&monitor_id)?),
		checked_at: row.try_get("checked_at")?,
		status: status.parse::<ProbeStatus>().map_err(DbError::Internal)?,
		response_time_ms: response_time_ms.map(|v| v as u64),
		details: serde_json::from_str::<MonitorResultDetails>(&details_json)?,
		is_up: row.try_get("is_up")?,
		is_status_change: is_status_change != 0,
		created_at: row.try_get("created_at")?,
	})
}

pub fn row_to_provider(row: SqliteRow) -> Result<NotificationProvider> {
	let id: String = row.try_get("id")?;
	let config_json: String = row.try_get("config_json")?;

	Ok(NotificationProvider {
		id: ProviderId::from(parse_uuid(&id)?),
		config: serde_json::from_str::<ProviderConfig>(&config_json)?,
		enabled: row.try_get("enabled")?,
		created_at: row.try_get("created_at")?,
		updated_at: row.try_get("updated_at")?,
	})
}

pub fn row_to_alert_history(row: SqliteRow) -> Result<AlertHistory> {
	let id: String = row.try_get("id")?;
	let kind: String = row.try_get("type")?;
	let target_kind: String = row.try_get("target_kind")?;
	let target_id: String = row.try_get("target_id")?;
	let providers_json: String = row.try_get("providers_json")?;
	let status: String = row.try_get("status")?;

	Ok(AlertHistory {
		id: AlertId::from(parse_uuid(&id)?),
		kind: kind.parse::<AlertKind>().map_err(DbError::Internal)?,
		target_kind: target_kind.parse::<TargetKind>().map_err(DbError::Internal)?,
		target_id: parse_uuid(&target_id)?,
		message: row.try_get("message")?,
		providers: serde_json::from_str(&providers_json)?,
		status: match status.as_str() {
			"sent" => AlertStatus::Sent,
			"failed" => AlertStatus::Failed,
			"pending" => AlertStatus::Pending,
			other => return Err(DbError::Internal(format!("unknown alert status: {other}"))),
		},
		error_message: row.try_get("error_message")?,
		sent_at: row.try_get("sent_at")?,
	})
}

pub fn row_to_report(row: SqliteRow) -> Result<Report> {
	let entity_type: String = row.try_get("entity_type")?;
	let entity_id: String = row.try_get("entity_id")?;

	Ok(Report {
		entity_type: entity_type.parse().map_err(DbError::Internal)?,
		entity_id: parse_uuid(&entity_id)?,
		status: row.try_get("status")?,
		artifact_url: row.try_get("artifact_url")?,
		artifact_path: row.try_get("artifact_path")?,
		updated_at: row.try_get("updated_at")?,
	})
}

pub fn row_to_test_script(row: SqliteRow) -> Result<TestScript> {
	let id: String = row.try_get("id")?;
	let job_id: String = row.try_get("job_id")?;
	let order_position: i64 = row.try_get("order_position")?;

	Ok(TestScript {
		id: TestScriptId::from(parse_uuid(&id)?),
		job_id: JobId::from(parse_uuid(&job_id)?),
		name: row.try_get("name")?,
		script: row.try_get("script")?,
		order_position: order_position as u32,
	})
}

pub fn alert_status_str(status: AlertStatus) -> &'static str {
	match status {
		AlertStatus::Sent => "sent",
		AlertStatus::Failed => "failed",
		AlertStatus::Pending => "pending",
	}
}
