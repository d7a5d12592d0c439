//! SQLite-backed `Repo` implementation: pool setup, schema, and the
//! transactional operations the domain layer needs.

pub mod convert;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repo;
pub mod sqlite_repo;
pub mod testing;

pub use error::{DbError, Result};
pub use pool::create_pool;
pub use repo::{MonitorPatch, Repo};
pub use sqlite_repo::SqliteRepo;

#[cfg(test)]
mod tests {
	use chrono::Utc;
	use supercheck_core::{
		AlertHistory, AlertId, AlertKind, AlertStatus, EntityType, HttpMonitorConfig, HttpMethod,
		Monitor, MonitorConfig, MonitorResultDetails, MonitorStatus, PingProbeDetails, ProbeStatus,
		ProviderId, TargetKind, Trigger,
	};
	use uuid::Uuid;

	use super::*;
	use crate::repo::MonitorPatch;
	use crate::testing::create_test_pool;

	async fn seed_job(repo: &SqliteRepo, pool: &sqlx::SqlitePool) -> Uuid {
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
		let _ = repo;
		id
	}

	async fn seed_monitor(pool: &sqlx::SqlitePool) -> Uuid {
		let id = Uuid::new_v4();
		let now = Utc::now();
		let config = MonitorConfig::HttpRequest(HttpMonitorConfig {
			method: HttpMethod::Get,
			headers: None,
			body: None,
			expected_status_codes: None,
			keyword_in_body: None,
			keyword_in_body_should_be_present: None,
			auth: None,
			timeout_seconds: None,
			enable_ssl_check: None,
			ssl_days_until_expiration_warning: None,
			ssl_check_frequency_hours: None,
		});
		sqlx::query(
			"INSERT INTO monitors (id, type, target, frequency_minutes, enabled, status, config_json, last_check_at, last_status_change_at, alert_config_json, ssl_last_checked_at, last_ping_at, created_at, updated_at)
             VALUES (?, 'http_request', 'https://example.test', 5, 1, 'pending', ?, NULL, NULL, NULL, NULL, NULL, ?, ?)",
		)
		.bind(id.to_string())
		.bind(serde_json::to_string(&config).unwrap())
		.bind(now)
		.bind(now)
		.execute(pool)
		.await
		.unwrap();
		id
	}

	#[tokio::test]
	async fn create_run_then_second_create_run_conflicts() {
		let pool = create_test_pool().await;
		let repo = SqliteRepo::new(pool.clone());
		let job_id = seed_job(&repo, &pool).await;

		let run = repo.create_run(job_id, Trigger::Schedule).await.unwrap();
		assert_eq!(run.job_id.as_uuid(), job_id);

		let conflict = repo.create_run(job_id, Trigger::Schedule).await;
		assert!(matches!(conflict, Err(DbError::Conflict(_))));
	}

	#[tokio::test]
	async fn finish_run_is_idempotent_on_terminal_state() {
		let pool = create_test_pool().await;
		let repo = SqliteRepo::new(pool.clone());
		let job_id = seed_job(&repo, &pool).await;
		let run = repo.create_run(job_id, Trigger::Manual).await.unwrap();

		let first = repo
			.finish_run(run.id, supercheck_core::RunStatus::Passed, 12, None, None)
			.await
			.unwrap();
		assert_eq!(first.status, supercheck_core::RunStatus::Passed);
		assert_eq!(first.duration_sec, Some(12));

		let second = repo
			.finish_run(run.id, supercheck_core::RunStatus::Failed, 99, None, None)
			.await
			.unwrap();
		assert_eq!(second.status, supercheck_core::RunStatus::Passed);
		assert_eq!(second.duration_sec, Some(12));

		let job = repo.get_job(job_id).await.unwrap();
		assert_eq!(job.status, supercheck_core::JobStatus::Passed);
	}

	#[tokio::test]
	async fn insert_monitor_result_bumps_status_change_only_on_flip() {
		let pool = create_test_pool().await;
		let repo = SqliteRepo::new(pool.clone());
		let monitor_id = seed_monitor(&pool).await;
		let details = MonitorResultDetails::Ping(PingProbeDetails {
			rtt_ms: Some(12.0),
			packets_sent: 1,
			packets_received: 1,
		});

		let first = repo
			.insert_monitor_result(monitor_id, Utc::now(), ProbeStatus::Up, Some(12), details.clone(), true)
			.await
			.unwrap();
		assert!(first.is_status_change);

		let monitor = repo.get_monitor(monitor_id).await.unwrap();
		assert_eq!(monitor.status, MonitorStatus::Up);
		let first_change_at = monitor.last_status_change_at;

		let second = repo
			.insert_monitor_result(monitor_id, Utc::now(), ProbeStatus::Up, Some(9), details, true)
			.await
			.unwrap();
		assert!(!second.is_status_change);

		let monitor = repo.get_monitor(monitor_id).await.unwrap();
		assert_eq!(monitor.last_status_change_at, first_change_at);
	}

	#[tokio::test]
	async fn update_monitor_config_patch_merges_fields() {
		let pool = create_test_pool().await;
		let repo = SqliteRepo::new(pool.clone());
		let monitor_id = seed_monitor(&pool).await;

		let patch = MonitorPatch {
			config_patch: Some(serde_json::json!({ "timeout_seconds": 30 })),
			..Default::default()
		};
		let monitor: Monitor = repo.update_monitor(monitor_id, patch).await.unwrap();

		match monitor.config {
			MonitorConfig::HttpRequest(config) => assert_eq!(config.timeout_seconds, Some(30)),
			other => panic!("unexpected config variant: {other:?}"),
		}
	}

	#[tokio::test]
	async fn last_alert_of_kind_finds_most_recent() {
		let pool = create_test_pool().await;
		let repo = SqliteRepo::new(pool.clone());
		let monitor_id = Uuid::new_v4();

		let alert = AlertHistory {
			id: AlertId::new(),
			kind: AlertKind::SslExpiring,
			target_kind: TargetKind::Monitor,
			target_id: monitor_id,
			message: "cert expiring in 10 days".into(),
			providers: vec![ProviderId::new()],
			status: AlertStatus::Sent,
			error_message: None,
			sent_at: Utc::now(),
		};
		repo.insert_alert_history(alert).await.unwrap();

		let found = repo
			.last_alert_of_kind(monitor_id, AlertKind::SslExpiring)
			.await
			.unwrap();
		assert!(found.is_some());

		let none = repo
			.last_alert_of_kind(monitor_id, AlertKind::SslExpired)
			.await
			.unwrap();
		assert!(none.is_none());
	}

	#[tokio::test]
	async fn upsert_report_is_idempotent_on_entity_pair() {
		let pool = create_test_pool().await;
		let repo = SqliteRepo::new(pool.clone());
		let job_id = seed_job(&repo, &pool).await;

		repo.upsert_report(
			EntityType::Job,
			job_id,
			"passed".into(),
			"/reports/job/1".into(),
			Some("https://artifacts.test/1".into()),
		)
		.await
		.unwrap();

		let updated = repo
			.upsert_report(EntityType::Job, job_id, "failed".into(), "/reports/job/1".into(), None)
			.await
			.unwrap();

		assert_eq!(updated.status, "failed");
		assert_eq!(updated.entity_id, job_id);
	}

	#[tokio::test]
	async fn list_test_scripts_is_ordered_by_position() {
		let pool = create_test_pool().await;
		let repo = SqliteRepo::new(pool.clone());
		let job_id = seed_job(&repo, &pool).await;

		for (name, position) in [("teardown", 2), ("setup", 0), ("body", 1)] {
			sqlx::query(
				"INSERT INTO test_scripts (id, job_id, name, script, order_position) VALUES (?, ?, ?, 'noop', ?)",
			)
			.bind(Uuid::new_v4().to_string())
			.bind(job_id.to_string())
			.bind(name)
			.bind(position)
			.execute(&pool)
			.await
			.unwrap();
		}

		let scripts = repo.list_test_scripts(job_id).await.unwrap();
		let names: Vec<&str> = scripts.iter().map(|s| s.name.as_str()).collect();
		assert_eq!(names, vec!["setup", "body", "teardown"]);
	}
}
