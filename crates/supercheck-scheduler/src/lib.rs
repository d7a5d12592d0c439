//! Reconciles `jobs`/`monitors` into queue repeatable entries and turns
//! their firings into the execution tasks the dispatchers consume.

pub mod error;
pub mod job_scheduler;
pub mod monitor_scheduler;

pub use error::{Result, SchedulerError};
pub use job_scheduler::{JobExecutionPayload, JobSchedulePayload, JobScheduler, JobSchedulerProcessor};
pub use monitor_scheduler::{MonitorSchedulePayload, MonitorScheduler, MonitorSchedulerProcessor};

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use chrono::Utc;
	use uuid::Uuid;

	use supercheck_core::{HttpMethod, HttpMonitorConfig, MonitorConfig, JOB_SCHEDULER_QUEUE, MONITOR_SCHEDULER_QUEUE};
	use supercheck_db::SqliteRepo;
	use supercheck_queue::{Backoff, BackoffKind, JobState, Processor, Queue, QueueJob, QueueJobId, RetentionPolicy};

	use super::*;

	async fn seed_job_with_cron(pool: &sqlx::SqlitePool, cron: &str, retry_limit: i64) -> Uuid {
		let id = Uuid::new_v4();
		let now = Utc::now();
		sqlx::query(
			"INSERT INTO jobs (id, name, cron_schedule, status, last_run_at, next_run_at, alert_config_json, retry_limit, created_at, updated_at)
             VALUES (?, 'nightly-smoke', ?, 'pending', NULL, NULL, NULL, ?, ?, ?)",
		)
		.bind(id.to_string())
		.bind(cron)
		.bind(retry_limit)
		.bind(now)
		.bind(now)
		.execute(pool)
		.await
		.unwrap();

		sqlx::query(
			"INSERT INTO test_scripts (id, job_id, name, script, order_position) VALUES (?, ?, 'smoke', 'noop', 0)",
		)
		.bind(Uuid::new_v4().to_string())
		.bind(id.to_string())
		.execute(pool)
		.await
		.unwrap();

		id
	}

	async fn seed_monitor(pool: &sqlx::SqlitePool, frequency_minutes: i64) -> Uuid {
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
             VALUES (?, 'http_request', 'https://example.test', ?, 1, 'pending', ?, NULL, NULL, NULL, NULL, NULL, ?, ?)",
		)
		.bind(id.to_string())
		.bind(frequency_minutes)
		.bind(serde_json::to_string(&config).unwrap())
		.bind(now)
		.bind(now)
		.execute(pool)
		.await
		.unwrap();
		id
	}

	fn fake_job(queue_name: &str, payload: serde_json::Value, max_attempts: u32) -> QueueJob {
		let now = Utc::now();
		QueueJob {
			id: QueueJobId::new(),
			queue_name: queue_name.to_string(),
			job_key: None,
			payload,
			state: JobState::Active,
			attempts_made: 0,
			max_attempts,
			backoff: Backoff { kind: BackoffKind::Fixed, base_delay_ms: 0 },
			run_at: now,
			remove_on_complete: RetentionPolicy::completed_default(),
			remove_on_fail: RetentionPolicy::failed_default(),
			result: None,
			failed_reason: None,
			created_at: now,
			updated_at: now,
		}
	}

	#[tokio::test]
	async fn job_scheduler_upserts_repeatable_for_schedulable_job() {
		let db_pool = supercheck_db::testing::create_test_pool().await;
		let queue_pool = supercheck_queue::testing::create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool.clone()));
		let queue = Queue::new(queue_pool);

		seed_job_with_cron(&db_pool, "*/5 * * * *", 2).await;

		let scheduler = JobScheduler::new(repo, queue.clone());
		scheduler.reconcile().await.unwrap();

		let fired = queue
			.sweep_repeatables(|schedule, due| match schedule {
				supercheck_queue::RepeatSchedule::Cron(expr) => {
					supercheck_cron::CronPlanner::new().next_fire_after(expr, due).ok()
				}
				supercheck_queue::RepeatSchedule::EveryMs(ms) => Some(due + chrono::Duration::milliseconds(*ms)),
			})
			.await
			.unwrap();
		assert_eq!(fired, 0, "a schedule due 5 minutes out shouldn't fire yet");
	}

	#[tokio::test]
	async fn job_scheduler_drops_repeatable_when_job_becomes_unschedulable() {
		let db_pool = supercheck_db::testing::create_test_pool().await;
		let queue_pool = supercheck_queue::testing::create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool.clone()));
		let queue = Queue::new(queue_pool);

		let job_id = seed_job_with_cron(&db_pool, "*/5 * * * *", 1).await;
		let scheduler = JobScheduler::new(Arc::clone(&repo), queue.clone());
		scheduler.reconcile().await.unwrap();

		sqlx::query("UPDATE jobs SET cron_schedule = NULL WHERE id = ?")
			.bind(job_id.to_string())
			.execute(&db_pool)
			.await
			.unwrap();

		scheduler.reconcile().await.unwrap();

		let err = queue.delete_repeatable(&format!("job:{job_id}")).await;
		assert!(err.is_err(), "repeatable should already have been removed by the second reconcile");
	}

	#[tokio::test]
	async fn job_scheduler_processor_creates_run_and_enqueues_execution() {
		let db_pool = supercheck_db::testing::create_test_pool().await;
		let queue_pool = supercheck_queue::testing::create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool.clone()));
		let queue = Queue::new(queue_pool);

		let job_id = seed_job_with_cron(&db_pool, "*/5 * * * *", 3).await;
		let payload = JobSchedulePayload { job_id, test_cases: vec![], retry_limit: 3 };
		let job = fake_job(JOB_SCHEDULER_QUEUE, serde_json::to_value(&payload).unwrap(), 1);

		let processor = JobSchedulerProcessor::new(repo, queue);
		let result = processor.process(&job).await.unwrap();
		assert!(result.get("runId").is_some());
	}

	#[tokio::test]
	async fn job_scheduler_processor_skips_already_running_job() {
		let db_pool = supercheck_db::testing::create_test_pool().await;
		let queue_pool = supercheck_queue::testing::create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool.clone()));
		let queue = Queue::new(queue_pool);

		let job_id = seed_job_with_cron(&db_pool, "*/5 * * * *", 1).await;
		repo.create_run(job_id, supercheck_core::Trigger::Schedule).await.unwrap();

		let payload = JobSchedulePayload { job_id, test_cases: vec![], retry_limit: 1 };
		let job = fake_job(JOB_SCHEDULER_QUEUE, serde_json::to_value(&payload).unwrap(), 1);

		let processor = JobSchedulerProcessor::new(repo, queue);
		let result = processor.process(&job).await.unwrap();
		assert_eq!(result.get("skipped").and_then(|v| v.as_str()), Some("already_running"));
	}

	#[tokio::test]
	async fn monitor_scheduler_upserts_repeatable_for_enabled_monitor() {
		let db_pool = supercheck_db::testing::create_test_pool().await;
		let queue_pool = supercheck_queue::testing::create_test_pool().await;
		let repo = Arc::new(SqliteRepo::new(db_pool.clone()));
		let queue = Queue::new(queue_pool);

		seed_monitor(&db_pool, 60).await;

		let scheduler = MonitorScheduler::new(repo, queue.clone());
		scheduler.reconcile().await.unwrap();

		let fired = queue
			.sweep_repeatables(|_, due| Some(due + chrono::Duration::minutes(60)))
			.await
			.unwrap();
		assert_eq!(fired, 0, "a monitor due 60 minutes out shouldn't fire yet");
	}

	#[tokio::test]
	async fn monitor_scheduler_processor_enqueues_execution_task() {
		let queue_pool = supercheck_queue::testing::create_test_pool().await;
		let queue = Queue::new(queue_pool);
		let monitor_id = Uuid::new_v4();

		let payload = MonitorSchedulePayload {
			monitor_id,
			config: MonitorConfig::HttpRequest(HttpMonitorConfig {
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
			}),
			target: "https://example.test".into(),
		};
		let job = fake_job(MONITOR_SCHEDULER_QUEUE, serde_json::to_value(&payload).unwrap(), 1);

		let processor = MonitorSchedulerProcessor::new(queue);
		let result = processor.process(&job).await.unwrap();
		assert_eq!(result.get("monitorId").and_then(|v| v.as_str()), Some(monitor_id.to_string()).as_deref());
	}
}
