//! Embedded schema, applied at startup with `CREATE TABLE IF NOT EXISTS` so
//! a fresh database and an already-migrated one both converge to the same
//! shape without a separate migration-version table.

use sqlx::SqlitePool;

use crate::error::Result;

/// The domain schema backing jobs, monitors, runs, and alert history.
///
/// The partial unique index on `runs` is what makes `createRun`'s
/// at-most-one-running-per-job guard atomic: a second concurrent insert for
/// the same `job_id` while one is already `status='running'` fails the
/// SQLite constraint instead of racing a select-then-insert.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    cron_schedule TEXT,
    status TEXT NOT NULL,
    last_run_at TEXT,
    next_run_at TEXT,
    alert_config_json TEXT,
    retry_limit INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS test_scripts (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    script TEXT NOT NULL,
    order_position INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_test_scripts_job_id ON test_scripts(job_id, order_position);

CREATE TABLE IF NOT EXISTS runs (
    id TEXT PRIMARY KEY,
    job_id TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    duration_sec INTEGER,
    trigger TEXT NOT NULL,
    error_details TEXT,
    report_url TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_runs_job_id ON runs(job_id, started_at DESC);

CREATE UNIQUE INDEX IF NOT EXISTS idx_runs_one_running_per_job
    ON runs(job_id) WHERE status = 'running';

CREATE TABLE IF NOT EXISTS monitors (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    target TEXT NOT NULL,
    frequency_minutes INTEGER NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL,
    config_json TEXT NOT NULL,
    last_check_at TEXT,
    last_status_change_at TEXT,
    alert_config_json TEXT,
    ssl_last_checked_at TEXT,
    last_ping_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_monitors_enabled ON monitors(enabled);

CREATE TABLE IF NOT EXISTS monitor_results (
    id TEXT PRIMARY KEY,
    monitor_id TEXT NOT NULL REFERENCES monitors(id) ON DELETE CASCADE,
    checked_at TEXT NOT NULL,
    status TEXT NOT NULL,
    response_time_ms INTEGER,
    details_json TEXT NOT NULL,
    is_up INTEGER NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_monitor_results_monitor_id
    ON monitor_results(monitor_id, checked_at DESC);

CREATE TABLE IF NOT EXISTS notification_providers (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    config_json TEXT NOT NULL,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS alert_history (
    id TEXT PRIMARY KEY,
    type TEXT NOT NULL,
    target_kind TEXT NOT NULL,
    target_id TEXT NOT NULL,
    message TEXT NOT NULL,
    providers_json TEXT NOT NULL,
    status TEXT NOT NULL,
    error_message TEXT,
    sent_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_alert_history_target_kind_type
    ON alert_history(target_id, type, sent_at DESC);

CREATE TABLE IF NOT EXISTS reports (
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    status TEXT NOT NULL,
    artifact_url TEXT,
    artifact_path TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (entity_type, entity_id)
);
"#;

#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!("schema migrations applied");
	Ok(())
}
