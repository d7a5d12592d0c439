//! Embedded schema for queue persistence, applied with `CREATE TABLE IF NOT
//! EXISTS` so it composes with whatever other schema shares the pool.

use sqlx::SqlitePool;

use crate::error::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS queue_jobs (
    id TEXT PRIMARY KEY,
    queue_name TEXT NOT NULL,
    job_key TEXT,
    payload_json TEXT NOT NULL,
    state TEXT NOT NULL,
    attempts_made INTEGER NOT NULL DEFAULT 0,
    max_attempts INTEGER NOT NULL DEFAULT 1,
    backoff_kind TEXT NOT NULL,
    backoff_base_ms INTEGER NOT NULL,
    run_at TEXT NOT NULL,
    remove_on_complete_count INTEGER NOT NULL,
    remove_on_complete_age_sec INTEGER NOT NULL,
    remove_on_fail_count INTEGER NOT NULL,
    remove_on_fail_age_sec INTEGER NOT NULL,
    result_json TEXT,
    failed_reason TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queue_jobs_poll
    ON queue_jobs(queue_name, state, run_at);

CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_jobs_idempotency
    ON queue_jobs(queue_name, job_key)
    WHERE job_key IS NOT NULL AND state IN ('waiting', 'active');

CREATE TABLE IF NOT EXISTS queue_repeatables (
    key TEXT PRIMARY KEY,
    queue_name TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    cron TEXT,
    every_ms INTEGER,
    next_run_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queue_repeatables_due
    ON queue_repeatables(queue_name, next_run_at);
"#;

#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
	for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
		sqlx::query(statement).execute(pool).await?;
	}
	tracing::debug!("queue schema migrations applied");
	Ok(())
}
