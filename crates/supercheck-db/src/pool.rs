//! SQLite connection pool construction.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqliteSynchronous};

use crate::error::{DbError, Result};
use crate::migrations::run_migrations;

/// Create a `SqlitePool` in WAL mode and apply the domain schema.
///
/// `database_url` is a `sqlite:` connection string, e.g.
/// `sqlite:./supercheck.db`.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::Internal(format!("invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await?;
	run_migrations(&pool).await?;

	tracing::debug!("database pool created");
	Ok(pool)
}
