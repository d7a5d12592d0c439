//! In-memory SQLite pool helper for integration tests.

use sqlx::sqlite::SqlitePool;

use crate::migrations::run_migrations;

pub async fn create_test_pool() -> SqlitePool {
	let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
	run_migrations(&pool).await.unwrap();
	pool
}
