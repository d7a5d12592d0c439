//! Errors surfaced by a janitor sweep.

#[derive(Debug, thiserror::Error)]
pub enum JanitorError {
	#[error("queue error: {0}")]
	Queue(#[from] supercheck_queue::QueueError),

	#[error("database error: {0}")]
	Db(#[from] supercheck_db::DbError),
}

pub type Result<T> = std::result::Result<T, JanitorError>;
