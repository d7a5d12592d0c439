//! Errors surfaced by the queue and its workers.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
	#[error("database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("job not found: {0}")]
	NotFound(uuid::Uuid),

	#[error("repeatable entry not found: {0}")]
	RepeatableNotFound(String),

	/// A job processor returned an error; the worker treats this as
	/// retryable and applies the job's configured backoff.
	#[error("processor failed: {0}")]
	ProcessorFailed(String),
}
