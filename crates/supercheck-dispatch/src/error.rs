//! Error taxonomy for the dispatch crate. A failed probe, a failed test
//! run, or a capacity rejection are never represented here — those are
//! ordinary status values on `Run`/`MonitorResult`/the requeue marker, per
//! `supercheck_core::SupercheckError`'s doc comment.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
	#[error("db error: {0}")]
	Db(#[from] supercheck_db::DbError),

	#[error("queue error: {0}")]
	Queue(#[from] supercheck_queue::QueueError),

	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	#[error("io error: {0}")]
	Io(#[from] std::io::Error),

	#[error("dispatch internal error: {0}")]
	Internal(String),
}
