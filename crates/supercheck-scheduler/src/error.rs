//! Errors surfaced while reconciling jobs/monitors into repeatable queue
//! entries, or while a repeatable entry's processor re-reads entity state.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, Error)]
pub enum SchedulerError {
	#[error(transparent)]
	Db(#[from] supercheck_db::DbError),

	#[error(transparent)]
	Queue(#[from] supercheck_queue::QueueError),

	#[error(transparent)]
	Cron(#[from] supercheck_cron::CronError),

	#[error(transparent)]
	Serialization(#[from] serde_json::Error),
}
