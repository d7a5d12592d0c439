//! Errors from cron expression parsing.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CronError>;

/// A cron parsing failure is always a hard user error — surfaced to the API
/// layer, never retried.
#[derive(Debug, Error)]
pub enum CronError {
	#[error("invalid cron expression '{0}': {1}")]
	InvalidExpression(String, String),

	#[error("no next run time found for cron expression '{0}'")]
	NoNextRun(String),
}
