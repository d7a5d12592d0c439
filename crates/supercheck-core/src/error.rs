//! Error taxonomy shared by every layer of the scheduler/monitor core.
//!
//! `User` is a hard,
//! never-retried input error; `Transient` is retried by the originating
//! layer (queue backoff, repo single-retry-then-fatal); a remote probe/run
//! failure is never an `Err` at all — it's a normal status value on
//! `ProbeResult`/`Run`; capacity rejection is a distinguished dispatch
//! outcome, not an error; `Fatal` is logged and leaves the entity in
//! `status=error` without taking the process down.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SupercheckError>;

#[derive(Debug, Error)]
pub enum SupercheckError {
	/// Invalid input that must never be retried: bad cron expression, bad
	/// timezone, malformed slug, duplicate idempotency key, etc.
	#[error("invalid input: {0}")]
	User(String),

	/// A transient failure in an I/O-bound dependency (database, queue
	/// backing store) that the caller's retry policy should handle.
	#[error("transient failure: {0}")]
	Transient(String),

	/// `createRun` lost the at-most-one-running race for a job.
	#[error("job already has a running run")]
	ConcurrentRun,

	/// A referenced entity does not exist.
	#[error("{0} not found")]
	NotFound(&'static str),

	/// Serialization of a `config`/`details` JSON payload failed.
	#[error("serialization error: {0}")]
	Serialization(#[from] serde_json::Error),

	/// Unexpected internal condition; logged at `error` level by the
	/// caller and left in a terminal `status=error`, without crashing the
	/// owning worker's supervisor loop.
	#[error("internal error: {0}")]
	Fatal(String),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_errors_are_distinguishable_from_transient() {
		let user = SupercheckError::User("bad cron expression".into());
		let transient = SupercheckError::Transient("pool exhausted".into());
		assert!(matches!(user, SupercheckError::User(_)));
		assert!(matches!(transient, SupercheckError::Transient(_)));
	}

	#[test]
	fn concurrent_run_has_no_payload() {
		let err = SupercheckError::ConcurrentRun;
		assert_eq!(err.to_string(), "job already has a running run");
	}
}
