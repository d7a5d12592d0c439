use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a queued job, distinct from the caller's idempotency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueJobId(pub Uuid);

impl QueueJobId {
	pub fn new() -> Self {
		Self(Uuid::new_v4())
	}
}

impl Default for QueueJobId {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Display for QueueJobId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
	Fixed,
	Exponential,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Backoff {
	pub kind: BackoffKind,
	pub base_delay_ms: i64,
}

impl Backoff {
	pub fn fixed(base_delay_ms: i64) -> Self {
		Self { kind: BackoffKind::Fixed, base_delay_ms }
	}

	pub fn exponential(base_delay_ms: i64) -> Self {
		Self { kind: BackoffKind::Exponential, base_delay_ms }
	}

	/// Delay before the `attempt`-th retry (1-indexed).
	pub fn delay_ms(&self, attempt: u32) -> i64 {
		match self.kind {
			BackoffKind::Fixed => self.base_delay_ms,
			BackoffKind::Exponential => {
				let factor = 2f64.powi(attempt as i32 - 1);
				(self.base_delay_ms as f64 * factor) as i64
			}
		}
	}
}

/// Retention policy for terminal jobs, enforced by the queue itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetentionPolicy {
	pub count: u32,
	pub age_seconds: i64,
}

impl RetentionPolicy {
	/// Default for completed jobs: keep at least 24h, capped at 1,000 rows.
	pub fn completed_default() -> Self {
		Self { count: 1_000, age_seconds: 24 * 3_600 }
	}

	/// Default for failed jobs: keep at least 7 days, capped at 5,000 rows.
	pub fn failed_default() -> Self {
		Self { count: 5_000, age_seconds: 7 * 24 * 3_600 }
	}
}

#[derive(Debug, Clone)]
pub struct EnqueueOptions {
	/// Idempotency key: a second `enqueue` with the same `(queue, job_id)`
	/// pair is silently rejected rather than erroring.
	pub job_id: Option<String>,
	pub delay_ms: i64,
	pub attempts: u32,
	pub backoff: Backoff,
	pub remove_on_complete: RetentionPolicy,
	pub remove_on_fail: RetentionPolicy,
}

impl Default for EnqueueOptions {
	fn default() -> Self {
		Self {
			job_id: None,
			delay_ms: 0,
			attempts: 1,
			backoff: Backoff::fixed(0),
			remove_on_complete: RetentionPolicy::completed_default(),
			remove_on_fail: RetentionPolicy::failed_default(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
	Waiting,
	Active,
	Completed,
	Failed,
}

impl JobState {
	pub fn as_str(&self) -> &'static str {
		match self {
			JobState::Waiting => "waiting",
			JobState::Active => "active",
			JobState::Completed => "completed",
			JobState::Failed => "failed",
		}
	}
}

impl std::str::FromStr for JobState {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"waiting" => Ok(JobState::Waiting),
			"active" => Ok(JobState::Active),
			"completed" => Ok(JobState::Completed),
			"failed" => Ok(JobState::Failed),
			other => Err(format!("unknown job state '{other}'")),
		}
	}
}

/// One row of a queue: a unit of work with its retry bookkeeping.
#[derive(Debug, Clone)]
pub struct QueueJob {
	pub id: QueueJobId,
	pub queue_name: String,
	pub job_key: Option<String>,
	pub payload: serde_json::Value,
	pub state: JobState,
	pub attempts_made: u32,
	pub max_attempts: u32,
	pub backoff: Backoff,
	pub run_at: DateTime<Utc>,
	pub remove_on_complete: RetentionPolicy,
	pub remove_on_fail: RetentionPolicy,
	pub result: Option<serde_json::Value>,
	pub failed_reason: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// A repeatable schedule: either a cron expression or a fixed interval.
#[derive(Debug, Clone)]
pub enum RepeatSchedule {
	Cron(String),
	EveryMs(i64),
}

#[derive(Debug, Clone)]
pub struct RepeatableSpec {
	pub key: String,
	pub schedule: RepeatSchedule,
}

/// Events a consumer may subscribe to for a queue's lifecycle.
#[derive(Debug, Clone)]
pub enum QueueEvent {
	Waiting { queue: String, job_id: QueueJobId },
	Active { queue: String, job_id: QueueJobId },
	Completed { queue: String, job_id: QueueJobId, result: serde_json::Value },
	Failed { queue: String, job_id: QueueJobId, reason: String },
}
