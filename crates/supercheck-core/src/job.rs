//! `Job` and `TestScript`: a named bundle of browser/API test scripts run on
//! a cron schedule or on demand.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::alert::AlertConfig;
use crate::ids::{JobId, TestScriptId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Pending,
	Running,
	Passed,
	Failed,
	Error,
}

impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Pending => "pending",
			Self::Running => "running",
			Self::Passed => "passed",
			Self::Failed => "failed",
			Self::Error => "error",
		};
		write!(f, "{s}")
	}
}

impl FromStr for JobStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"running" => Ok(Self::Running),
			"passed" => Ok(Self::Passed),
			"failed" => Ok(Self::Failed),
			"error" => Ok(Self::Error),
			other => Err(format!("unknown job status: {other}")),
		}
	}
}

/// One script belonging to a Job, run in `order_position` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestScript {
	pub id: TestScriptId,
	pub job_id: JobId,
	pub name: String,
	/// Opaque test-script text; the executor subprocess interprets it.
	pub script: String,
	pub order_position: u32,
}

/// A scheduled (or manually triggered) bundle of test scripts.
///
/// Invariant: at most one [`crate::run::Run`] for this job may be `running`
/// at a time, enforced by `Repo::createRun`'s `ConcurrentRun` guard, not by
/// this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
	pub id: JobId,
	pub name: String,
	/// 5- or 6-field cron expression. `None` means the job is only
	/// manually triggerable.
	pub cron_schedule: Option<String>,
	pub status: JobStatus,
	pub last_run_at: Option<DateTime<Utc>>,
	pub next_run_at: Option<DateTime<Utc>>,
	pub alert_config: Option<AlertConfig>,
	pub retry_limit: u32,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Job {
	/// A job is runnable iff it has a (parseable) cron schedule, or is
	/// triggered explicitly by an operator — this only reports the
	/// schedule half of that condition.
	pub fn has_schedule(&self) -> bool {
		self.cron_schedule.is_some()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn job_status_roundtrip(status in prop_oneof![
			Just(JobStatus::Pending),
			Just(JobStatus::Running),
			Just(JobStatus::Passed),
			Just(JobStatus::Failed),
			Just(JobStatus::Error),
		]) {
			let s = status.to_string();
			let parsed: JobStatus = s.parse().unwrap();
			prop_assert_eq!(status, parsed);
		}
	}

	#[test]
	fn job_without_cron_is_not_schedulable() {
		let job = Job {
			id: JobId::new(),
			name: "manual-only".into(),
			cron_schedule: None,
			status: JobStatus::Pending,
			last_run_at: None,
			next_run_at: None,
			alert_config: None,
			retry_limit: 0,
			created_at: Utc::now(),
			updated_at: Utc::now(),
		};
		assert!(!job.has_schedule());
	}
}
