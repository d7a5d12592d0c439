//! `Run`: one execution of a [`crate::job::Job`]'s test scripts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{JobId, RunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
	Running,
	Passed,
	Failed,
	Error,
	Timeout,
}

impl RunStatus {
	/// `completedAt` is set iff the run is in a terminal status.
	pub fn is_terminal(&self) -> bool {
		!matches!(self, Self::Running)
	}
}

impl fmt::Display for RunStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Running => "running",
			Self::Passed => "passed",
			Self::Failed => "failed",
			Self::Error => "error",
			Self::Timeout => "timeout",
		};
		write!(f, "{s}")
	}
}

impl FromStr for RunStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"running" => Ok(Self::Running),
			"passed" => Ok(Self::Passed),
			"failed" => Ok(Self::Failed),
			"error" => Ok(Self::Error),
			"timeout" => Ok(Self::Timeout),
			other => Err(format!("unknown run status: {other}")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
	Schedule,
	Manual,
}

impl fmt::Display for Trigger {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Schedule => write!(f, "schedule"),
			Self::Manual => write!(f, "manual"),
		}
	}
}

impl FromStr for Trigger {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"schedule" => Ok(Self::Schedule),
			"manual" => Ok(Self::Manual),
			other => Err(format!("unknown trigger: {other}")),
		}
	}
}

/// Artifact location for a completed run, once the out-of-scope object
/// store has accepted the executor's report directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunArtifact {
	pub report_url: Option<String>,
}

/// One execution of a Job's test scripts.
///
/// Created only by `JobDispatcher` when it accepts an execution task; its
/// terminal state is written exactly once, by that same task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
	pub id: RunId,
	pub job_id: JobId,
	pub status: RunStatus,
	pub started_at: DateTime<Utc>,
	pub completed_at: Option<DateTime<Utc>>,
	/// Integer seconds; `completed_at - started_at` when set.
	pub duration_sec: Option<i64>,
	pub trigger: Trigger,
	pub error_details: Option<String>,
	pub artifact: RunArtifact,
	pub created_at: DateTime<Utc>,
}

impl Run {
	/// Whether `completed_at`/`duration_sec` are consistent with `status`.
	pub fn invariant_holds(&self) -> bool {
		let terminal = self.status.is_terminal();
		let has_completion = self.completed_at.is_some();
		if terminal != has_completion {
			return false;
		}
		if let (Some(completed), Some(duration)) = (self.completed_at, self.duration_sec) {
			return duration == (completed - self.started_at).num_seconds();
		}
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::Duration;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn run_status_roundtrip(status in prop_oneof![
			Just(RunStatus::Running),
			Just(RunStatus::Passed),
			Just(RunStatus::Failed),
			Just(RunStatus::Error),
			Just(RunStatus::Timeout),
		]) {
			let s = status.to_string();
			let parsed: RunStatus = s.parse().unwrap();
			prop_assert_eq!(status, parsed);
		}
	}

	fn base_run(status: RunStatus) -> Run {
		let started = Utc::now();
		Run {
			id: RunId::new(),
			job_id: JobId::new(),
			status,
			started_at: started,
			completed_at: None,
			duration_sec: None,
			trigger: Trigger::Schedule,
			error_details: None,
			artifact: RunArtifact::default(),
			created_at: started,
		}
	}

	#[test]
	fn running_run_without_completion_satisfies_invariant() {
		assert!(base_run(RunStatus::Running).invariant_holds());
	}

	#[test]
	fn terminal_run_requires_completed_at() {
		assert!(!base_run(RunStatus::Passed).invariant_holds());
	}

	#[test]
	fn trigger_roundtrip() {
		for trigger in [Trigger::Schedule, Trigger::Manual] {
			let parsed: Trigger = trigger.to_string().parse().unwrap();
			assert_eq!(trigger, parsed);
		}
	}

	#[test]
	fn terminal_run_with_matching_duration_satisfies_invariant() {
		let mut run = base_run(RunStatus::Passed);
		run.completed_at = Some(run.started_at + Duration::seconds(12));
		run.duration_sec = Some(12);
		assert!(run.invariant_holds());
	}
}
