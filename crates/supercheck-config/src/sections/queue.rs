//! Durable queue configuration (`spec.md` §4.2).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QueueConfigLayer {
	pub poll_interval_ms: Option<u64>,
	pub job_execution_concurrency: Option<u32>,
	pub monitor_execution_concurrency: Option<u32>,
}

impl QueueConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.poll_interval_ms.is_some() {
			self.poll_interval_ms = other.poll_interval_ms;
		}
		if other.job_execution_concurrency.is_some() {
			self.job_execution_concurrency = other.job_execution_concurrency;
		}
		if other.monitor_execution_concurrency.is_some() {
			self.monitor_execution_concurrency = other.monitor_execution_concurrency;
		}
	}

	pub fn finalize(self) -> QueueConfig {
		QueueConfig {
			poll_interval_ms: self.poll_interval_ms.unwrap_or(1_000),
			// Browser tests are heavy; default to 1 per spec.md §5.
			job_execution_concurrency: self.job_execution_concurrency.unwrap_or(1),
			monitor_execution_concurrency: self.monitor_execution_concurrency.unwrap_or(8),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueConfig {
	pub poll_interval_ms: u64,
	pub job_execution_concurrency: u32,
	pub monitor_execution_concurrency: u32,
}

impl Default for QueueConfig {
	fn default() -> Self {
		Self {
			poll_interval_ms: 1_000,
			job_execution_concurrency: 1,
			monitor_execution_concurrency: 8,
		}
	}
}
