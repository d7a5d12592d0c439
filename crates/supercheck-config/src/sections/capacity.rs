//! Admission-control configuration (`spec.md` §4.4).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CapacityConfigLayer {
	pub running: Option<u32>,
	pub queued: Option<u32>,
}

impl CapacityConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.running.is_some() {
			self.running = other.running;
		}
		if other.queued.is_some() {
			self.queued = other.queued;
		}
	}

	pub fn finalize(self) -> CapacityConfig {
		CapacityConfig {
			running: self.running.unwrap_or(5),
			queued: self.queued.unwrap_or(10),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CapacityConfig {
	/// Global cap on concurrently `active` entries across the two
	/// execution queues (`runningCapacity` in `spec.md` §4.4).
	pub running: u32,
	/// Cap enforced at the enqueue boundary (`queuedCapacity`).
	pub queued: u32,
}

impl Default for CapacityConfig {
	fn default() -> Self {
		Self {
			running: 5,
			queued: 10,
		}
	}
}
