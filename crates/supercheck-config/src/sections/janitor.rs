//! Janitor sweep configuration (`spec.md` §2.12, §5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct JanitorConfigLayer {
	pub interval_hours: Option<u64>,
	pub job_data_ttl_days: Option<i64>,
	pub event_stream_ttl_hours: Option<i64>,
	pub metrics_ttl_hours: Option<i64>,
}

impl JanitorConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.interval_hours.is_some() {
			self.interval_hours = other.interval_hours;
		}
		if other.job_data_ttl_days.is_some() {
			self.job_data_ttl_days = other.job_data_ttl_days;
		}
		if other.event_stream_ttl_hours.is_some() {
			self.event_stream_ttl_hours = other.event_stream_ttl_hours;
		}
		if other.metrics_ttl_hours.is_some() {
			self.metrics_ttl_hours = other.metrics_ttl_hours;
		}
	}

	pub fn finalize(self) -> JanitorConfig {
		JanitorConfig {
			interval_hours: self.interval_hours.unwrap_or(12),
			job_data_ttl_days: self.job_data_ttl_days.unwrap_or(7),
			event_stream_ttl_hours: self.event_stream_ttl_hours.unwrap_or(24),
			metrics_ttl_hours: self.metrics_ttl_hours.unwrap_or(48),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JanitorConfig {
	pub interval_hours: u64,
	pub job_data_ttl_days: i64,
	pub event_stream_ttl_hours: i64,
	pub metrics_ttl_hours: i64,
}

impl Default for JanitorConfig {
	fn default() -> Self {
		Self {
			interval_hours: 12,
			job_data_ttl_days: 7,
			event_stream_ttl_hours: 24,
			metrics_ttl_hours: 48,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_spec() {
		let config = JanitorConfigLayer::default().finalize();
		assert_eq!(config.interval_hours, 12);
		assert_eq!(config.job_data_ttl_days, 7);
		assert_eq!(config.event_stream_ttl_hours, 24);
		assert_eq!(config.metrics_ttl_hours, 48);
	}
}
