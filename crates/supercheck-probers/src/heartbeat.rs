//! `heartbeat` prober. Unlike the other monitor types this one never
//! reaches out over the network — the monitored system pings
//! `heartbeat_url` itself (ingress handled in the dispatcher crate) and
//! this module only answers "has the deadline passed?" on each
//! scheduled tick.

use chrono::{DateTime, Utc};
use supercheck_core::{HeartbeatMonitorConfig, HeartbeatProbeDetails, MonitorResultDetails, ProbeResult, ProbeStatus};

/// Evaluates whether a heartbeat has been missed as of `now`. Returns
/// `None` when the monitor is still within `expected_interval_minutes +
/// grace_period_minutes` of the last ping (or has never been pinged yet
/// and is still inside its first window) — the scheduler should emit no
/// result in that case rather than recording a synthetic "up".
///
/// Returns `Some(down result)` once the deadline has passed, so the
/// caller records exactly one missed-heartbeat sample per overdue tick.
pub fn evaluate(config: &HeartbeatMonitorConfig, monitor_created_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<ProbeResult> {
	let baseline = config.last_ping_at.unwrap_or(monitor_created_at);
	let deadline = baseline + chrono::Duration::minutes((config.expected_interval_minutes + config.grace_period_minutes) as i64);

	if now < deadline {
		return None;
	}

	Some(ProbeResult {
		status: ProbeStatus::Down,
		is_up: false,
		response_time_ms: None,
		details: MonitorResultDetails::Heartbeat(HeartbeatProbeDetails { check_type: "missed_heartbeat".to_string() }),
		error: Some(format!("no heartbeat received since {baseline}")),
	})
}

/// Builds the `ProbeResult` recorded when an ingress ping arrives on
/// `heartbeat_url` — always `up`, regardless of how late it is, since a
/// late-but-present ping still proves liveness at the moment it landed.
pub fn received() -> ProbeResult {
	ProbeResult {
		status: ProbeStatus::Up,
		is_up: true,
		response_time_ms: None,
		details: MonitorResultDetails::Heartbeat(HeartbeatProbeDetails { check_type: "received".to_string() }),
		error: None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> HeartbeatMonitorConfig {
		HeartbeatMonitorConfig {
			expected_interval_minutes: 5,
			grace_period_minutes: 2,
			heartbeat_url: "https://supercheck.example/hb/abc".to_string(),
			last_ping_at: None,
		}
	}

	#[test]
	fn no_op_inside_grace_window() {
		let created = Utc::now() - chrono::Duration::minutes(3);
		assert!(evaluate(&config(), created, Utc::now()).is_none());
	}

	#[test]
	fn missed_once_deadline_passes() {
		let created = Utc::now() - chrono::Duration::minutes(10);
		let result = evaluate(&config(), created, Utc::now()).expect("should report missed heartbeat");
		assert_eq!(result.status, ProbeStatus::Down);
		assert!(!result.is_up);
	}

	#[test]
	fn last_ping_at_resets_the_baseline() {
		let created = Utc::now() - chrono::Duration::hours(1);
		let mut cfg = config();
		cfg.last_ping_at = Some(Utc::now() - chrono::Duration::minutes(1));
		assert!(evaluate(&cfg, created, Utc::now()).is_none());
	}

	#[test]
	fn received_result_is_always_up() {
		let result = received();
		assert!(result.is_up);
		assert_eq!(result.status, ProbeStatus::Up);
	}
}
