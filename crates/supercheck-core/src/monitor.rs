//! `Monitor`: a recurring health probe and its typed, per-`MonitorType`
//! configuration (§6 config grammar).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::alert::AlertConfig;
use crate::ids::MonitorId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorType {
	HttpRequest,
	Website,
	PingHost,
	PortCheck,
	Heartbeat,
}

impl fmt::Display for MonitorType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::HttpRequest => "http_request",
			Self::Website => "website",
			Self::PingHost => "ping_host",
			Self::PortCheck => "port_check",
			Self::Heartbeat => "heartbeat",
		};
		write!(f, "{s}")
	}
}

impl FromStr for MonitorType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"http_request" => Ok(Self::HttpRequest),
			"website" => Ok(Self::Website),
			"ping_host" => Ok(Self::PingHost),
			"port_check" => Ok(Self::PortCheck),
			"heartbeat" => Ok(Self::Heartbeat),
			other => Err(format!("unknown monitor type: {other}")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
	Pending,
	Up,
	Down,
	Paused,
	Maintenance,
	Error,
}

impl fmt::Display for MonitorStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Pending => "pending",
			Self::Up => "up",
			Self::Down => "down",
			Self::Paused => "paused",
			Self::Maintenance => "maintenance",
			Self::Error => "error",
		};
		write!(f, "{s}")
	}
}

impl FromStr for MonitorStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"up" => Ok(Self::Up),
			"down" => Ok(Self::Down),
			"paused" => Ok(Self::Paused),
			"maintenance" => Ok(Self::Maintenance),
			"error" => Ok(Self::Error),
			other => Err(format!("unknown monitor status: {other}")),
		}
	}
}

impl MonitorStatus {
	/// Whether a transition into `self` from `previous` counts towards
	/// `lastStatusChangeAt` — only `up<->down` transitions count; entering
	/// or leaving `paused`/`maintenance` does not.
	pub fn is_counted_transition(previous: MonitorStatus, next: MonitorStatus) -> bool {
		matches!(
			(previous, next),
			(MonitorStatus::Up, MonitorStatus::Down) | (MonitorStatus::Down, MonitorStatus::Up)
		)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
	Get,
	Post,
	Put,
	Patch,
	Delete,
	Head,
	Options,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
	None,
	Basic,
	Bearer,
}

/// `auth?:{type,username?,password?,token?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
	#[serde(rename = "type")]
	pub auth_type: AuthType,
	pub username: Option<String>,
	pub password: Option<String>,
	pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
	Tcp,
	Udp,
}

/// `http_request` / `website` config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpMonitorConfig {
	#[serde(default = "default_http_method")]
	pub method: HttpMethod,
	pub headers: Option<HashMap<String, String>>,
	pub body: Option<String>,
	/// Grammar: comma-separated codes/ranges, e.g. `"200-299,301"`.
	/// Default when absent: `"200-299"`.
	pub expected_status_codes: Option<String>,
	pub keyword_in_body: Option<String>,
	pub keyword_in_body_should_be_present: Option<bool>,
	pub auth: Option<AuthConfig>,
	pub timeout_seconds: Option<u64>,
	pub enable_ssl_check: Option<bool>,
	pub ssl_days_until_expiration_warning: Option<u32>,
	pub ssl_check_frequency_hours: Option<u32>,
}

fn default_http_method() -> HttpMethod {
	HttpMethod::Get
}

impl HttpMonitorConfig {
	pub fn expected_status_codes_or_default(&self) -> &str {
		self.expected_status_codes.as_deref().unwrap_or("200-299")
	}
}

/// `ping_host` config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PingMonitorConfig {
	pub timeout_seconds: Option<u64>,
}

/// `port_check` config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortMonitorConfig {
	pub port: u16,
	pub protocol: PortProtocol,
	pub timeout_seconds: Option<u64>,
}

/// `heartbeat` config. `heartbeat_url` and `last_ping_at` are
/// system-assigned/system-updated, never set by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatMonitorConfig {
	pub expected_interval_minutes: u32,
	pub grace_period_minutes: u32,
	pub heartbeat_url: String,
	pub last_ping_at: Option<DateTime<Utc>>,
}

/// Typed configuration union, tagged by [`MonitorType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorConfig {
	HttpRequest(HttpMonitorConfig),
	Website(HttpMonitorConfig),
	PingHost(PingMonitorConfig),
	PortCheck(PortMonitorConfig),
	Heartbeat(HeartbeatMonitorConfig),
}

impl MonitorConfig {
	pub fn monitor_type(&self) -> MonitorType {
		match self {
			Self::HttpRequest(_) => MonitorType::HttpRequest,
			Self::Website(_) => MonitorType::Website,
			Self::PingHost(_) => MonitorType::PingHost,
			Self::PortCheck(_) => MonitorType::PortCheck,
			Self::Heartbeat(_) => MonitorType::Heartbeat,
		}
	}
}

/// A recurring health probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
	pub id: MonitorId,
	pub target: String,
	pub frequency_minutes: u32,
	pub enabled: bool,
	pub status: MonitorStatus,
	pub config: MonitorConfig,
	pub last_check_at: Option<DateTime<Utc>>,
	pub last_status_change_at: Option<DateTime<Utc>>,
	pub alert_config: Option<AlertConfig>,
	pub ssl_last_checked_at: Option<DateTime<Utc>>,
	pub last_ping_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Monitor {
	pub fn monitor_type(&self) -> MonitorType {
		self.config.monitor_type()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	proptest! {
		#[test]
		fn monitor_type_roundtrip(ty in prop_oneof![
			Just(MonitorType::HttpRequest),
			Just(MonitorType::Website),
			Just(MonitorType::PingHost),
			Just(MonitorType::PortCheck),
			Just(MonitorType::Heartbeat),
		]) {
			let s = ty.to_string();
			let parsed: MonitorType = s.parse().unwrap();
			prop_assert_eq!(ty, parsed);
		}

		#[test]
		fn monitor_status_roundtrip(status in prop_oneof![
			Just(MonitorStatus::Pending),
			Just(MonitorStatus::Up),
			Just(MonitorStatus::Down),
			Just(MonitorStatus::Paused),
			Just(MonitorStatus::Maintenance),
			Just(MonitorStatus::Error),
		]) {
			let s = status.to_string();
			let parsed: MonitorStatus = s.parse().unwrap();
			prop_assert_eq!(status, parsed);
		}
	}

	#[test]
	fn up_down_transitions_count() {
		assert!(MonitorStatus::is_counted_transition(
			MonitorStatus::Up,
			MonitorStatus::Down
		));
		assert!(MonitorStatus::is_counted_transition(
			MonitorStatus::Down,
			MonitorStatus::Up
		));
	}

	#[test]
	fn paused_and_maintenance_do_not_count() {
		assert!(!MonitorStatus::is_counted_transition(
			MonitorStatus::Up,
			MonitorStatus::Paused
		));
		assert!(!MonitorStatus::is_counted_transition(
			MonitorStatus::Maintenance,
			MonitorStatus::Up
		));
	}

	#[test]
	fn default_expected_status_codes_is_200_to_299() {
		let config = HttpMonitorConfig {
			method: HttpMethod::Get,
			headers: None,
			body: None,
			expected_status_codes: None,
			keyword_in_body: None,
			keyword_in_body_should_be_present: None,
			auth: None,
			timeout_seconds: None,
			enable_ssl_check: None,
			ssl_days_until_expiration_warning: None,
			ssl_check_frequency_hours: None,
		};
		assert_eq!(config.expected_status_codes_or_default(), "200-299");
	}

	#[test]
	fn config_reports_its_own_monitor_type() {
		let config = MonitorConfig::PortCheck(PortMonitorConfig {
			port: 443,
			protocol: PortProtocol::Tcp,
			timeout_seconds: None,
		});
		assert_eq!(config.monitor_type(), MonitorType::PortCheck);
	}
}
