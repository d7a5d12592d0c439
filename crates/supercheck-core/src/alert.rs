//! Alert configuration shared by Jobs and Monitors, and the `AlertHistory`
//! audit trail the alert engine appends to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ids::{AlertId, ProviderId};

/// Per-entity alert policy, embedded on `Job` and `Monitor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default)]
	pub provider_ids: Vec<ProviderId>,
	#[serde(default)]
	pub alert_on_failure: bool,
	#[serde(default)]
	pub alert_on_recovery: bool,
	#[serde(default)]
	pub alert_on_success: bool,
	#[serde(default)]
	pub alert_on_timeout: bool,
	#[serde(default)]
	pub alert_on_ssl_expiration: bool,
	/// Consecutive failing results required before a `monitor_failure`/
	/// `job_failure` alert fires.
	#[serde(default = "default_threshold")]
	pub failure_threshold: u32,
	/// Consecutive passing results required before a recovery alert fires.
	#[serde(default = "default_threshold")]
	pub recovery_threshold: u32,
	pub ssl_days_until_expiration_warning: Option<u32>,
	pub custom_message: Option<String>,
}

fn default_threshold() -> u32 {
	1
}

impl Default for AlertConfig {
	fn default() -> Self {
		Self {
			enabled: false,
			provider_ids: Vec::new(),
			alert_on_failure: false,
			alert_on_recovery: false,
			alert_on_success: false,
			alert_on_timeout: false,
			alert_on_ssl_expiration: false,
			failure_threshold: default_threshold(),
			recovery_threshold: default_threshold(),
			ssl_days_until_expiration_warning: None,
			custom_message: None,
		}
	}
}

/// Which kind of event an `AlertHistory` row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
	JobSuccess,
	JobFailure,
	JobTimeout,
	MonitorFailure,
	MonitorRecovery,
	SslExpiring,
	SslExpired,
}

impl fmt::Display for AlertKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::JobSuccess => "job_success",
			Self::JobFailure => "job_failure",
			Self::JobTimeout => "job_timeout",
			Self::MonitorFailure => "monitor_failure",
			Self::MonitorRecovery => "monitor_recovery",
			Self::SslExpiring => "ssl_expiring",
			Self::SslExpired => "ssl_expired",
		};
		write!(f, "{s}")
	}
}

impl FromStr for AlertKind {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"job_success" => Ok(Self::JobSuccess),
			"job_failure" => Ok(Self::JobFailure),
			"job_timeout" => Ok(Self::JobTimeout),
			"monitor_failure" => Ok(Self::MonitorFailure),
			"monitor_recovery" => Ok(Self::MonitorRecovery),
			"ssl_expiring" => Ok(Self::SslExpiring),
			"ssl_expired" => Ok(Self::SslExpired),
			other => Err(format!("unknown alert kind: {other}")),
		}
	}
}

impl AlertKind {
	/// `error=#ef4444`, `warning=#f59e0b`, `success=#22c55e`, `info=#3b82f6`.
	pub fn severity(&self) -> Severity {
		match self {
			Self::JobFailure | Self::JobTimeout | Self::MonitorFailure | Self::SslExpired => {
				Severity::Error
			}
			Self::SslExpiring => Severity::Warning,
			Self::JobSuccess | Self::MonitorRecovery => Severity::Success,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
	Info,
	Warning,
	Error,
	Success,
}

impl Severity {
	pub fn color_hex(&self) -> &'static str {
		match self {
			Self::Info => "#3b82f6",
			Self::Warning => "#f59e0b",
			Self::Error => "#ef4444",
			Self::Success => "#22c55e",
		}
	}
}

/// Whether an `AlertHistory` row concerns a Job or a Monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
	Monitor,
	Job,
}

impl fmt::Display for TargetKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Monitor => write!(f, "monitor"),
			Self::Job => write!(f, "job"),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
	Sent,
	Failed,
	Pending,
}

/// An append-only audit row recording one alert-engine decision and its
/// fan-out outcome. Inserted only after the corresponding Run/MonitorResult
/// terminal write is committed (§6 ordering guarantee), so the audit trail
/// never outpaces the state it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertHistory {
	pub id: AlertId,
	pub kind: AlertKind,
	pub target_kind: TargetKind,
	pub target_id: Uuid,
	pub message: String,
	pub providers: Vec<ProviderId>,
	pub status: AlertStatus,
	pub error_message: Option<String>,
	pub sent_at: DateTime<Utc>,
}
