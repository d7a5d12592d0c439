//! `MonitorResult`: one availability sample, and the per-prober detail
//! payloads that populate its `details` JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::{MonitorId, MonitorResultId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
	Up,
	Down,
	Error,
	Timeout,
}

impl ProbeStatus {
	pub fn is_up(&self) -> bool {
		matches!(self, Self::Up)
	}
}

impl fmt::Display for ProbeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Up => "up",
			Self::Down => "down",
			Self::Error => "error",
			Self::Timeout => "timeout",
		};
		write!(f, "{s}")
	}
}

impl FromStr for ProbeStatus {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"up" => Ok(Self::Up),
			"down" => Ok(Self::Down),
			"error" => Ok(Self::Error),
			"timeout" => Ok(Self::Timeout),
			other => Err(format!("unknown probe status: {other}")),
		}
	}
}

/// Summary of the negotiated leaf certificate, embedded in
/// [`HttpProbeDetails::ssl_certificate`] when `enableSslCheck` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SslCertificateSummary {
	pub valid_from: DateTime<Utc>,
	pub valid_to: DateTime<Utc>,
	pub issuer_cn: Option<String>,
	pub subject_cn: Option<String>,
	pub serial_number: String,
	pub fingerprint_sha256: String,
	pub days_remaining: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpProbeDetails {
	pub status_code: Option<u16>,
	pub response_time_ms: u64,
	pub keyword_matched: Option<bool>,
	pub ssl_certificate: Option<SslCertificateSummary>,
	/// Set (to a human-readable message) when the cert is within the
	/// configured expiration warning window.
	pub ssl_warning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingProbeDetails {
	pub rtt_ms: Option<f64>,
	pub packets_sent: u32,
	pub packets_received: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortProbeDetails {
	pub protocol: String,
	pub connected: bool,
	pub connect_time_ms: Option<u64>,
}

/// `checkType` is `missed_heartbeat` when the janitor/sweep inserts a
/// missed-beat `down` row, or `received` for a normal ingress ping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatProbeDetails {
	pub check_type: String,
}

/// Free-form, typed-per-prober detail payload stored as `details_json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MonitorResultDetails {
	Http(HttpProbeDetails),
	Ping(PingProbeDetails),
	Port(PortProbeDetails),
	Heartbeat(HeartbeatProbeDetails),
}

/// The normalized outcome every prober returns across the dispatcher
/// boundary — never an `Err`; even a library-level failure becomes
/// `status=error` here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
	pub status: ProbeStatus,
	pub is_up: bool,
	pub response_time_ms: Option<u64>,
	pub details: MonitorResultDetails,
	pub error: Option<String>,
}

/// A single availability sample persisted for a monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorResult {
	pub id: MonitorResultId,
	pub monitor_id: MonitorId,
	pub checked_at: DateTime<Utc>,
	pub status: ProbeStatus,
	pub response_time_ms: Option<u64>,
	pub details: MonitorResultDetails,
	pub is_up: bool,
	/// Derived, not stored: true iff `is_up` differs from the immediately
	/// preceding result for the same monitor.
	pub is_status_change: bool,
	pub created_at: DateTime<Utc>,
}
