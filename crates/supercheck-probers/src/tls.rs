//! Certificate-expiry checking for `website`-type monitors with
//! `enableSslCheck` set. Connects directly over `tokio-rustls` (bypassing
//! `reqwest`, which never exposes the negotiated peer certificate chain),
//! then reads the leaf certificate's validity window with [`x509_min`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rustls::RootCertStore;
use rustls::pki_types::ServerName;
use supercheck_core::SslCertificateSummary;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;

use crate::x509_min;

#[derive(Debug, Clone)]
pub enum TlsCheckResult {
	/// Certificate is within its validity window. `warning` is set when
	/// `days_remaining` is at or below the configured threshold.
	Ok { certificate: SslCertificateSummary, warning: Option<String> },
	/// `now > validTo`: the certificate has expired.
	Expired { certificate: SslCertificateSummary },
	/// `now < validFrom`: the certificate is not yet valid.
	NotYetValid { certificate: SslCertificateSummary },
	/// TCP connect, TLS handshake, or certificate parsing failed outright.
	Failed { error: String, timed_out: bool },
}

/// Opens a TLS connection to `host:port` and evaluates the leaf
/// certificate's validity window against `warn_days`.
pub async fn check(host: &str, port: u16, timeout: Duration, warn_days: u32) -> TlsCheckResult {
	match tokio::time::timeout(timeout, connect_and_read_leaf(host, port)).await {
		Ok(Ok(der)) => evaluate(der, warn_days),
		Ok(Err(e)) => TlsCheckResult::Failed { error: e, timed_out: false },
		Err(_) => TlsCheckResult::Failed { error: format!("TLS check timed out after {timeout:?}"), timed_out: true },
	}
}

fn evaluate(der: Vec<u8>, warn_days: u32) -> TlsCheckResult {
	let summary = match x509_min::parse_certificate(&der) {
		Ok(s) => s,
		Err(e) => return TlsCheckResult::Failed { error: e.to_string(), timed_out: false },
	};

	let now = Utc::now();
	let days_remaining = (summary.valid_to - now).num_days();
	let certificate = to_core_summary(&summary, days_remaining);

	if now < summary.valid_from {
		return TlsCheckResult::NotYetValid { certificate };
	}
	if now > summary.valid_to {
		return TlsCheckResult::Expired { certificate };
	}

	let warning = if days_remaining <= warn_days as i64 {
		Some(format!("certificate expires in {days_remaining} day(s)"))
	} else {
		None
	};

	TlsCheckResult::Ok { certificate, warning }
}

fn to_core_summary(summary: &x509_min::CertSummary, days_remaining: i64) -> SslCertificateSummary {
	SslCertificateSummary {
		valid_from: summary.valid_from,
		valid_to: summary.valid_to,
		issuer_cn: summary.issuer_cn.clone(),
		subject_cn: summary.subject_cn.clone(),
		serial_number: summary.serial_number.clone(),
		fingerprint_sha256: summary.fingerprint_sha256.clone(),
		days_remaining,
	}
}

async fn connect_and_read_leaf(host: &str, port: u16) -> Result<Vec<u8>, String> {
	let root_store = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
	let tls_config = rustls::ClientConfig::builder().with_root_certificates(root_store).with_no_client_auth();
	let connector = TlsConnector::from(Arc::new(tls_config));

	let tcp_stream = TcpStream::connect((host, port)).await.map_err(|e| classify_io_error(&e))?;

	let server_name = ServerName::try_from(host.to_string()).map_err(|e| format!("invalid server name {host}: {e}"))?;

	let tls_stream = connector.connect(server_name, tcp_stream).await.map_err(|e| format!("TLS handshake failed: {e}"))?;

	let (_, connection) = tls_stream.get_ref();
	let leaf = connection
		.peer_certificates()
		.and_then(|certs| certs.first())
		.ok_or_else(|| "server presented no certificates".to_string())?;

	Ok(leaf.as_ref().to_vec())
}

/// Maps well-known connect-time failures to the same vocabulary platform
/// HTTP clients surface (`ECONNREFUSED`, `EHOSTUNREACH`, DNS `NOTFOUND`),
/// so callers can fold TLS failures into the same "down" bucket.
fn classify_io_error(e: &std::io::Error) -> String {
	use std::io::ErrorKind::*;
	match e.kind() {
		ConnectionRefused => "ECONNREFUSED: connection refused".to_string(),
		TimedOut => "ETIMEDOUT: connection timed out".to_string(),
		NotFound | AddrNotAvailable => "NOTFOUND: host not found".to_string(),
		_ => format!("connect failed: {e}"),
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
	Up,
	Down,
	Error,
	Timeout,
}

/// Maps a [`TlsCheckResult`] to the probe-level status vocabulary used by
/// `HttpProber`: an expired or unreachable certificate brings the monitor
/// down, a not-yet-valid certificate is a configuration error, and a
/// warning-threshold breach still reports `up`.
pub fn display_status(result: &TlsCheckResult) -> DisplayStatus {
	match result {
		TlsCheckResult::Ok { .. } => DisplayStatus::Up,
		TlsCheckResult::Expired { .. } => DisplayStatus::Down,
		TlsCheckResult::NotYetValid { .. } => DisplayStatus::Error,
		TlsCheckResult::Failed { timed_out: true, .. } => DisplayStatus::Timeout,
		TlsCheckResult::Failed { timed_out: false, .. } => DisplayStatus::Down,
	}
}

/// Tiered SSL re-check cadence: a healthy, far-from-expiry certificate is
/// re-checked on `frequency_hours`; once within the warning window checks
/// fall back to once per hour so expiry is never missed by more than that.
pub fn should_perform_ssl_check(
	last_checked_at: Option<DateTime<Utc>>,
	frequency_hours: u32,
	days_remaining_at_last_check: Option<i64>,
	warn_days: u32,
	now: DateTime<Utc>,
) -> bool {
	let Some(last) = last_checked_at else {
		return true;
	};

	let effective_frequency_hours = match days_remaining_at_last_check {
		Some(days) if days <= warn_days as i64 => 1,
		_ => frequency_hours.max(1),
	};

	now - last >= chrono::Duration::hours(effective_frequency_hours as i64)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn summary(days_remaining: i64) -> SslCertificateSummary {
		let now = Utc::now();
		SslCertificateSummary {
			valid_from: now - chrono::Duration::days(30),
			valid_to: now + chrono::Duration::days(days_remaining),
			issuer_cn: Some("ca".into()),
			subject_cn: Some("example.com".into()),
			serial_number: "01".into(),
			fingerprint_sha256: "ab".repeat(32),
			days_remaining,
		}
	}

	#[test]
	fn ok_result_maps_to_up() {
		let result = TlsCheckResult::Ok { certificate: summary(90), warning: None };
		assert_eq!(display_status(&result), DisplayStatus::Up);
	}

	#[test]
	fn expired_result_maps_to_down() {
		let result = TlsCheckResult::Expired { certificate: summary(-1) };
		assert_eq!(display_status(&result), DisplayStatus::Down);
	}

	#[test]
	fn not_yet_valid_maps_to_error() {
		let result = TlsCheckResult::NotYetValid { certificate: summary(400) };
		assert_eq!(display_status(&result), DisplayStatus::Error);
	}

	#[test]
	fn timed_out_failure_maps_to_timeout_not_down() {
		let result = TlsCheckResult::Failed { error: "timed out".into(), timed_out: true };
		assert_eq!(display_status(&result), DisplayStatus::Timeout);
	}

	#[test]
	fn should_check_when_never_checked() {
		assert!(should_perform_ssl_check(None, 24, None, 14, Utc::now()));
	}

	#[test]
	fn should_not_check_before_frequency_elapses() {
		let now = Utc::now();
		let last = now - chrono::Duration::hours(1);
		assert!(!should_perform_ssl_check(Some(last), 24, Some(90), 14, now));
	}

	#[test]
	fn falls_back_to_hourly_inside_warning_window() {
		let now = Utc::now();
		let last = now - chrono::Duration::hours(2);
		assert!(should_perform_ssl_check(Some(last), 24, Some(10), 14, now));
	}

	#[test]
	fn classifies_connection_refused() {
		let err = std::io::Error::from(std::io::ErrorKind::ConnectionRefused);
		assert!(classify_io_error(&err).starts_with("ECONNREFUSED"));
	}
}
