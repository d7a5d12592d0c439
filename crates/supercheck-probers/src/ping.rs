//! `ping_host` prober: shells out to the platform `ping` binary for a
//! single echo request rather than crafting raw ICMP sockets, which
//! would need `CAP_NET_RAW`/root on most hosts.

use std::process::Stdio;
use std::time::{Duration, Instant};

use supercheck_core::{PingMonitorConfig, PingProbeDetails, ProbeResult, ProbeStatus};
use tokio::process::Command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs a single ping against `target` and folds the result into a
/// [`ProbeResult`]. Never returns `Err` — a missing `ping` binary, DNS
/// failure, or packet loss all surface as `status=down`/`error`.
pub async fn probe(target: &str, config: &PingMonitorConfig) -> ProbeResult {
	let timeout = config.timeout_seconds.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT);
	let started = Instant::now();

	let mut command = build_command(target, timeout);
	command.stdout(Stdio::piped()).stderr(Stdio::piped());

	let output = match tokio::time::timeout(timeout + Duration::from_secs(1), command.output()).await {
		Ok(Ok(output)) => output,
		Ok(Err(e)) => return down_result(format!("failed to spawn ping: {e}"), started.elapsed()),
		Err(_) => return timeout_result(started.elapsed()),
	};

	let rtt_ms = parse_rtt_ms(&String::from_utf8_lossy(&output.stdout));

	if output.status.success() && rtt_ms.is_some() {
		let response_time_ms = rtt_ms.map(|ms| ms.round() as u64).unwrap_or_else(|| started.elapsed().as_millis() as u64);
		ProbeResult {
			status: ProbeStatus::Up,
			is_up: true,
			response_time_ms: Some(response_time_ms),
			details: details(rtt_ms, 1, 1),
			error: None,
		}
	} else {
		ProbeResult {
			status: ProbeStatus::Down,
			is_up: false,
			response_time_ms: Some(started.elapsed().as_millis() as u64),
			details: details(None, 1, 0),
			error: Some(format!("host unreachable (exit {:?})", output.status.code())),
		}
	}
}

fn details(rtt_ms: Option<f64>, sent: u32, received: u32) -> supercheck_core::MonitorResultDetails {
	supercheck_core::MonitorResultDetails::Ping(PingProbeDetails { rtt_ms, packets_sent: sent, packets_received: received })
}

fn down_result(error: String, elapsed: Duration) -> ProbeResult {
	ProbeResult {
		status: ProbeStatus::Down,
		is_up: false,
		response_time_ms: Some(elapsed.as_millis() as u64),
		details: details(None, 1, 0),
		error: Some(error),
	}
}

fn timeout_result(elapsed: Duration) -> ProbeResult {
	ProbeResult {
		status: ProbeStatus::Timeout,
		is_up: false,
		response_time_ms: Some(elapsed.as_millis() as u64),
		details: details(None, 1, 0),
		error: Some("ping timed out".to_string()),
	}
}

#[cfg(unix)]
fn build_command(target: &str, timeout: Duration) -> Command {
	let mut cmd = Command::new("ping");
	cmd.arg("-c").arg("1").arg("-W").arg(timeout.as_secs().max(1).to_string()).arg(target);
	cmd
}

#[cfg(windows)]
fn build_command(target: &str, timeout: Duration) -> Command {
	let mut cmd = Command::new("ping");
	cmd.arg("-n").arg("1").arg("-w").arg((timeout.as_millis() as u64).to_string()).arg(target);
	cmd
}

/// Parses the round-trip time out of `ping`'s stdout. Handles both the
/// Linux/macOS `time=12.3 ms` form and Windows' `time=12ms`/`time<1ms`.
fn parse_rtt_ms(stdout: &str) -> Option<f64> {
	let marker = stdout.find("time=").or_else(|| stdout.find("time<"))?;
	let rest = &stdout[marker + 5..];
	let end = rest.find(|c: char| !(c.is_ascii_digit() || c == '.'))?;
	rest[..end].parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_unix_style_rtt() {
		let stdout = "64 bytes from 1.1.1.1: icmp_seq=1 ttl=56 time=12.3 ms\n";
		assert_eq!(parse_rtt_ms(stdout), Some(12.3));
	}

	#[test]
	fn parses_windows_style_rtt() {
		let stdout = "Reply from 1.1.1.1: bytes=32 time=8ms TTL=56\n";
		assert_eq!(parse_rtt_ms(stdout), Some(8.0));
	}

	#[test]
	fn returns_none_when_no_time_field_present() {
		assert_eq!(parse_rtt_ms("Request timed out.\n"), None);
	}
}
