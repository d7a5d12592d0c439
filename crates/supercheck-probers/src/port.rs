//! `port_check` prober: TCP connect probe, or a best-effort UDP send
//! (UDP has no handshake, so "connected" only means the local socket
//! could send without an ICMP port-unreachable bouncing back in time).

use std::time::{Duration, Instant};

use supercheck_core::{PortMonitorConfig, PortProbeDetails, PortProtocol, ProbeResult, ProbeStatus};
use tokio::net::{TcpStream, UdpSocket};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn probe(target: &str, config: &PortMonitorConfig) -> ProbeResult {
	let timeout = config.timeout_seconds.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT);
	let addr = format!("{target}:{}", config.port);

	match config.protocol {
		PortProtocol::Tcp => probe_tcp(&addr, timeout).await,
		PortProtocol::Udp => probe_udp(&addr, timeout).await,
	}
}

async fn probe_tcp(addr: &str, timeout: Duration) -> ProbeResult {
	let started = Instant::now();
	match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
		Ok(Ok(_stream)) => {
			let connect_time_ms = started.elapsed().as_millis() as u64;
			ProbeResult {
				status: ProbeStatus::Up,
				is_up: true,
				response_time_ms: Some(connect_time_ms),
				details: details("tcp", true, Some(connect_time_ms)),
				error: None,
			}
		}
		Ok(Err(e)) => ProbeResult {
			status: ProbeStatus::Down,
			is_up: false,
			response_time_ms: Some(started.elapsed().as_millis() as u64),
			details: details("tcp", false, None),
			error: Some(e.to_string()),
		},
		Err(_) => ProbeResult {
			status: ProbeStatus::Timeout,
			is_up: false,
			response_time_ms: Some(started.elapsed().as_millis() as u64),
			details: details("tcp", false, None),
			error: Some(format!("connection timed out after {timeout:?}")),
		},
	}
}

/// UDP has no connection handshake: a successful `send` only proves the
/// local stack accepted the datagram, not that anything is listening. We
/// report `up` on a clean send and `down` only on an immediate local
/// error (e.g. an ICMP port-unreachable already cached by the kernel).
async fn probe_udp(addr: &str, timeout: Duration) -> ProbeResult {
	let started = Instant::now();

	let socket = match UdpSocket::bind("0.0.0.0:0").await {
		Ok(s) => s,
		Err(e) => {
			return ProbeResult {
				status: ProbeStatus::Error,
				is_up: false,
				response_time_ms: None,
				details: details("udp", false, None),
				error: Some(format!("failed to bind local UDP socket: {e}")),
			};
		}
	};

	let send = async {
		socket.connect(addr).await?;
		socket.send(&[0u8]).await
	};

	match tokio::time::timeout(timeout, send).await {
		Ok(Ok(_)) => {
			let connect_time_ms = started.elapsed().as_millis() as u64;
			ProbeResult {
				status: ProbeStatus::Up,
				is_up: true,
				response_time_ms: Some(connect_time_ms),
				details: details("udp", true, Some(connect_time_ms)),
				error: None,
			}
		}
		Ok(Err(e)) => ProbeResult {
			status: ProbeStatus::Down,
			is_up: false,
			response_time_ms: Some(started.elapsed().as_millis() as u64),
			details: details("udp", false, None),
			error: Some(e.to_string()),
		},
		Err(_) => ProbeResult {
			status: ProbeStatus::Timeout,
			is_up: false,
			response_time_ms: Some(started.elapsed().as_millis() as u64),
			details: details("udp", false, None),
			error: Some(format!("send timed out after {timeout:?}")),
		},
	}
}

fn details(protocol: &str, connected: bool, connect_time_ms: Option<u64>) -> supercheck_core::MonitorResultDetails {
	supercheck_core::MonitorResultDetails::Port(PortProbeDetails { protocol: protocol.to_string(), connected, connect_time_ms })
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn tcp_connect_to_closed_local_port_is_down() {
		let config = PortMonitorConfig { port: 1, protocol: PortProtocol::Tcp, timeout_seconds: Some(2) };
		let result = probe("127.0.0.1", &config).await;
		assert!(!result.is_up);
		assert!(matches!(result.status, ProbeStatus::Down | ProbeStatus::Timeout));
	}

	#[tokio::test]
	async fn tcp_connect_to_listening_port_is_up() {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		tokio::spawn(async move {
			let _ = listener.accept().await;
		});

		let config = PortMonitorConfig { port, protocol: PortProtocol::Tcp, timeout_seconds: Some(2) };
		let result = probe("127.0.0.1", &config).await;
		assert!(result.is_up);
		assert_eq!(result.status, ProbeStatus::Up);
	}
}
