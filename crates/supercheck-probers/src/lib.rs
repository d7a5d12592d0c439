//! Monitor probers: one module per [`supercheck_core::MonitorType`], each
//! producing a [`supercheck_core::ProbeResult`] that never surfaces a
//! library-level error across the boundary — a connection failure,
//! timeout, or parse error becomes `status=down`/`status=error` instead.

pub mod error;
pub mod heartbeat;
pub mod http;
pub mod ping;
pub mod port;
pub mod status_grammar;
pub mod tls;
pub mod x509_min;

pub use error::{ProberError, Result};

use supercheck_core::{Monitor, MonitorConfig, ProbeResult};

/// Dispatches to the prober matching `monitor`'s configured type. Returns
/// `None` only for a `heartbeat` monitor still inside its grace window —
/// every other monitor type always produces a result, per §4.9 ("If
/// prober returned null (heartbeat within grace) -> skip result insert
/// entirely").
pub async fn probe(monitor: &Monitor) -> Option<ProbeResult> {
	match &monitor.config {
		MonitorConfig::HttpRequest(config) | MonitorConfig::Website(config) => Some(
			http::probe(monitor.monitor_type(), &monitor.target, config, monitor.ssl_last_checked_at).await,
		),
		MonitorConfig::PingHost(config) => Some(ping::probe(&monitor.target, config).await),
		MonitorConfig::PortCheck(config) => Some(port::probe(&monitor.target, config).await),
		MonitorConfig::Heartbeat(config) => heartbeat::evaluate(config, monitor.created_at, chrono::Utc::now()),
	}
}

#[cfg(test)]
mod tests {
	use supercheck_core::{MonitorStatus, MonitorType, PortMonitorConfig, PortProtocol};

	use super::*;

	fn base_monitor(config: MonitorConfig) -> Monitor {
		let now = chrono::Utc::now();
		Monitor {
			id: supercheck_core::MonitorId::new(),
			target: "127.0.0.1".to_string(),
			frequency_minutes: 5,
			enabled: true,
			status: MonitorStatus::Pending,
			config,
			last_check_at: None,
			last_status_change_at: None,
			alert_config: None,
			ssl_last_checked_at: None,
			last_ping_at: None,
			created_at: now,
			updated_at: now,
		}
	}

	#[tokio::test]
	async fn dispatches_port_check_to_port_prober() {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let port = listener.local_addr().unwrap().port();
		tokio::spawn(async move {
			let _ = listener.accept().await;
		});

		let monitor = base_monitor(MonitorConfig::PortCheck(PortMonitorConfig {
			port,
			protocol: PortProtocol::Tcp,
			timeout_seconds: Some(2),
		}));
		assert_eq!(monitor.monitor_type(), MonitorType::PortCheck);

		let result = probe(&monitor).await.expect("port check always produces a result");
		assert!(result.is_up);
	}
}
