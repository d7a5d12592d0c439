//! Alert-engine and notifier-transport configuration (`spec.md` §4.10, §6).

use serde::{Deserialize, Serialize};
use supercheck_config_common::SecretString;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmtpConfigLayer {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub username: Option<String>,
	#[serde(skip)]
	pub password: Option<SecretString>,
	pub from_address: Option<String>,
	pub from_name: Option<String>,
	pub use_tls: Option<bool>,
}

impl SmtpConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.port.is_some() {
			self.port = other.port;
		}
		if other.username.is_some() {
			self.username = other.username;
		}
		if other.password.is_some() {
			self.password = other.password;
		}
		if other.from_address.is_some() {
			self.from_address = other.from_address;
		}
		if other.from_name.is_some() {
			self.from_name = other.from_name;
		}
		if other.use_tls.is_some() {
			self.use_tls = other.use_tls;
		}
	}

	/// Returns `None` when no SMTP host is configured — the email transport
	/// is optional, unlike the webhook transport.
	pub fn finalize(self) -> Option<SmtpConfig> {
		let host = self.host?;
		Some(SmtpConfig {
			host,
			port: self.port.unwrap_or(587),
			username: self.username,
			password: self.password,
			from_address: self.from_address.unwrap_or_else(|| "alerts@supercheck.local".to_string()),
			from_name: self.from_name.unwrap_or_else(|| "Supercheck".to_string()),
			use_tls: self.use_tls.unwrap_or(true),
		})
	}
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub from_address: String,
	pub from_name: String,
	pub use_tls: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertsConfigLayer {
	pub webhook_default_timeout_secs: Option<u64>,
	pub ssl_cooldown_hours: Option<u32>,
	pub dashboard_base_url: Option<String>,
}

impl AlertsConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.webhook_default_timeout_secs.is_some() {
			self.webhook_default_timeout_secs = other.webhook_default_timeout_secs;
		}
		if other.ssl_cooldown_hours.is_some() {
			self.ssl_cooldown_hours = other.ssl_cooldown_hours;
		}
		if other.dashboard_base_url.is_some() {
			self.dashboard_base_url = other.dashboard_base_url;
		}
	}

	pub fn finalize(self) -> AlertsConfig {
		AlertsConfig {
			webhook_default_timeout_secs: self.webhook_default_timeout_secs.unwrap_or(10),
			ssl_cooldown_hours: self.ssl_cooldown_hours.unwrap_or(24),
			dashboard_base_url: self.dashboard_base_url,
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertsConfig {
	/// Per-request timeout the engine gives each `Notifier::send` call.
	pub webhook_default_timeout_secs: u64,
	/// Minimum wall-clock gap between two SSL-expiry alerts for one monitor.
	pub ssl_cooldown_hours: u32,
	/// Base URL used to build `metadata.dashboardUrl` in alert payloads.
	/// `None` omits the field rather than emitting a broken link.
	pub dashboard_base_url: Option<String>,
}

impl Default for AlertsConfig {
	fn default() -> Self {
		Self {
			webhook_default_timeout_secs: 10,
			ssl_cooldown_hours: 24,
			dashboard_base_url: None,
		}
	}
}

pub fn load_smtp_password_env() -> Result<Option<SecretString>, ConfigError> {
	supercheck_config_common::load_secret_env("SUPERCHECK_SMTP_PASSWORD")
		.map_err(|e| ConfigError::Secret(e.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn smtp_layer_without_host_finalizes_to_none() {
		assert!(SmtpConfigLayer::default().finalize().is_none());
	}

	#[test]
	fn smtp_layer_with_host_finalizes_with_defaults() {
		let layer = SmtpConfigLayer {
			host: Some("smtp.example.com".to_string()),
			..Default::default()
		};
		let config = layer.finalize().unwrap();
		assert_eq!(config.port, 587);
		assert!(config.use_tls);
	}

	#[test]
	fn alerts_defaults_match_spec() {
		let config = AlertsConfigLayer::default().finalize();
		assert_eq!(config.webhook_default_timeout_secs, 10);
		assert_eq!(config.ssl_cooldown_hours, 24);
	}
}
