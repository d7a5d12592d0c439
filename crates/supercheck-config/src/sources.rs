//! Configuration sources: built-in defaults, an optional TOML file, and
//! environment variables, composed by ascending [`Precedence`].

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	AlertsConfigLayer, CapacityConfigLayer, DatabaseConfigLayer, JanitorConfigLayer,
	LoggingConfigLayer, QueueConfigLayer, SmtpConfigLayer,
};

/// Source precedence levels (higher overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// A place configuration values can come from.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source. Always yields an empty layer — the defaults
/// themselves live in each section's `finalize()`.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/supercheck/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer = toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
			path: self.path.clone(),
			source: e,
		})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: `SUPERCHECK_<SECTION>_<FIELD>`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			database: Some(load_database_from_env()?),
			capacity: Some(load_capacity_from_env()?),
			queue: Some(load_queue_from_env()?),
			alerts: Some(load_alerts_from_env()?),
			smtp: Some(load_smtp_from_env()?),
			janitor: Some(load_janitor_from_env()?),
			logging: Some(load_logging_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_num<T: std::str::FromStr>(name: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_database_from_env() -> Result<DatabaseConfigLayer, ConfigError> {
	Ok(DatabaseConfigLayer {
		url: env_var("SUPERCHECK_DATABASE_URL"),
	})
}

fn load_capacity_from_env() -> Result<CapacityConfigLayer, ConfigError> {
	Ok(CapacityConfigLayer {
		running: env_num("SUPERCHECK_CAPACITY_RUNNING")?,
		queued: env_num("SUPERCHECK_CAPACITY_QUEUED")?,
	})
}

fn load_queue_from_env() -> Result<QueueConfigLayer, ConfigError> {
	Ok(QueueConfigLayer {
		poll_interval_ms: env_num("SUPERCHECK_QUEUE_POLL_INTERVAL_MS")?,
		job_execution_concurrency: env_num("SUPERCHECK_QUEUE_JOB_EXECUTION_CONCURRENCY")?,
		monitor_execution_concurrency: env_num("SUPERCHECK_QUEUE_MONITOR_EXECUTION_CONCURRENCY")?,
	})
}

fn load_alerts_from_env() -> Result<AlertsConfigLayer, ConfigError> {
	Ok(AlertsConfigLayer {
		webhook_default_timeout_secs: env_num("SUPERCHECK_ALERTS_WEBHOOK_TIMEOUT_SECS")?,
		ssl_cooldown_hours: env_num("SUPERCHECK_ALERTS_SSL_COOLDOWN_HOURS")?,
	})
}

fn load_smtp_from_env() -> Result<SmtpConfigLayer, ConfigError> {
	Ok(SmtpConfigLayer {
		host: env_var("SUPERCHECK_SMTP_HOST"),
		port: env_num("SUPERCHECK_SMTP_PORT")?,
		username: env_var("SUPERCHECK_SMTP_USERNAME"),
		password: crate::sections::load_smtp_password_env()?,
		from_address: env_var("SUPERCHECK_SMTP_FROM_ADDRESS"),
		from_name: env_var("SUPERCHECK_SMTP_FROM_NAME"),
		use_tls: env_bool("SUPERCHECK_SMTP_USE_TLS"),
	})
}

fn load_janitor_from_env() -> Result<JanitorConfigLayer, ConfigError> {
	Ok(JanitorConfigLayer {
		interval_hours: env_num("SUPERCHECK_JANITOR_INTERVAL_HOURS")?,
		job_data_ttl_days: env_num("SUPERCHECK_JANITOR_JOB_DATA_TTL_DAYS")?,
		event_stream_ttl_hours: env_num("SUPERCHECK_JANITOR_EVENT_STREAM_TTL_HOURS")?,
		metrics_ttl_hours: env_num("SUPERCHECK_JANITOR_METRICS_TTL_HOURS")?,
	})
}

fn load_logging_from_env() -> Result<LoggingConfigLayer, ConfigError> {
	Ok(LoggingConfigLayer {
		level: env_var("SUPERCHECK_LOG_LEVEL"),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn precedence_ordering() {
		assert!(Precedence::Environment > Precedence::ConfigFile);
		assert!(Precedence::ConfigFile > Precedence::Defaults);
	}

	#[test]
	fn defaults_source_returns_empty_layer() {
		let layer = DefaultsSource.load().unwrap();
		assert!(layer.database.is_none());
		assert!(layer.capacity.is_none());
	}

	#[test]
	fn toml_source_missing_file_returns_empty() {
		let layer = TomlSource::new("/nonexistent/config.toml").load().unwrap();
		assert!(layer.database.is_none());
	}

	#[test]
	fn toml_source_parses_present_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("server.toml");
		std::fs::write(&path, "[capacity]\nrunning = 12\n").unwrap();
		let layer = TomlSource::new(path).load().unwrap();
		assert_eq!(layer.capacity.unwrap().running, Some(12));
	}
}
