//! Layered configuration for the Supercheck server binary.
//!
//! Configuration is resolved from three sources in ascending precedence —
//! built-in defaults, an optional TOML file, and environment variables
//! (`SUPERCHECK_*`) — merged into a `*ConfigLayer` (all-`Option`) and
//! finalized into a concrete `*Config` per section.
//!
//! # Usage
//!
//! ```ignore
//! use supercheck_config::load_config;
//!
//! let config = load_config()?;
//! println!("database: {}", config.database.url);
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource};

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
	pub database: DatabaseConfig,
	pub capacity: CapacityConfig,
	pub queue: QueueConfig,
	pub alerts: AlertsConfig,
	pub smtp: Option<SmtpConfig>,
	pub janitor: JanitorConfig,
	pub logging: LoggingConfig,
}

impl Default for ServerConfig {
	fn default() -> Self {
		finalize(ServerConfigLayer::default()).expect("default layer always finalizes")
	}
}

/// Load configuration from all sources with standard precedence:
/// 1. Environment variables (`SUPERCHECK_*`)
/// 2. Config file (`/etc/supercheck/server.toml`)
/// 3. Built-in defaults
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_with_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Load configuration from environment only (tests, simple deployments).
pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	let mut merged = ServerConfigLayer::default();
	merged.merge(EnvSource.load()?);
	finalize(merged)
}

/// Load configuration with a caller-supplied TOML file path.
pub fn load_config_with_file(config_path: impl Into<std::path::PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_with_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

fn load_with_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		let layer = source.load()?;
		merged.merge(layer);
	}

	finalize(merged)
}

fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let database = layer.database.unwrap_or_default().finalize();
	let capacity = layer.capacity.unwrap_or_default().finalize();
	let queue = layer.queue.unwrap_or_default().finalize();
	let alerts = layer.alerts.unwrap_or_default().finalize();
	let smtp = layer.smtp.unwrap_or_default().finalize();
	let janitor = layer.janitor.unwrap_or_default().finalize();
	let logging = layer.logging.unwrap_or_default().finalize();

	info!(
		database = %database.url,
		running_capacity = capacity.running,
		queued_capacity = capacity.queued,
		smtp_configured = smtp.is_some(),
		janitor_interval_hours = janitor.interval_hours,
		"supercheck configuration loaded"
	);

	Ok(ServerConfig {
		database,
		capacity,
		queue,
		alerts,
		smtp,
		janitor,
		logging,
	})
}
