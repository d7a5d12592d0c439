//! The all-`Option` configuration layer merged from defaults, TOML, and env.

use serde::Deserialize;

use crate::sections::{
	AlertsConfigLayer, CapacityConfigLayer, DatabaseConfigLayer, JanitorConfigLayer,
	LoggingConfigLayer, QueueConfigLayer, SmtpConfigLayer,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub capacity: Option<CapacityConfigLayer>,
	#[serde(default)]
	pub queue: Option<QueueConfigLayer>,
	#[serde(default)]
	pub alerts: Option<AlertsConfigLayer>,
	#[serde(default)]
	pub smtp: Option<SmtpConfigLayer>,
	#[serde(default)]
	pub janitor: Option<JanitorConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_option(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_option(&mut self.capacity, other.capacity, CapacityConfigLayer::merge);
		merge_option(&mut self.queue, other.queue, QueueConfigLayer::merge);
		merge_option(&mut self.alerts, other.alerts, AlertsConfigLayer::merge);
		merge_option(&mut self.smtp, other.smtp, SmtpConfigLayer::merge);
		merge_option(&mut self.janitor, other.janitor, JanitorConfigLayer::merge);
		merge_option(&mut self.logging, other.logging, LoggingConfigLayer::merge);
	}
}

fn merge_option<T: Default>(slot: &mut Option<T>, other: Option<T>, merge_fn: impl FnOnce(&mut T, T)) {
	match (slot.as_mut(), other) {
		(Some(existing), Some(incoming)) => merge_fn(existing, incoming),
		(None, Some(incoming)) => *slot = Some(incoming),
		_ => {}
	}
}
