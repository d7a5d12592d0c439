//! Uniform alert payload synthesis (`spec.md` §4.10, §6 Notifier contract).

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use supercheck_core::{AlertKind, Severity};

/// One `{name, value, short?}` field, flattened for transports that render
/// a field grid (Slack attachments, HTML tables, …).
#[derive(Debug, Clone, Serialize)]
pub struct PayloadField {
	pub name: String,
	pub value: String,
	pub short: Option<bool>,
}

impl PayloadField {
	pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: value.into(), short: None }
	}

	pub fn short(name: impl Into<String>, value: impl Into<String>) -> Self {
		Self { name: name.into(), value: value.into(), short: Some(true) }
	}
}

/// The uniform shape every `Notifier` transport receives, per §6: "transport
/// must deliver `title`, `message`, and a flat list of `{name,value,short?}`
/// fields, plus a color hex per severity."
#[derive(Debug, Clone, Serialize)]
pub struct AlertPayload {
	#[serde(rename = "type")]
	pub kind: AlertKind,
	pub severity: Severity,
	pub title: String,
	pub message: String,
	pub target_name: String,
	pub target_id: String,
	pub timestamp: DateTime<Utc>,
	pub fields: Vec<PayloadField>,
	pub color_hex: &'static str,
	pub metadata: Value,
}

impl AlertPayload {
	pub fn new(
		kind: AlertKind,
		title: String,
		message: String,
		target_name: String,
		target_id: String,
		fields: Vec<PayloadField>,
		metadata: Value,
	) -> Self {
		let severity = kind.severity();
		Self {
			kind,
			severity,
			title,
			message,
			target_name,
			target_id,
			timestamp: Utc::now(),
			fields,
			color_hex: severity.color_hex(),
			metadata,
		}
	}
}
