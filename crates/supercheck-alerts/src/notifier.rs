//! `Notifier` transports (`spec.md` §6): `send(payload, provider) → {ok,
//! error?}`. Concrete delivery ships for `webhook` and `email`; the other
//! `ProviderType` variants are valid configuration but have no transport
//! here (`ProviderConfig::has_concrete_transport`), so sending to one is a
//! reported failure rather than a silent skip.
//!
//! Grounded on `loom-server-scm/src/webhook.rs`'s `delivery::{sign_payload,
//! deliver}` — HMAC-sign the JSON body, POST it, fold the response into a
//! success/failure outcome.

use async_trait::async_trait;
use uuid::Uuid;

use supercheck_core::provider::{NotificationProvider, ProviderConfig};
use supercheck_webhook::compute_hmac_sha256;

use crate::payload::AlertPayload;

#[async_trait]
pub trait Notifier: Send + Sync {
	/// Delivers one alert to one provider. Never returns an error type the
	/// caller must downcast — the engine only needs success/failure plus a
	/// human-readable reason, per §6's `{ok, error?}` contract.
	async fn send(&self, payload: &AlertPayload, provider: &NotificationProvider) -> Result<(), String>;
}

pub struct TransportNotifier {
	http: reqwest::Client,
	smtp: Option<supercheck_smtp::SmtpClient>,
}

impl TransportNotifier {
	pub fn new(http: reqwest::Client, smtp: Option<supercheck_smtp::SmtpClient>) -> Self {
		Self { http, smtp }
	}

	async fn send_webhook(
		&self,
		payload: &AlertPayload,
		url: &str,
		secret: Option<&str>,
	) -> Result<(), String> {
		let body = serde_json::to_vec(payload).map_err(|e| format!("failed to serialize payload: {e}"))?;

		let mut request = self
			.http
			.post(url)
			.header("Content-Type", "application/json")
			.header("X-Supercheck-Event", payload.kind.to_string())
			.header("X-Supercheck-Delivery", Uuid::new_v4().to_string());

		if let Some(secret) = secret {
			let signature = compute_hmac_sha256(secret.as_bytes(), &body);
			request = request.header("X-Supercheck-Signature-256", format!("sha256={signature}"));
		}

		let response = request.body(body).send().await.map_err(|e| e.to_string())?;
		let status = response.status();
		if status.is_success() {
			Ok(())
		} else {
			let body_text = response.text().await.unwrap_or_default();
			Err(format!("webhook responded {status}: {body_text}"))
		}
	}

	async fn send_email(&self, payload: &AlertPayload, to_address: &str) -> Result<(), String> {
		let smtp = self.smtp.as_ref().ok_or_else(|| "no SMTP transport configured".to_string())?;
		let body_html = render_html(payload);
		let body_text = render_text(payload);
		smtp.send_email(to_address, &payload.title, &body_html, &body_text).await.map_err(|e| e.to_string())
	}
}

#[async_trait]
impl Notifier for TransportNotifier {
	async fn send(&self, payload: &AlertPayload, provider: &NotificationProvider) -> Result<(), String> {
		match &provider.config {
			ProviderConfig::Webhook(cfg) => self.send_webhook(payload, &cfg.url, cfg.secret.as_deref()).await,
			ProviderConfig::Email(cfg) => self.send_email(payload, &cfg.to_address).await,
			ProviderConfig::Slack(_) | ProviderConfig::Telegram(_) | ProviderConfig::Discord(_) => {
				Err(format!("no concrete Notifier transport for provider type {}", provider.provider_type()))
			}
		}
	}
}

fn render_text(payload: &AlertPayload) -> String {
	let mut out = format!("{}\n\n{}\n\n", payload.title, payload.message);
	for field in &payload.fields {
		out.push_str(&format!("{}: {}\n", field.name, field.value));
	}
	out
}

fn render_html(payload: &AlertPayload) -> String {
	let rows: String = payload
		.fields
		.iter()
		.map(|f| format!("<tr><td>{}</td><td>{}</td></tr>", f.name, f.value))
		.collect();
	format!(
		"<div style=\"border-left:4px solid {color}\"><h2>{title}</h2><p>{message}</p><table>{rows}</table></div>",
		color = payload.color_hex,
		title = payload.title,
		message = payload.message,
		rows = rows,
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;
	use supercheck_core::provider::{EmailProviderConfig, WebhookProviderConfig};
	use supercheck_core::{AlertKind, ProviderId};

	fn sample_payload() -> AlertPayload {
		AlertPayload::new(
			AlertKind::MonitorFailure,
			"Monitor down".to_string(),
			"example.com is down".to_string(),
			"example.com".to_string(),
			Uuid::new_v4().to_string(),
			vec![crate::payload::PayloadField::short("status", "down")],
			json!({}),
		)
	}

	fn provider(config: ProviderConfig) -> NotificationProvider {
		NotificationProvider { id: ProviderId::new(), config, enabled: true, created_at: chrono::Utc::now(), updated_at: chrono::Utc::now() }
	}

	#[tokio::test]
	async fn slack_provider_has_no_transport() {
		let notifier = TransportNotifier::new(supercheck_http::new_client(), None);
		let payload = sample_payload();
		let slack = provider(ProviderConfig::Slack(supercheck_core::provider::SlackProviderConfig {
			webhook_url: "https://hooks.slack.test/x".to_string(),
		}));
		let result = notifier.send(&payload, &slack).await;
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn email_without_smtp_client_fails() {
		let notifier = TransportNotifier::new(supercheck_http::new_client(), None);
		let payload = sample_payload();
		let email = provider(ProviderConfig::Email(EmailProviderConfig { to_address: "ops@example.test".to_string() }));
        let result = notifier.send(&payload, &email).await;
        assert!(result.is_err());
	}

	#[tokio::test]
	async fn webhook_to_unreachable_host_fails_without_panicking() {
		let notifier = TransportNotifier::new(supercheck_http::new_client(), None);
		let payload = sample_payload();
		let webhook = provider(ProviderConfig::Webhook(WebhookProviderConfig {
			url: "http://127.0.0.1:1".to_string(),
			secret: Some("shh".to_string()),
			timeout_seconds: None,
		}));
		let result = notifier.send(&payload, &webhook).await;
		assert!(result.is_err());
	}
}
