//! `NotificationProvider`: a configured alert destination. Only the webhook
//! and email transports are concretely delivered by this codebase (see
//! `supercheck-webhook`/`supercheck-smtp`); Slack/Telegram/Discord are
//! modeled here as trait-level extension points with no built-in `Notifier`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::ids::ProviderId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderType {
	Email,
	Slack,
	Webhook,
	Telegram,
	Discord,
}

impl fmt::Display for ProviderType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Self::Email => "email",
			Self::Slack => "slack",
			Self::Webhook => "webhook",
			Self::Telegram => "telegram",
			Self::Discord => "discord",
		};
		write!(f, "{s}")
	}
}

impl FromStr for ProviderType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"email" => Ok(Self::Email),
			"slack" => Ok(Self::Slack),
			"webhook" => Ok(Self::Webhook),
			"telegram" => Ok(Self::Telegram),
			"discord" => Ok(Self::Discord),
			other => Err(format!("unknown provider type: {other}")),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailProviderConfig {
	pub to_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookProviderConfig {
	pub url: String,
	/// HMAC-SHA256 signing secret; shared with `supercheck-webhook`.
	pub secret: Option<String>,
	pub timeout_seconds: Option<u64>,
}

/// Trait-level extension points: the provider `type` enum and row storage
/// accept these, but no concrete `Notifier` transport ships for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackProviderConfig {
	pub webhook_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramProviderConfig {
	pub bot_token: String,
	pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscordProviderConfig {
	pub webhook_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
	Email(EmailProviderConfig),
	Webhook(WebhookProviderConfig),
	Slack(SlackProviderConfig),
	Telegram(TelegramProviderConfig),
	Discord(DiscordProviderConfig),
}

impl ProviderConfig {
	pub fn provider_type(&self) -> ProviderType {
		match self {
			Self::Email(_) => ProviderType::Email,
			Self::Webhook(_) => ProviderType::Webhook,
			Self::Slack(_) => ProviderType::Slack,
			Self::Telegram(_) => ProviderType::Telegram,
			Self::Discord(_) => ProviderType::Discord,
		}
	}

	/// Whether a concrete `Notifier` implementation ships for this
	/// provider's transport.
	pub fn has_concrete_transport(&self) -> bool {
		matches!(self, Self::Email(_) | Self::Webhook(_))
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationProvider {
	pub id: ProviderId,
	pub config: ProviderConfig,
	pub enabled: bool,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl NotificationProvider {
	pub fn provider_type(&self) -> ProviderType {
		self.config.provider_type()
	}
}
