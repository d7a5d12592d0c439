//! SMTP email `Notifier` transport for Supercheck alerts.
//!
//! Provides a small async SMTP client for sending the HTML+plain-text alert
//! emails synthesized by `supercheck-alerts`. Integrates with
//! [`supercheck_secret`] so the SMTP password never appears in logs or
//! `Debug` output.
//!
//! # Example
//!
//! ```no_run
//! use supercheck_smtp::{SmtpClient, SmtpConfig};
//! use supercheck_secret::SecretString;
//!
//! # async fn example() -> Result<(), supercheck_smtp::SmtpError> {
//! let config = SmtpConfig {
//!     host: "smtp.example.com".to_string(),
//!     port: 587,
//!     username: Some("user@example.com".to_string()),
//!     password: Some(SecretString::new("password".to_string())),
//!     from_address: "noreply@example.com".to_string(),
//!     from_name: "Supercheck".to_string(),
//!     use_tls: true,
//! };
//!
//! let client = SmtpClient::new(config)?;
//! client.send_email(
//!     "recipient@example.com",
//!     "Hello",
//!     "<h1>Hello World</h1>",
//!     "Hello World",
//! ).await?;
//! # Ok(())
//! # }
//! ```

use lettre::{
	message::{header::ContentType, Mailbox, MultiPart, SinglePart},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::{Deserialize, Serialize};
use std::env;
use supercheck_secret::SecretString;

/// Errors that can occur during SMTP operations.
#[derive(Debug, thiserror::Error)]
pub enum SmtpError {
	#[error("connection failed: {0}")]
	Connection(String),

	#[error("authentication failed: {0}")]
	Auth(String),

	#[error("send failed: {0}")]
	Send(String),

	#[error("invalid configuration: {0}")]
	Config(String),

	#[error("invalid email address: {0}")]
	Address(String),
}

/// Configuration for the SMTP client.
///
/// The `password` field uses [`SecretString`] so it is never logged,
/// zeroized on drop, and never rendered by `Debug`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
	pub host: String,
	pub port: u16,
	pub username: Option<String>,
	pub password: Option<SecretString>,
	pub from_address: String,
	pub from_name: String,
	#[serde(default = "default_use_tls")]
	pub use_tls: bool,
}

fn default_use_tls() -> bool {
	true
}

impl SmtpConfig {
	/// Load SMTP configuration from environment variables.
	///
	/// - `SUPERCHECK_SMTP_HOST` (required)
	/// - `SUPERCHECK_SMTP_PORT` (default: 587)
	/// - `SUPERCHECK_SMTP_USERNAME` / `SUPERCHECK_SMTP_PASSWORD` (optional)
	/// - `SUPERCHECK_SMTP_FROM_ADDRESS` (required)
	/// - `SUPERCHECK_SMTP_FROM_NAME` (default: "Supercheck")
	/// - `SUPERCHECK_SMTP_USE_TLS` (default: true)
	pub fn from_env() -> Result<Self, SmtpError> {
		let host = env::var("SUPERCHECK_SMTP_HOST")
			.map_err(|_| SmtpError::Config("SUPERCHECK_SMTP_HOST is required".into()))?;

		let port = env::var("SUPERCHECK_SMTP_PORT")
			.unwrap_or_else(|_| "587".into())
			.parse()
			.map_err(|_| SmtpError::Config("SUPERCHECK_SMTP_PORT must be a valid port number".into()))?;

		let username = env::var("SUPERCHECK_SMTP_USERNAME").ok();
		let password = env::var("SUPERCHECK_SMTP_PASSWORD").ok().map(SecretString::new);

		let from_address = env::var("SUPERCHECK_SMTP_FROM_ADDRESS")
			.map_err(|_| SmtpError::Config("SUPERCHECK_SMTP_FROM_ADDRESS is required".into()))?;

		let from_name = env::var("SUPERCHECK_SMTP_FROM_NAME").unwrap_or_else(|_| "Supercheck".into());

		let use_tls = env::var("SUPERCHECK_SMTP_USE_TLS")
			.map(|v| v.to_lowercase() != "false" && v != "0")
			.unwrap_or(true);

		Ok(Self {
			host,
			port,
			username,
			password,
			from_address,
			from_name,
			use_tls,
		})
	}
}

/// Async SMTP client for sending alert emails.
pub struct SmtpClient {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from_mailbox: Mailbox,
}

impl SmtpClient {
	#[tracing::instrument(
        name = "smtp_client_new",
        skip(config),
        fields(host = %config.host, port = %config.port, use_tls = %config.use_tls)
    )]
	pub fn new(config: SmtpConfig) -> Result<Self, SmtpError> {
		let from_mailbox: Mailbox = format!("{} <{}>", config.from_name, config.from_address)
			.parse()
			.map_err(|e| SmtpError::Address(format!("{e}")))?;

		let builder = if config.use_tls {
			AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
				.map_err(|e| SmtpError::Connection(format!("{e}")))?
		} else {
			AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
		};

		let mut builder = builder.port(config.port);

		if let (Some(username), Some(password)) = (config.username, config.password) {
			let credentials = Credentials::new(username, password.into_inner());
			builder = builder.credentials(credentials);
		}

		let transport = builder.build();

		tracing::debug!("SMTP client initialized");

		Ok(Self {
			transport,
			from_mailbox,
		})
	}

	/// Performs an actual connection test against the SMTP server.
	#[tracing::instrument(name = "smtp_check_health", skip(self))]
	pub async fn check_health(&self) -> Result<(), SmtpError> {
		self
			.transport
			.test_connection()
			.await
			.map_err(|e| SmtpError::Connection(format!("{e}")))?;
		Ok(())
	}

	/// Sends a multipart (HTML + plain text) alert email.
	#[tracing::instrument(
        name = "smtp_send_email",
        skip(self, body_html, body_text),
        fields(to = %to, subject = %subject)
    )]
	pub async fn send_email(
		&self,
		to: &str,
		subject: &str,
		body_html: &str,
		body_text: &str,
	) -> Result<(), SmtpError> {
		let to_mailbox: Mailbox = to.parse().map_err(|e| SmtpError::Address(format!("{e}")))?;

		let message = Message::builder()
			.from(self.from_mailbox.clone())
			.to(to_mailbox)
			.subject(subject)
			.multipart(
				MultiPart::alternative()
					.singlepart(
						SinglePart::builder()
							.header(ContentType::TEXT_PLAIN)
							.body(body_text.to_string()),
					)
					.singlepart(
						SinglePart::builder()
							.header(ContentType::TEXT_HTML)
							.body(body_html.to_string()),
					),
			)
			.map_err(|e| SmtpError::Send(format!("failed to build message: {e}")))?;

		self
			.transport
			.send(message)
			.await
			.map_err(|e| SmtpError::Send(format!("{e}")))?;

		tracing::info!("alert email sent");

		Ok(())
	}
}

/// Validates an email address's syntax (not deliverability).
pub fn is_valid_email(email: &str) -> bool {
	email.parse::<Mailbox>().is_ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	mod email_validation {
		use super::*;

		#[test]
		fn valid_simple_email() {
			assert!(is_valid_email("user@example.com"));
		}

		#[test]
		fn valid_email_with_name() {
			assert!(is_valid_email("User Name <user@example.com>"));
		}

		#[test]
		fn invalid_empty_string() {
			assert!(!is_valid_email(""));
		}

		#[test]
		fn invalid_no_at_symbol() {
			assert!(!is_valid_email("userexample.com"));
		}

		#[test]
		fn invalid_no_domain() {
			assert!(!is_valid_email("user@"));
		}
	}

	mod config {
		use super::*;

		#[test]
		fn config_debug_does_not_leak_password() {
			let config = SmtpConfig {
				host: "smtp.example.com".to_string(),
				port: 587,
				username: Some("user".to_string()),
				password: Some(SecretString::new("super-secret-password".to_string())),
				from_address: "test@example.com".to_string(),
				from_name: "Test".to_string(),
				use_tls: true,
			};

			let debug = format!("{config:?}");
			assert!(!debug.contains("super-secret-password"));
			assert!(debug.contains("[redacted]"));
		}

		#[test]
		fn default_use_tls_is_true() {
			assert!(default_use_tls());
		}
	}

	mod property_tests {
		use super::*;
		use proptest::prelude::*;

		proptest! {
			#[test]
			fn valid_emails_are_accepted(
				local in "[a-zA-Z][a-zA-Z0-9]{0,30}",
				domain in "[a-zA-Z][a-zA-Z0-9]{0,20}",
				tld in "(com|org|net|io|dev)"
			) {
				let email = format!("{local}@{domain}.{tld}");
				prop_assert!(is_valid_email(&email), "Expected valid: {}", email);
			}

			#[test]
			fn password_never_in_config_debug(password in "[a-zA-Z0-9!@#$%^&*]{8,32}") {
				prop_assume!(!password.contains("redacted"));

				let config = SmtpConfig {
					host: "smtp.example.com".to_string(),
					port: 587,
					username: Some("user".to_string()),
					password: Some(SecretString::new(password.clone())),
					from_address: "test@example.com".to_string(),
					from_name: "Test".to_string(),
					use_tls: true,
				};

				let debug = format!("{config:?}");
				prop_assert!(!debug.contains(&password), "password leaked in debug output");
			}
		}
	}
}
