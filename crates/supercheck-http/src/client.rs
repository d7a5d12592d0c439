//! Shared HTTP client with a consistent User-Agent header.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use supercheck_version::BuildInfo;

/// Creates a new HTTP client with the standard Supercheck User-Agent header.
///
/// The User-Agent format is: `Supercheck/{platform}/{git_sha}`.
pub fn new_client() -> Client {
	builder().build().expect("failed to build HTTP client")
}

/// Creates a new HTTP client builder with the standard Supercheck User-Agent.
///
/// Use this when the caller needs to customize the client (timeout,
/// redirect policy, etc).
pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Creates a new HTTP client builder with a caller-supplied User-Agent.
///
/// Used by the `HttpProber` which sends `Supercheck-Monitor/1.0` rather than
/// the build-derived agent string.
pub fn builder_with_user_agent(user_agent: impl Into<String>) -> ClientBuilder {
	Client::builder().user_agent(user_agent.into())
}

/// Creates a new HTTP client with a custom timeout and the standard
/// User-Agent.
pub fn new_client_with_timeout(timeout: Duration) -> Client {
	builder()
		.timeout(timeout)
		.build()
		.expect("failed to build HTTP client")
}

/// Returns the standard Supercheck User-Agent string.
pub fn user_agent() -> String {
	let info = BuildInfo::current();
	format!("Supercheck/{}/{}", info.platform, info.git_sha)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_agent_has_correct_format() {
		let ua = user_agent();
		assert!(ua.starts_with("Supercheck/"));
		assert_eq!(ua.split('/').count(), 3);
	}

	#[test]
	fn builder_with_custom_user_agent() {
		let client = builder_with_user_agent("Supercheck-Monitor/1.0").build();
		assert!(client.is_ok());
	}
}
