//! Shared build and version information for Supercheck binaries.
//!
//! Single source of truth for version, git SHA, build timestamp, and
//! platform information — used by the HTTP client's User-Agent and by
//! health-check responses.

shadow_rs::shadow!(build);

#[cfg(feature = "serde")]
use serde::Serialize;

/// Platform string in `{os}-{arch}` format, e.g. "linux-x86_64".
pub const PLATFORM: &str = env!("SUPERCHECK_PLATFORM");

/// Core build information used across the server binary and HTTP clients.
#[derive(Debug, Clone, Copy)]
pub struct BuildInfo {
	pub version: &'static str,
	pub git_sha: &'static str,
	pub build_timestamp: &'static str,
	pub platform: &'static str,
}

impl BuildInfo {
	/// Get the current build information (compile-time constants).
	#[allow(clippy::const_is_empty)]
	pub const fn current() -> Self {
		Self {
			version: build::PKG_VERSION,
			git_sha: if build::SHORT_COMMIT.is_empty() {
				"unknown"
			} else {
				build::SHORT_COMMIT
			},
			build_timestamp: build::BUILD_TIME,
			platform: PLATFORM,
		}
	}
}

/// Version info shape used for health checks.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, Copy)]
pub struct HealthVersionInfo {
	pub git_sha: &'static str,
}

impl HealthVersionInfo {
	pub const fn current() -> Self {
		let info = BuildInfo::current();
		Self {
			git_sha: info.git_sha,
		}
	}
}

/// HTTP header names for version information.
pub mod headers {
	pub const VERSION: &str = "X-Supercheck-Version";
	pub const GIT_SHA: &str = "X-Supercheck-Git-Sha";
	pub const BUILD_TIMESTAMP: &str = "X-Supercheck-Build-Timestamp";
	pub const PLATFORM: &str = "X-Supercheck-Platform";
}
