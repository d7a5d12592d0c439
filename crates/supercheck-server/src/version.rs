//! Build information and version utilities for supercheck-server.

pub use supercheck_version::BuildInfo;

/// Format version info for display.
pub fn format_version_info() -> String {
	let info = BuildInfo::current();
	format!(
		"supercheck-server version: {}\n\
         Git SHA:             {}\n\
         Built at:            {}\n\
         Platform:            {}",
		info.version, info.git_sha, info.build_timestamp, info.platform,
	)
}
