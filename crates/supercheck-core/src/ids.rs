//! Opaque 128-bit entity identifiers.
//!
//! Every entity is keyed by a UUID v4 wrapped in a distinct
//! newtype so `JobId` and `MonitorId` can't be swapped by accident at a call
//! site. `impl_id!` generates the `Display`/`FromStr`/`new`/`Default` idiom
//! once instead of repeating it per type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! impl_id {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(pub Uuid);

		impl $name {
			pub fn new() -> Self {
				Self(Uuid::new_v4())
			}

			pub fn as_uuid(&self) -> Uuid {
				self.0
			}
		}

		impl Default for $name {
			fn default() -> Self {
				Self::new()
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Ok(Self(Uuid::parse_str(s)?))
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}
	};
}

impl_id!(JobId, "Unique identifier for a Job.");
impl_id!(RunId, "Unique identifier for a Run.");
impl_id!(TestScriptId, "Unique identifier for a TestScript.");
impl_id!(MonitorId, "Unique identifier for a Monitor.");
impl_id!(MonitorResultId, "Unique identifier for a MonitorResult.");
impl_id!(ProviderId, "Unique identifier for a NotificationProvider.");
impl_id!(AlertId, "Unique identifier for an AlertHistory row.");

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn roundtrips_through_display_and_from_str() {
		let id = JobId::new();
		let rendered = id.to_string();
		let parsed: JobId = rendered.parse().unwrap();
		assert_eq!(id, parsed);
	}

	#[test]
	fn distinct_id_types_do_not_mix_structurally() {
		let job = JobId::new();
		let monitor = MonitorId::new();
		assert_ne!(job.as_uuid(), Uuid::nil());
		assert_ne!(monitor.as_uuid(), Uuid::nil());
	}
}
