//! `Report`: per-entity pointer to the artifact the (out-of-scope) object
//! store produced for a Job's Run or a Monitor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
	Job,
	Monitor,
}

impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Job => write!(f, "job"),
			Self::Monitor => write!(f, "monitor"),
		}
	}
}

impl FromStr for EntityType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"job" => Ok(Self::Job),
			"monitor" => Ok(Self::Monitor),
			other => Err(format!("unknown entity type: {other}")),
		}
	}
}

/// Keyed uniquely by `(entity_type, entity_id)`; `upsertReport` is
/// idempotent on that pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
	pub entity_type: EntityType,
	pub entity_id: Uuid,
	pub status: String,
	pub artifact_url: Option<String>,
	pub artifact_path: String,
	pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn entity_type_roundtrip() {
		for ty in [EntityType::Job, EntityType::Monitor] {
			let parsed: EntityType = ty.to_string().parse().unwrap();
			assert_eq!(ty, parsed);
		}
	}
}
