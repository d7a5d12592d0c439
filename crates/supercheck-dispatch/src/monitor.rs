//! `MonitorDispatcher` (`spec.md` §4.9): consumes `monitor-execution`
//! tasks, runs the configured prober, persists the result, and updates
//! the monitor's status-transition bookkeeping.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use supercheck_core::MonitorConfig;
use supercheck_db::{MonitorPatch, Repo};
use supercheck_queue::{Processor, QueueJob};

use crate::outcome::MonitorOutcomeSink;

/// Mirrors `supercheck_scheduler::MonitorSchedulePayload`'s wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorExecutionPayload {
	pub monitor_id: Uuid,
	pub config: MonitorConfig,
	pub target: String,
}

pub struct MonitorDispatcher<R: Repo> {
	repo: Arc<R>,
	sink: Arc<dyn MonitorOutcomeSink>,
}

impl<R: Repo> MonitorDispatcher<R> {
	pub fn new(repo: Arc<R>, sink: Arc<dyn MonitorOutcomeSink>) -> Self {
		Self { repo, sink }
	}

	#[tracing::instrument(skip(self, payload), fields(monitor_id = %payload.monitor_id))]
	async fn execute(&self, payload: &MonitorExecutionPayload) -> supercheck_db::Result<serde_json::Value> {
		let monitor = match self.repo.get_monitor(payload.monitor_id).await {
			Ok(monitor) => monitor,
			Err(e) => {
				warn!(monitor_id = %payload.monitor_id, error = %e, "monitor vanished before dispatch could probe it");
				return Ok(serde_json::json!({"skipped": "not_found"}));
			}
		};

		if !monitor.enabled || matches!(monitor.status, supercheck_core::MonitorStatus::Paused | supercheck_core::MonitorStatus::Maintenance) {
			return Ok(serde_json::json!({"skipped": "not_schedulable"}));
		}

		let Some(probe_result) = supercheck_probers::probe(&monitor).await else {
			// Heartbeat still inside its grace window: nothing to persist.
			return Ok(serde_json::json!({"skipped": "heartbeat_grace"}));
		};

		let now = Utc::now();
		let result = self
			.repo
			.insert_monitor_result(
				monitor.id.as_uuid(),
				now,
				probe_result.status,
				probe_result.response_time_ms,
				probe_result.details.clone(),
				probe_result.is_up,
			)
			.await?;

		let next_status = if probe_result.is_up {
			supercheck_core::MonitorStatus::Up
		} else {
			supercheck_core::MonitorStatus::Down
		};
		let status_changed = supercheck_core::MonitorStatus::is_counted_transition(monitor.status, next_status);

		let patch = MonitorPatch {
			last_check_at: Some(now),
			status: status_changed.then_some(next_status),
			last_status_change_at: status_changed.then_some(now),
			..Default::default()
		};
		let updated_monitor = self.repo.update_monitor(monitor.id.as_uuid(), patch).await?;

		self.sink.handle_monitor_outcome(&updated_monitor, &result).await;

		Ok(serde_json::json!({"monitorId": payload.monitor_id, "status": probe_result.status.to_string()}))
	}
}

#[async_trait]
impl<R: Repo> Processor for MonitorDispatcher<R> {
	async fn process(&self, job: &QueueJob) -> std::result::Result<serde_json::Value, String> {
		let payload: MonitorExecutionPayload =
			serde_json::from_value(job.payload.clone()).map_err(|e| e.to_string())?;

		self.execute(&payload).await.map_err(|e| e.to_string())
	}
}
