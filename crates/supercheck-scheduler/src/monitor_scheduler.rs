//! Reconciles the `monitors` table into `monitor-scheduler` repeatable
//! entries, and processes their firings into `monitor-execution` tasks.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use supercheck_core::{MonitorConfig, MonitorStatus, MONITOR_EXECUTION_QUEUE, MONITOR_SCHEDULER_QUEUE};
use supercheck_db::Repo;
use supercheck_queue::{Backoff, EnqueueOptions, Processor, Queue, QueueJob, RepeatSchedule, RepeatableSpec};

use crate::error::Result;

const EXECUTION_ATTEMPTS: u32 = 3;
const EXECUTION_BACKOFF_BASE_MS: i64 = 5_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSchedulePayload {
	pub monitor_id: Uuid,
	pub config: MonitorConfig,
	pub target: String,
}

fn repeatable_key(monitor_id: Uuid) -> String {
	format!("monitor:{monitor_id}")
}

/// A monitor is scheduled iff it's `enabled` and not `paused`/`maintenance`
/// — those statuses keep the row around without probing it.
fn is_schedulable(status: MonitorStatus) -> bool {
	!matches!(status, MonitorStatus::Paused | MonitorStatus::Maintenance)
}

pub struct MonitorScheduler<R: Repo> {
	repo: Arc<R>,
	queue: Queue,
	known_keys: Mutex<HashSet<String>>,
}

impl<R: Repo> MonitorScheduler<R> {
	pub fn new(repo: Arc<R>, queue: Queue) -> Self {
		Self { repo, queue, known_keys: Mutex::new(HashSet::new()) }
	}

	#[tracing::instrument(skip(self))]
	pub async fn reconcile(&self) -> Result<()> {
		let monitors = self.repo.list_enabled_monitors().await?;
		let mut current_keys = HashSet::with_capacity(monitors.len());

		for monitor in &monitors {
			let key = repeatable_key(monitor.id.as_uuid());
			if !monitor.enabled || !is_schedulable(monitor.status) {
				if let Err(e) = self.queue.delete_repeatable(&key).await {
					warn!(monitor_id = %monitor.id, error = %e, "failed removing paused monitor repeatable");
				}
				continue;
			}

			let payload = MonitorSchedulePayload {
				monitor_id: monitor.id.as_uuid(),
				config: monitor.config.clone(),
				target: monitor.target.clone(),
			};
			let next_fire = Utc::now() + ChronoDuration::minutes(monitor.frequency_minutes as i64);

			self.queue
				.upsert_repeatable(
					MONITOR_SCHEDULER_QUEUE,
					serde_json::to_value(&payload)?,
					RepeatableSpec {
						key: key.clone(),
						schedule: RepeatSchedule::EveryMs(monitor.frequency_minutes as i64 * 60_000),
					},
					next_fire,
				)
				.await?;
			current_keys.insert(key);
		}

		let mut known = self.known_keys.lock().await;
		for stale_key in known.difference(&current_keys).cloned().collect::<Vec<_>>() {
			if let Err(e) = self.queue.delete_repeatable(&stale_key).await {
				warn!(key = %stale_key, error = %e, "failed removing stale monitor repeatable");
			}
		}
		info!(scheduled = current_keys.len(), "monitor scheduler reconciled");
		*known = current_keys;
		Ok(())
	}
}

/// Processes a `monitor-scheduler` firing by enqueuing the probe task;
/// probing itself happens in the dispatcher, which owns the prober fleet.
pub struct MonitorSchedulerProcessor {
	queue: Queue,
}

impl MonitorSchedulerProcessor {
	pub fn new(queue: Queue) -> Self {
		Self { queue }
	}
}

#[async_trait]
impl Processor for MonitorSchedulerProcessor {
	async fn process(&self, job: &QueueJob) -> std::result::Result<serde_json::Value, String> {
		let payload: MonitorSchedulePayload =
			serde_json::from_value(job.payload.clone()).map_err(|e| e.to_string())?;

		let opts = EnqueueOptions {
			// Keyed by `monitorId` alone (not the firing's queue job id) so
			// a second firing while one probe is still active/waiting is
			// silently rejected, per the at-most-one-in-flight guarantee.
			job_id: Some(payload.monitor_id.to_string()),
			attempts: EXECUTION_ATTEMPTS,
			backoff: Backoff::exponential(EXECUTION_BACKOFF_BASE_MS),
			..Default::default()
		};

		self.queue
			.enqueue(MONITOR_EXECUTION_QUEUE, job.payload.clone(), opts)
			.await
			.map_err(|e| e.to_string())?;

		Ok(serde_json::json!({"monitorId": payload.monitor_id}))
	}
}
