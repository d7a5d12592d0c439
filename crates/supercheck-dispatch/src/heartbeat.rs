//! Heartbeat ingress (`spec.md` §6): the push-mode half of heartbeat
//! monitoring. The pull-mode missed-beat sweep lives in
//! `supercheck_probers::heartbeat::evaluate` and runs through
//! `MonitorDispatcher` like any other probe; this module only handles an
//! inbound ping hitting the monitor's `heartbeat_url`.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use supercheck_core::{HeartbeatProbeDetails, MonitorResultDetails, ProbeStatus};
use supercheck_db::{MonitorPatch, Repo};

pub struct HeartbeatReceiver<R: Repo> {
	repo: Arc<R>,
}

impl<R: Repo> HeartbeatReceiver<R> {
	pub fn new(repo: Arc<R>) -> Self {
		Self { repo }
	}

	/// Records an inbound ping. Idempotent in effect: each call inserts a
	/// fresh `up` sample and advances `last_ping_at`, so a retried/duplicate
	/// delivery just looks like two closely-spaced heartbeats rather than
	/// corrupting state.
	#[tracing::instrument(skip(self))]
	pub async fn receive(&self, monitor_id: Uuid) -> supercheck_db::Result<()> {
		let now = Utc::now();

		self
			.repo
			.insert_monitor_result(
				monitor_id,
				now,
				ProbeStatus::Up,
				None,
				MonitorResultDetails::Heartbeat(HeartbeatProbeDetails { check_type: "received".to_string() }),
				true,
			)
			.await?;

		self
			.repo
			.update_monitor(
				monitor_id,
				MonitorPatch { last_ping_at: Some(now), last_check_at: Some(now), ..Default::default() },
			)
			.await?;

		Ok(())
	}
}
