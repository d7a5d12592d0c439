//! `AlertEngine` (`spec.md` §4.10): consumes Job/Monitor outcomes off the
//! `supercheck-dispatch` decoupling seam, evaluates alert policy, and fans
//! out to `Notifier` transports.

pub mod engine;
pub mod notifier;
pub mod payload;

pub use engine::AlertEngine;
pub use notifier::{Notifier, TransportNotifier};
pub use payload::{AlertPayload, PayloadField};

use async_trait::async_trait;
use supercheck_core::{Job, Monitor, MonitorResult, Run};
use supercheck_db::Repo;
use supercheck_dispatch::{JobOutcomeSink, MonitorOutcomeSink};

#[async_trait]
impl<R: Repo + 'static> JobOutcomeSink for AlertEngine<R> {
	async fn handle_job_outcome(&self, job: &Job, run: &Run) {
		self.handle_job_outcome(job, run).await;
	}
}

#[async_trait]
impl<R: Repo + 'static> MonitorOutcomeSink for AlertEngine<R> {
	async fn handle_monitor_outcome(&self, monitor: &Monitor, result: &MonitorResult) {
		self.handle_monitor_outcome(monitor, result).await;
	}
}
