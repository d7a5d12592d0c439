//! Decoupling seam between the dispatchers and the alert engine (§4.10).
//! `supercheck-dispatch` never depends on `supercheck-alerts` directly —
//! the server binary wires a concrete `AlertEngine` in as the sink,
//! mirroring how `Processor` decouples the queue from its consumers.

use async_trait::async_trait;
use supercheck_core::{Job, Monitor, MonitorResult, Run};

#[async_trait]
pub trait JobOutcomeSink: Send + Sync {
	async fn handle_job_outcome(&self, job: &Job, run: &Run);
}

#[async_trait]
pub trait MonitorOutcomeSink: Send + Sync {
	async fn handle_monitor_outcome(&self, monitor: &Monitor, result: &MonitorResult);
}

/// No-op sink for deployments that haven't wired an `AlertEngine` yet, and
/// for tests that don't care about alert fan-out.
pub struct NoopOutcomeSink;

#[async_trait]
impl JobOutcomeSink for NoopOutcomeSink {
	async fn handle_job_outcome(&self, _job: &Job, _run: &Run) {}
}

#[async_trait]
impl MonitorOutcomeSink for NoopOutcomeSink {
	async fn handle_monitor_outcome(&self, _monitor: &Monitor, _result: &MonitorResult) {}
}
