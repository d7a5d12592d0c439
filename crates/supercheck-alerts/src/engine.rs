//! `AlertEngine` (`spec.md` §4.10): evaluates failure/recovery thresholds
//! and SSL-expiry windows, enforces per-target cooldowns, synthesizes
//! payloads, fans out to `Notifier` transports, and records `AlertHistory`.
//!
//! Grounded on `webhook_retry.rs`'s processed/succeeded/failed aggregation
//! shape, generalized from one delivery queue to N providers per alert.

use std::sync::Arc;

use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use supercheck_config::AlertsConfig;
use supercheck_core::{
	AlertConfig, AlertHistory, AlertId, AlertKind, Job, Monitor, MonitorResult, MonitorResultDetails,
	Run, RunStatus, TargetKind,
};
use supercheck_db::Repo;

use crate::notifier::Notifier;
use crate::payload::{AlertPayload, PayloadField};

/// How far back to scan for a consecutive streak: enough to satisfy the
/// configured threshold plus a little slack, capped so a misconfigured
/// huge threshold can't turn this into an unbounded table scan.
fn scan_limit(threshold: u32) -> u32 {
	threshold.max(1).saturating_add(5).min(200)
}

fn consecutive_matching<T: PartialEq>(items: &[T], target: &T) -> u32 {
	items.iter().take_while(|item| *item == target).count() as u32
}

pub struct AlertEngine<R: Repo> {
	repo: Arc<R>,
	notifier: Arc<dyn Notifier>,
	config: AlertsConfig,
}

impl<R: Repo> AlertEngine<R> {
	pub fn new(repo: Arc<R>, notifier: Arc<dyn Notifier>, config: AlertsConfig) -> Self {
		Self { repo, notifier, config }
	}

	#[tracing::instrument(skip(self, job, run), fields(job_id = %job.id, run_id = %run.id))]
	pub async fn handle_job_outcome(&self, job: &Job, run: &Run) {
		let Some(alert_config) = job.alert_config.as_ref().filter(|c| c.enabled) else { return };

		let (kind, threshold_hint) = match run.status {
			RunStatus::Failed if alert_config.alert_on_failure => (AlertKind::JobFailure, alert_config.failure_threshold),
			RunStatus::Passed if alert_config.alert_on_success => (AlertKind::JobSuccess, alert_config.recovery_threshold),
			RunStatus::Timeout if alert_config.alert_on_timeout => (AlertKind::JobTimeout, 1),
			_ => return,
		};

		if kind != AlertKind::JobTimeout {
			let statuses = match self.repo.get_run_statuses_for_job(job.id.as_uuid(), scan_limit(threshold_hint)).await {
				Ok(statuses) => statuses,
				Err(e) => {
					warn!(job_id = %job.id, error = %e, "failed to read run history for alert threshold check");
					return;
				}
			};
			let consecutive = consecutive_matching(&statuses, &run.status);
			if consecutive < threshold_hint {
				return;
			}
		}

		let title = match kind {
			AlertKind::JobFailure => format!("Job \"{}\" failed", job.name),
			AlertKind::JobSuccess => format!("Job \"{}\" recovered", job.name),
			AlertKind::JobTimeout => format!("Job \"{}\" timed out", job.name),
			_ => unreachable!("job outcomes only synthesize the three kinds matched above"),
		};
		let default_message = match kind {
			AlertKind::JobFailure => format!("Run {} failed.", run.id),
			AlertKind::JobSuccess => format!("Run {} passed.", run.id),
			AlertKind::JobTimeout => format!("Run {} exceeded its time limit.", run.id),
			_ => unreachable!(),
		};

		let metadata = json!({
			"dashboardUrl": self.dashboard_url("jobs", &job.id.to_string()),
			"status": run.status.to_string(),
			"durationSec": run.duration_sec,
			"trigger": run.trigger.to_string(),
			"runId": run.id.to_string(),
		});

		let fields = vec![
			PayloadField::short("Job", job.name.clone()),
			PayloadField::short("Status", run.status.to_string()),
			PayloadField::short("Duration (s)", run.duration_sec.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string())),
		];

		let payload = AlertPayload::new(
			kind,
			title,
			alert_config.custom_message.clone().filter(|m| !m.is_empty()).unwrap_or(default_message),
			job.name.clone(),
			job.id.to_string(),
			fields,
			metadata,
		);

		self.fan_out(TargetKind::Job, job.id.as_uuid(), kind, alert_config, payload).await;
	}

	#[tracing::instrument(skip(self, monitor, result), fields(monitor_id = %monitor.id))]
	pub async fn handle_monitor_outcome(&self, monitor: &Monitor, result: &MonitorResult) {
		let Some(alert_config) = monitor.alert_config.as_ref().filter(|c| c.enabled) else { return };

		self.evaluate_status_transition(monitor, result, alert_config).await;
		self.evaluate_ssl_expiry(monitor, result, alert_config).await;
	}

	async fn evaluate_status_transition(&self, monitor: &Monitor, result: &MonitorResult, alert_config: &AlertConfig) {
		let threshold = if result.is_up { alert_config.recovery_threshold } else { alert_config.failure_threshold };
		let history = match self.repo.recent_monitor_results(monitor.id.as_uuid(), scan_limit(threshold)).await {
			Ok(history) => history,
			Err(e) => {
				warn!(monitor_id = %monitor.id, error = %e, "failed to read monitor result history for alert threshold check");
				return;
			}
		};

		// `history` is newest-first and includes `result` itself at index 0.
		// Evaluate on every result rather than gating on a row-to-row flip:
		// a streak can cross the threshold several results after it last
		// flipped (e.g. down,down,down with failureThreshold=3 only flips
		// once, at the first down). Fire exactly when the streak *reaches*
		// the threshold so a longer streak doesn't re-alert on every row.
		let consecutive = history.iter().take_while(|r| r.is_up == result.is_up).count() as u32;

		let kind = if !result.is_up && alert_config.alert_on_failure && consecutive == alert_config.failure_threshold {
			AlertKind::MonitorFailure
		} else if result.is_up && alert_config.alert_on_recovery && consecutive == alert_config.recovery_threshold {
			// Recovery requires the transition to have actually come from
			// `down`: look past the end of the current up-streak (index
			// `consecutive`, the first row the take_while above rejected),
			// not blindly at index 1 which is still inside the streak for
			// any threshold > 1.
			let previous_was_down = history.get(consecutive as usize).map(|r| !r.is_up).unwrap_or(false);
			if !previous_was_down {
				return;
			}
			AlertKind::MonitorRecovery
		} else {
			return;
		};

		let title = match kind {
			AlertKind::MonitorFailure => format!("{} is down", monitor.target),
			AlertKind::MonitorRecovery => format!("{} has recovered", monitor.target),
			_ => unreachable!("status-transition alerts only synthesize failure/recovery"),
		};
		let default_message = match kind {
			AlertKind::MonitorFailure => format!("{} consecutive failed checks.", consecutive),
			AlertKind::MonitorRecovery => format!("{} consecutive successful checks.", consecutive),
			_ => unreachable!(),
		};

		let metadata = json!({
			"dashboardUrl": self.dashboard_url("monitors", &monitor.id.to_string()),
			"status": if result.is_up { "up" } else { "down" },
			"responseTimeMs": result.response_time_ms,
			"consecutiveCount": consecutive,
		});

		let fields = vec![
			PayloadField::short("Target", monitor.target.clone()),
			PayloadField::short("Status", if result.is_up { "up" } else { "down" }.to_string()),
			PayloadField::short("Consecutive checks", consecutive.to_string()),
		];

		let payload = AlertPayload::new(
			kind,
			title,
			alert_config.custom_message.clone().filter(|m| !m.is_empty()).unwrap_or(default_message),
			monitor.target.clone(),
			monitor.id.to_string(),
			fields,
			metadata,
		);

		self.fan_out(TargetKind::Monitor, monitor.id.as_uuid(), kind, alert_config, payload).await;
	}

	async fn evaluate_ssl_expiry(&self, monitor: &Monitor, result: &MonitorResult, alert_config: &AlertConfig) {
		if !alert_config.alert_on_ssl_expiration {
			return;
		}
		let MonitorResultDetails::Http(details) = &result.details else { return };
		let Some(certificate) = details.ssl_certificate.as_ref() else { return };

		let warn_days = alert_config.ssl_days_until_expiration_warning.unwrap_or(30) as i64;
		let kind = if certificate.days_remaining <= 0 {
			AlertKind::SslExpired
		} else if certificate.days_remaining <= warn_days {
			AlertKind::SslExpiring
		} else {
			return;
		};

		// Cooldown is keyed on `ssl_expiring` regardless of whether the
		// current evaluation is `ssl_expiring` or `ssl_expired`: a single
		// gate covers the whole "certificate is going bad" conversation for
		// one monitor so a cert that crosses from warning into expired
		// inside the cooldown window doesn't double-notify.
		match self.repo.last_alert_of_kind(monitor.id.as_uuid(), AlertKind::SslExpiring).await {
			Ok(Some(previous)) => {
				let elapsed = chrono::Utc::now() - previous.sent_at;
				if elapsed < chrono::Duration::hours(self.config.ssl_cooldown_hours as i64) {
					return;
				}
			}
			Ok(None) => {}
			Err(e) => {
				warn!(monitor_id = %monitor.id, error = %e, "failed to read SSL alert cooldown history");
				return;
			}
		}

		let title = match kind {
			AlertKind::SslExpired => format!("SSL certificate expired for {}", monitor.target),
			AlertKind::SslExpiring => format!("SSL certificate expiring soon for {}", monitor.target),
			_ => unreachable!("SSL evaluation only synthesizes the two kinds matched above"),
		};
		let default_message = format!("{} day(s) remaining until expiration.", certificate.days_remaining);

		let metadata = json!({
			"dashboardUrl": self.dashboard_url("monitors", &monitor.id.to_string()),
			"daysRemaining": certificate.days_remaining,
			"sslCertificate": {
				"subjectCn": certificate.subject_cn,
				"issuerCn": certificate.issuer_cn,
				"validTo": certificate.valid_to,
			},
		});

		let fields = vec![
			PayloadField::short("Target", monitor.target.clone()),
			PayloadField::short("Days remaining", certificate.days_remaining.to_string()),
		];

		let payload = AlertPayload::new(
			kind,
			title,
			alert_config.custom_message.clone().filter(|m| !m.is_empty()).unwrap_or(default_message),
			monitor.target.clone(),
			monitor.id.to_string(),
			fields,
			metadata,
		);

		self.fan_out(TargetKind::Monitor, monitor.id.as_uuid(), kind, alert_config, payload).await;
	}

	fn dashboard_url(&self, section: &str, id: &str) -> Option<String> {
		self.config.dashboard_base_url.as_ref().map(|base| format!("{}/{section}/{id}", base.trim_end_matches('/')))
	}

	/// Resolves providers, fans the payload out with a per-request timeout,
	/// aggregates outcomes, and records exactly one `AlertHistory` row.
	#[tracing::instrument(skip(self, alert_config, payload), fields(target_id = %target_id, kind = %kind))]
	async fn fan_out(&self, target_kind: TargetKind, target_id: Uuid, kind: AlertKind, alert_config: &AlertConfig, payload: AlertPayload) {
		let providers = match self.repo.get_providers(&alert_config.provider_ids).await {
			Ok(providers) => providers,
			Err(e) => {
				warn!(target_id = %target_id, error = %e, "failed to resolve alert providers");
				return;
			}
		};

		let resolved: Vec<_> = providers
			.into_iter()
			.filter(|p| {
				if !p.enabled {
					warn!(target_id = %target_id, provider_id = %p.id, "skipping disabled notification provider");
				}
				p.enabled
			})
			.collect();

		let missing = alert_config.provider_ids.len().saturating_sub(resolved.len());
		if missing > 0 {
			warn!(target_id = %target_id, missing, "some configured provider ids did not resolve to a provider");
		}

		let mut succeeded = 0u32;
		let mut errors = Vec::new();
		let timeout = std::time::Duration::from_secs(self.config.webhook_default_timeout_secs);

		for provider in &resolved {
			let outcome = tokio::time::timeout(timeout, self.notifier.send(&payload, provider)).await;
			match outcome {
				Ok(Ok(())) => succeeded += 1,
				Ok(Err(e)) => errors.push(format!("{}: {e}", provider.id)),
				Err(_) => errors.push(format!("{}: notifier timed out after {:?}", provider.id, timeout)),
			}
		}

		let status = if resolved.is_empty() {
			supercheck_core::AlertStatus::Failed
		} else if errors.is_empty() {
			supercheck_core::AlertStatus::Sent
		} else if succeeded == 0 {
			supercheck_core::AlertStatus::Failed
		} else {
			supercheck_core::AlertStatus::Sent
		};

		let error_message = if resolved.is_empty() {
			Some("no enabled providers resolved".to_string())
		} else if errors.is_empty() {
			None
		} else {
			Some(errors.join("; "))
		};

		let alert = AlertHistory {
			id: AlertId::new(),
			kind,
			target_kind,
			target_id,
			message: payload.message.clone(),
			providers: resolved.iter().map(|p| p.id).collect(),
			status,
			error_message,
			sent_at: chrono::Utc::now(),
		};

		if let Err(e) = self.repo.insert_alert_history(alert).await {
			warn!(target_id = %target_id, error = %e, "failed to record alert history");
		}
	}
}
