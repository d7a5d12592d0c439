//! `http_request` / `website` prober: issues the configured request,
//! checks the status-code grammar and optional body keyword, and —
//! for `website` monitors with `enableSslCheck` — piggybacks a
//! certificate-expiry check on the same target host.

use std::time::{Duration, Instant};

use reqwest::{Client, Method, Url};
use supercheck_core::{
	AuthType, HttpMethod, HttpMonitorConfig, HttpProbeDetails, MonitorResultDetails, MonitorType,
	ProbeResult, ProbeStatus,
};

use crate::status_grammar;
use crate::tls::{self, TlsCheckResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 5;
const PROBER_USER_AGENT: &str = "Supercheck-Monitor/1.0";

fn to_reqwest_method(method: HttpMethod) -> Method {
	match method {
		HttpMethod::Get => Method::GET,
		HttpMethod::Post => Method::POST,
		HttpMethod::Put => Method::PUT,
		HttpMethod::Patch => Method::PATCH,
		HttpMethod::Delete => Method::DELETE,
		HttpMethod::Head => Method::HEAD,
		HttpMethod::Options => Method::OPTIONS,
	}
}

fn build_client(timeout: Duration) -> Client {
	let mut default_headers = reqwest::header::HeaderMap::new();
	default_headers.insert(reqwest::header::ACCEPT, reqwest::header::HeaderValue::from_static("*/*"));

	supercheck_http::builder_with_user_agent(PROBER_USER_AGENT)
		.default_headers(default_headers)
		.timeout(timeout)
		.redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
		.build()
		.unwrap_or_else(|_| Client::new())
}

/// Runs the probe for an `http_request` or `website` monitor. Never
/// returns `Err` — request failures, non-matching status codes, and
/// missing keywords are all folded into a `down`/`error` [`ProbeResult`].
pub async fn probe(monitor_type: MonitorType, target: &str, config: &HttpMonitorConfig, ssl_last_checked_at: Option<chrono::DateTime<chrono::Utc>>) -> ProbeResult {
	let timeout = config.timeout_seconds.map(Duration::from_secs).unwrap_or(DEFAULT_TIMEOUT);
	let client = build_client(timeout);

	let mut request = client.request(to_reqwest_method(config.method), target);

	if let Some(headers) = &config.headers {
		for (name, value) in headers {
			request = request.header(name, value);
		}
	}

	if let Some(auth) = &config.auth {
		request = match auth.auth_type {
			AuthType::None => request,
			AuthType::Basic => request.basic_auth(auth.username.clone().unwrap_or_default(), auth.password.clone()),
			AuthType::Bearer => request.bearer_auth(auth.token.clone().unwrap_or_default()),
		};
	}

	if let Some(body) = &config.body {
		request = request.body(body.clone());
	}

	let started = Instant::now();
	let response = match request.send().await {
		Ok(resp) => resp,
		Err(e) => {
			tracing::debug!(target, error = %e, "http probe request failed");
			return network_failure_result(e, started.elapsed());
		}
	};

	let status_code = response.status().as_u16();
	let response_time_ms = started.elapsed().as_millis() as u64;

	let body_text = response.text().await.unwrap_or_default();

	let status_matches = status_grammar::matches(config.expected_status_codes_or_default(), status_code);

	let keyword_matched = config.keyword_in_body.as_ref().map(|keyword| {
		let present = body_text.to_lowercase().contains(&keyword.to_lowercase());
		let should_be_present = config.keyword_in_body_should_be_present.unwrap_or(true);
		present == should_be_present
	});

	let keyword_ok = keyword_matched.unwrap_or(true);

	let mut details = HttpProbeDetails {
		status_code: Some(status_code),
		response_time_ms,
		keyword_matched,
		ssl_certificate: None,
		ssl_warning: None,
	};

	let mut status = if status_matches && keyword_ok { ProbeStatus::Up } else { ProbeStatus::Down };

	if monitor_type == MonitorType::Website && config.enable_ssl_check.unwrap_or(false) {
		if let Some(ssl_status) = run_ssl_check(target, config, ssl_last_checked_at, &mut details).await {
			status = downgrade_for_ssl(status, ssl_status);
		}
	}

	ProbeResult {
		status,
		is_up: status.is_up(),
		response_time_ms: Some(response_time_ms),
		details: MonitorResultDetails::Http(details),
		error: if status.is_up() { None } else { Some(failure_reason(status_matches, keyword_ok, status_code)) },
	}
}

fn failure_reason(status_matches: bool, keyword_ok: bool, status_code: u16) -> String {
	if !status_matches {
		format!("unexpected status code {status_code}")
	} else if !keyword_ok {
		"body keyword check failed".to_string()
	} else {
		"ssl certificate check failed".to_string()
	}
}

/// Only downgrades an already-`up` HTTP result; an HTTP-level failure is
/// never masked by a healthy certificate.
fn downgrade_for_ssl(http_status: ProbeStatus, ssl_status: tls::DisplayStatus) -> ProbeStatus {
	if http_status != ProbeStatus::Up {
		return http_status;
	}
	match ssl_status {
		tls::DisplayStatus::Up => ProbeStatus::Up,
		tls::DisplayStatus::Down => ProbeStatus::Down,
		tls::DisplayStatus::Error => ProbeStatus::Error,
		tls::DisplayStatus::Timeout => ProbeStatus::Timeout,
	}
}

async fn run_ssl_check(
	target: &str,
	config: &HttpMonitorConfig,
	ssl_last_checked_at: Option<chrono::DateTime<chrono::Utc>>,
	details: &mut HttpProbeDetails,
) -> Option<tls::DisplayStatus> {
	let url = Url::parse(target).ok()?;
	if url.scheme() != "https" {
		return None;
	}
	let host = url.host_str()?.to_string();
	let port = url.port_or_known_default().unwrap_or(443);
	let warn_days = config.ssl_days_until_expiration_warning.unwrap_or(14);
	let frequency_hours = config.ssl_check_frequency_hours.unwrap_or(24);

	if !tls::should_perform_ssl_check(ssl_last_checked_at, frequency_hours, None, warn_days, chrono::Utc::now()) {
		return None;
	}

	let result = tls::check(&host, port, Duration::from_secs(10), warn_days).await;
	let status = tls::display_status(&result);

	match result {
		TlsCheckResult::Ok { certificate, warning } => {
			details.ssl_certificate = Some(certificate);
			details.ssl_warning = warning;
		}
		TlsCheckResult::Expired { certificate } | TlsCheckResult::NotYetValid { certificate } => {
			details.ssl_certificate = Some(certificate);
		}
		TlsCheckResult::Failed { error, .. } => {
			details.ssl_warning = Some(error);
		}
	}

	Some(status)
}

fn network_failure_result(e: reqwest::Error, elapsed: Duration) -> ProbeResult {
	let status = if e.is_timeout() { ProbeStatus::Timeout } else { ProbeStatus::Down };
	ProbeResult {
		status,
		is_up: false,
		response_time_ms: Some(elapsed.as_millis() as u64),
		details: MonitorResultDetails::Http(HttpProbeDetails {
			status_code: e.status().map(|s| s.as_u16()),
			response_time_ms: elapsed.as_millis() as u64,
			keyword_matched: None,
			ssl_certificate: None,
			ssl_warning: None,
		}),
		error: Some(e.to_string()),
	}
}
