//! Generic exponential-backoff retry helper.
//!
//! Mirrors the backoff shape used by the queue's worker retry policy
//! (`BASE_RETRY_DELAY_SECS` / `RETRY_FACTOR` / `MAX_RETRIES`) so a caller
//! outside the queue (the webhook notifier, a prober) gets the same jittered
//! exponential curve without depending on `supercheck-queue`.

use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_secs(1),
			max_delay: Duration::from_secs(30),
		}
	}
}

fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
	let exp = config.base_delay.as_secs_f64() * 2f64.powi(attempt as i32);
	let jittered = exp * (0.5 + fastrand::f64() * 0.5);
	Duration::from_secs_f64(jittered.min(config.max_delay.as_secs_f64()))
}

/// Runs `f` up to `config.max_attempts` times, sleeping with jittered
/// exponential backoff between attempts. Returns the last error if every
/// attempt fails.
pub async fn retry<T, E, F, Fut>(config: RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: std::future::Future<Output = Result<T, E>>,
	E: std::fmt::Display,
{
	let mut attempt = 0;
	loop {
		match f().await {
			Ok(v) => return Ok(v),
			Err(err) if attempt + 1 >= config.max_attempts => return Err(err),
			Err(err) => {
				warn!(attempt, %err, "retrying after transient failure");
				tokio::time::sleep(backoff_delay(&config, attempt)).await;
				attempt += 1;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	#[tokio::test]
	async fn retries_until_success() {
		let calls = AtomicU32::new(0);
		let config = RetryConfig {
			max_attempts: 5,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(5),
		};
		let result: Result<u32, &str> = retry(config, || {
			let n = calls.fetch_add(1, Ordering::SeqCst);
			async move { if n < 2 { Err("not yet") } else { Ok(n) } }
		})
		.await;
		assert_eq!(result, Ok(2));
	}

	#[tokio::test]
	async fn exhausts_attempts_and_returns_last_error() {
		let config = RetryConfig {
			max_attempts: 2,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(2),
		};
		let result: Result<(), &str> = retry(config, || async { Err("always fails") }).await;
		assert_eq!(result, Err("always fails"));
	}
}
