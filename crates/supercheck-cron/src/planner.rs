//! `CronPlanner`: parses a 5- or 6-field cron expression (an optional
//! leading seconds field ahead of the usual five) and returns the next
//! fire time after a given instant.
//!
//! Times are always UTC — unlike the monitor-scheduling path, which uses
//! a plain `frequencyMinutes` interval, Jobs are the only entity with a
//! cron schedule.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use cron::Schedule;

use crate::error::{CronError, Result};

/// Normalize a 5-, 6-, or 7-field expression to the 7-field
/// `sec min hour dom month dow year` format the `cron` crate expects.
fn normalize(expression: &str) -> String {
	match expression.split_whitespace().count() {
		5 => format!("0 {expression} *"),
		6 => format!("{expression} *"),
		_ => expression.to_string(),
	}
}

/// Parses cron expressions and computes next fire times. Stateless —
/// construction carries no cost, kept as a type for symmetry with the
/// other scheduler-facing components and as an extension point.
#[derive(Debug, Default, Clone, Copy)]
pub struct CronPlanner;

impl CronPlanner {
	pub fn new() -> Self {
		Self
	}

	/// Validates a cron expression without computing a fire time. A hard
	/// user error, never retried.
	pub fn validate(&self, expression: &str) -> Result<()> {
		Schedule::from_str(&normalize(expression))
			.map(|_| ())
			.map_err(|e| CronError::InvalidExpression(expression.to_string(), e.to_string()))
	}

	/// The next fire time strictly after `after`, in UTC.
	pub fn next_fire_after(&self, expression: &str, after: DateTime<Utc>) -> Result<DateTime<Utc>> {
		let schedule = Schedule::from_str(&normalize(expression))
			.map_err(|e| CronError::InvalidExpression(expression.to_string(), e.to_string()))?;

		schedule
			.after(&after)
			.next()
			.ok_or_else(|| CronError::NoNextRun(expression.to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use proptest::prelude::*;

	fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
		Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
	}

	#[test]
	fn five_field_daily_midnight() {
		let planner = CronPlanner::new();
		let next = planner
			.next_fire_after("0 0 * * *", at(2026, 1, 19, 10, 30, 0))
			.unwrap();
		assert_eq!(next, at(2026, 1, 20, 0, 0, 0));
	}

	#[test]
	fn five_field_every_fifteen_minutes() {
		let planner = CronPlanner::new();
		let next = planner
			.next_fire_after("*/15 * * * *", at(2026, 1, 19, 10, 32, 0))
			.unwrap();
		assert_eq!(next, at(2026, 1, 19, 10, 45, 0));
	}

	#[test]
	fn six_field_with_seconds() {
		let planner = CronPlanner::new();
		let next = planner
			.next_fire_after("30 * * * * *", at(2026, 1, 19, 10, 32, 0))
			.unwrap();
		assert_eq!(next, at(2026, 1, 19, 10, 32, 30));
	}

	#[test]
	fn invalid_expression_is_a_user_error() {
		let planner = CronPlanner::new();
		let err = planner.next_fire_after("not a cron", Utc::now()).unwrap_err();
		assert!(matches!(err, CronError::InvalidExpression(_, _)));
	}

	#[test]
	fn invalid_expression_never_validates() {
		let planner = CronPlanner::new();
		assert!(planner.validate("invalid").is_err());
		assert!(planner.validate("60 0 * * *").is_err());
		assert!(planner.validate("* * * *").is_err());
	}

	#[test]
	fn valid_expressions_validate() {
		let planner = CronPlanner::new();
		assert!(planner.validate("0 0 * * *").is_ok());
		assert!(planner.validate("*/15 * * * *").is_ok());
		assert!(planner.validate("0 9 * * 1-5").is_ok());
	}

	proptest! {
		/// Deterministic given inputs: computing twice from the same
		/// `(expression, after)` always yields the same fire time.
		#[test]
		fn deterministic_for_fixed_inputs(minute in 0u32..59, hour in 0u32..23) {
			let expr = format!("{minute} {hour} * * *");
			let planner = CronPlanner::new();
			let after = at(2026, 3, 1, 0, 0, 0);
			let a = planner.next_fire_after(&expr, after);
			let b = planner.next_fire_after(&expr, after);
			prop_assert_eq!(a.is_ok(), b.is_ok());
			if let (Ok(a), Ok(b)) = (a, b) {
				prop_assert_eq!(a, b);
			}
		}

		/// The computed next fire time is always strictly after `after`.
		#[test]
		fn next_fire_is_strictly_after(minute in 0u32..59, hour in 0u32..23) {
			let expr = format!("{minute} {hour} * * *");
			let planner = CronPlanner::new();
			let after = at(2026, 3, 1, 12, 0, 0);
			if let Ok(next) = planner.next_fire_after(&expr, after) {
				prop_assert!(next > after);
			}
		}
	}
}
