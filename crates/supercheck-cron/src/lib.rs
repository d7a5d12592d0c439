//! Cron expression parsing and next-fire-time computation for the job
//! scheduler. Pure and UTC-only — no I/O, no persistence.

pub mod error;
pub mod planner;

pub use error::{CronError, Result};
pub use planner::CronPlanner;
