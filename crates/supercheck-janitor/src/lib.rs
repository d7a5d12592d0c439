//! Periodic cleanup of queue residue and orphan repeatable entries
//! (`spec.md` §2.12, §5, §6). Runs independently of the scheduler/
//! dispatcher worker pools on a 12h default interval.

pub mod error;
pub mod sweep;

pub use error::{JanitorError, Result};
pub use sweep::{Janitor, JanitorReport};
