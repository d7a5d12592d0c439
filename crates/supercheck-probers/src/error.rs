//! Errors surfaced while constructing or driving a prober. Per §4.8's
//! "never throw across the boundary" rule, none of these ever reach a
//! `ProbeResult` — they only cover failures in wiring the probers
//! themselves (an unparseable status-code grammar, a malformed target).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProberError>;

#[derive(Debug, Error)]
pub enum ProberError {
	#[error("invalid target: {0}")]
	InvalidTarget(String),

	#[error("invalid status code grammar: {0}")]
	InvalidStatusGrammar(String),
}
