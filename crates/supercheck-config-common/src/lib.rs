//! Common configuration primitives shared across Supercheck crates.
//!
//! - [`Secret`]/[`SecretString`]: re-exported from [`supercheck_secret`] so
//!   config sections don't need a direct dependency on that crate.
//! - [`load_secret_env`]: load a secret from an environment variable, with
//!   `*_FILE` support so deployments can mount a secret file instead of
//!   putting the value directly in the process environment.

pub mod env;

pub use supercheck_secret::{Secret, SecretString, REDACTED};

pub use env::{load_secret_env, SecretEnvError};
