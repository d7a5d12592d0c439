//! Shared HTTP utilities for the Supercheck core.
//!
//! This crate provides a pre-configured [`reqwest::Client`] builder with a
//! consistent User-Agent, and a generic retry-with-backoff helper shared by
//! the webhook notifier and any prober that wants bounded retries.

mod client;
mod retry;

pub use client::{builder, builder_with_user_agent, new_client, new_client_with_timeout, user_agent};
pub use retry::{retry, RetryConfig};
