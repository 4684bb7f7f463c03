//! Retry support for flaky external calls.

pub mod backoff;

pub use backoff::{calculate_backoff, retry_with_backoff};
