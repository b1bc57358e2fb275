//! Retry utilities: backoff builders.
//!
//! Uses `backon` for exponential backoff with jitter. Only connection setup
//! retries; mutations are never retried inside the crate.

use std::time::Duration;

use backon::ExponentialBuilder;

/// Backoff for database connection retries at startup.
///
/// - Min delay: 100ms
/// - Max delay: 5s
/// - Max attempts: 10
/// - Jitter enabled
pub fn connection_backoff() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(100))
        .with_max_delay(Duration::from_secs(5))
        .with_max_times(10)
        .with_jitter()
}
