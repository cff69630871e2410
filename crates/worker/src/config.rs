use std::str::FromStr;
use std::time::Duration;

use muster_core::jobs::RetryPolicy;

/// Worker configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent claim loops (default: `4`).
    pub concurrency: usize,
    /// Delay between polls when the queue is empty (default: 1 s).
    pub poll_interval: Duration,
    /// Backoff and attempt limit for failed jobs.
    pub retry: RetryPolicy,
    /// Active jobs claimed longer ago than this are requeued at startup
    /// (default: 15 min).
    pub lease_timeout: Duration,
    /// Optional realtime relay endpoint for association notifications.
    pub pusher_relay_url: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_millis(1000),
            retry: RetryPolicy::default(),
            lease_timeout: Duration::from_secs(900),
            pusher_relay_url: None,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default |
    /// |---------------------------|---------|
    /// | `WORKER_CONCURRENCY`      | `4`     |
    /// | `WORKER_POLL_INTERVAL_MS` | `1000`  |
    /// | `JOB_MAX_ATTEMPTS`        | `3`     |
    /// | `JOB_RETRY_BASE_MS`       | `2000`  |
    /// | `JOB_RETRY_MAX_MS`        | `60000` |
    /// | `JOB_LEASE_TIMEOUT_SECS`  | `900`   |
    /// | `PUSHER_RELAY_URL`        | unset   |
    pub fn from_env() -> Self {
        let concurrency: usize = env_or("WORKER_CONCURRENCY", 4);
        assert!(concurrency > 0, "WORKER_CONCURRENCY must be at least 1");

        let retry = RetryPolicy {
            max_attempts: env_or("JOB_MAX_ATTEMPTS", 3),
            base_delay: Duration::from_millis(env_or("JOB_RETRY_BASE_MS", 2000)),
            max_delay: Duration::from_millis(env_or("JOB_RETRY_MAX_MS", 60_000)),
        };

        let pusher_relay_url = std::env::var("PUSHER_RELAY_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            concurrency,
            poll_interval: Duration::from_millis(env_or("WORKER_POLL_INTERVAL_MS", 1000)),
            retry,
            lease_timeout: Duration::from_secs(env_or("JOB_LEASE_TIMEOUT_SECS", 900)),
            pusher_relay_url,
        }
    }
}

/// Parse `name` from the environment, falling back to `default` when unset.
///
/// # Panics
///
/// If the variable is set but does not parse.
fn env_or<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}
