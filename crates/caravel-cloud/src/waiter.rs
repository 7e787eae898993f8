//! Readiness polling
//!
//! Cloud resources are eventually consistent: a file system must be
//! `available` before mount targets can attach, a load balancer must be
//! `active` before it serves traffic. Instead of fixed sleeps, callers poll
//! a probe until it reports ready or the timeout elapses.

use crate::error::{CloudError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Polling configuration for readiness waits
#[derive(Debug, Clone)]
pub struct WaitConfig {
    /// Delay between probes
    pub interval: Duration,

    /// Total time to wait before giving up
    pub timeout: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

impl WaitConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Poll `probe` until it returns `true` or the timeout elapses.
///
/// Probe errors abort the wait immediately; an already-ready resource
/// returns without sleeping.
pub async fn wait_until<F, Fut>(
    resource: &str,
    condition: &str,
    config: &WaitConfig,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    let started = Instant::now();

    loop {
        if probe().await? {
            tracing::debug!(
                "{} became {} after {:?}",
                resource,
                condition,
                started.elapsed()
            );
            return Ok(());
        }

        if started.elapsed() >= config.timeout {
            return Err(CloudError::WaitTimeout {
                resource: resource.to_string(),
                condition: condition.to_string(),
                waited_secs: started.elapsed().as_secs(),
            });
        }

        tracing::debug!("Waiting for {} to become {}", resource, condition);
        sleep(config.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_ready_immediately_returns_without_sleeping() {
        let config = WaitConfig::new(Duration::from_secs(60), Duration::from_secs(120));
        let started = Instant::now();

        wait_until("fs-123", "available", &config, || async { Ok(true) })
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_becomes_ready_after_retries() {
        let config = WaitConfig::new(Duration::from_millis(1), Duration::from_secs(5));
        let attempts = AtomicU32::new(0);

        wait_until("alb", "active", &config, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move { Ok(n >= 2) }
        })
        .await
        .unwrap();

        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_is_an_error() {
        let config = WaitConfig::new(Duration::from_millis(1), Duration::from_millis(5));

        let result = wait_until("svc", "stable", &config, || async { Ok(false) }).await;

        match result {
            Err(CloudError::WaitTimeout { resource, condition, .. }) => {
                assert_eq!(resource, "svc");
                assert_eq!(condition, "stable");
            }
            other => panic!("expected WaitTimeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_error_aborts() {
        let config = WaitConfig::new(Duration::from_millis(1), Duration::from_secs(5));

        let result = wait_until("fs", "available", &config, || async {
            Err(CloudError::ApiError("boom".into()))
        })
        .await;

        assert!(matches!(result, Err(CloudError::ApiError(_))));
    }
}
