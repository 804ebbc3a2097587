// ABOUTME: Startup readiness polling.
// ABOUTME: Waits for an async check to succeed within a deadline.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        self == Readiness::Ready
    }
}

/// Poll `check` every `interval` until it returns true or `timeout` elapses.
///
/// The check runs at least once. A check call still in flight when the
/// deadline passes is dropped.
pub async fn wait_until_ready<F, Fut>(
    mut check: F,
    timeout: Duration,
    interval: Duration,
) -> Readiness
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    if check().await {
        return Readiness::Ready;
    }

    let poll = async {
        loop {
            tokio::time::sleep(interval).await;
            if check().await {
                return;
            }
            tracing::debug!("Readiness check failed, retrying");
        }
    };

    match tokio::time::timeout(timeout, poll).await {
        Ok(()) => Readiness::Ready,
        Err(_) => Readiness::TimedOut,
    }
}
