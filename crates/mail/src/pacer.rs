//! Post-send pacing.
//!
//! The dispatcher pauses after every transmission attempt so consecutive
//! sessions do not trip server-side throttling. The strategy is injected so
//! tests can skip the delay.

use std::future::Future;
use std::time::Duration;

pub trait SendPacer: Send + Sync {
    /// Wait before the next transmission may start.
    fn pause(&self) -> impl Future<Output = ()> + Send;
}

/// Sleep for a fixed delay after every attempt.
#[derive(Debug, Clone, Copy)]
pub struct FixedPause {
    delay: Duration,
}

impl FixedPause {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl SendPacer for FixedPause {
    async fn pause(&self) {
        if self.delay.is_zero() {
            return;
        }
        tracing::debug!(delay_secs = self.delay.as_secs_f64(), "Pausing before next send");
        tokio::time::sleep(self.delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn fixed_pause_waits_at_least_delay() {
        let pacer = FixedPause::new(Duration::from_millis(50));
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn zero_delay_returns_immediately() {
        let pacer = FixedPause::new(Duration::ZERO);
        let start = Instant::now();
        pacer.pause().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
