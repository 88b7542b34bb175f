//! Rate Limiter: enforces a minimum interval between requests to the same host.

use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Per-host last-request timestamp, sharded by `DashMap` so one slow host
/// never blocks another (mirrors the teacher's `host_last_seen: DashMap<String, Instant>`).
pub struct RateLimiter {
    last_seen: DashMap<String, Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_seen: DashMap::new(),
            min_interval,
        }
    }

    /// Block until `min_interval` has elapsed since the last `wait_for` call
    /// for this host, then reserve the next slot. The per-host entry lock is
    /// held only long enough to compute and reserve the wait; the sleep
    /// itself happens after the lock is released, so it never serializes
    /// workers on unrelated hosts.
    pub async fn wait_for(&self, host: &str) {
        let now = Instant::now();
        let wait = {
            let mut slot = self
                .last_seen
                .entry(host.to_string())
                .or_insert_with(|| now - self.min_interval);
            let elapsed = now.saturating_duration_since(*slot);
            let wait = self.min_interval.saturating_sub(elapsed);
            // Reserve the next slot now so a concurrent caller for the same
            // host queues behind this wait instead of racing on the same
            // `last_seen` read.
            *slot = now + wait;
            wait
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_visit_does_not_wait() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        let start = Instant::now();
        limiter.wait_for("ics.uci.edu").await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn second_visit_waits_out_the_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(200));
        limiter.wait_for("ics.uci.edu").await;
        let start = Instant::now();
        limiter.wait_for("ics.uci.edu").await;
        assert!(start.elapsed() >= Duration::from_millis(190));
    }

    #[tokio::test]
    async fn distinct_hosts_do_not_share_state() {
        let limiter = RateLimiter::new(Duration::from_millis(500));
        limiter.wait_for("ics.uci.edu").await;
        let start = Instant::now();
        limiter.wait_for("cs.uci.edu").await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
