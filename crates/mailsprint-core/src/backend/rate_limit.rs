//! Per-sender anti-spam rate envelope
//!
//! Rolling 60 s / 3600 s windows over monotonic instants. Admission is
//! atomic (check and record under one lock) so concurrent dispatches
//! cannot overshoot the envelope; entries are pruned lazily on access.

use mailsprint_common::config::SendConfig;
use mailsprint_common::types::SenderId;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);

/// Send limits per rolling window
#[derive(Debug, Clone, Copy)]
pub struct RateEnvelope {
    pub per_minute: u32,
    pub per_hour: u32,
}

impl RateEnvelope {
    pub fn from_config(config: &SendConfig) -> Self {
        Self {
            per_minute: config.per_minute_limit,
            per_hour: config.per_hour_limit,
        }
    }
}

/// Shared per-sender rate limiter
pub struct SendRateLimiter {
    envelope: RateEnvelope,
    windows: Mutex<HashMap<SenderId, VecDeque<Instant>>>,
}

impl SendRateLimiter {
    pub fn new(envelope: RateEnvelope) -> Self {
        Self {
            envelope,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Admit one send for the sender, recording it, or reject if either
    /// window is already at its limit.
    pub async fn try_acquire(&self, sender_id: SenderId) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        let window = windows.entry(sender_id).or_default();

        while let Some(front) = window.front() {
            if now.duration_since(*front) >= HOUR {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.envelope.per_hour as usize {
            debug!(sender = %sender_id, count = window.len(), "hourly send envelope hit");
            return false;
        }

        let minute_count = window
            .iter()
            .rev()
            .take_while(|t| now.duration_since(**t) < MINUTE)
            .count();
        if minute_count >= self.envelope.per_minute as usize {
            debug!(sender = %sender_id, count = minute_count, "per-minute send envelope hit");
            return false;
        }

        window.push_back(now);
        true
    }

    /// Drop expired entries and senders with no recent sends
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, window| {
            while let Some(front) = window.front() {
                if now.duration_since(*front) >= HOUR {
                    window.pop_front();
                } else {
                    break;
                }
            }
            !window.is_empty()
        });
    }

    #[cfg(test)]
    async fn tracked_senders(&self) -> usize {
        self.windows.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn limiter(per_minute: u32, per_hour: u32) -> SendRateLimiter {
        SendRateLimiter::new(RateEnvelope {
            per_minute,
            per_hour,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_minute_window_enforced() {
        let limiter = limiter(3, 100);
        let sender = Uuid::new_v4();

        for _ in 0..3 {
            assert!(limiter.try_acquire(sender).await);
        }
        assert!(!limiter.try_acquire(sender).await);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.try_acquire(sender).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hour_window_enforced() {
        let limiter = limiter(100, 5);
        let sender = Uuid::new_v4();

        for _ in 0..5 {
            assert!(limiter.try_acquire(sender).await);
            tokio::time::advance(Duration::from_secs(120)).await;
        }
        assert!(!limiter.try_acquire(sender).await);

        // the first admission leaves the hour window after enough time
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert!(limiter.try_acquire(sender).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_senders_are_independent() {
        let limiter = limiter(1, 100);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(limiter.try_acquire(a).await);
        assert!(!limiter.try_acquire(a).await);
        assert!(limiter.try_acquire(b).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_drops_stale_senders() {
        let limiter = limiter(10, 100);
        let sender = Uuid::new_v4();

        assert!(limiter.try_acquire(sender).await);
        assert_eq!(limiter.tracked_senders().await, 1);

        tokio::time::advance(Duration::from_secs(3601)).await;
        limiter.cleanup().await;
        assert_eq!(limiter.tracked_senders().await, 0);
    }
}
