//! Clock and timer source
//!
//! Wall-clock schedule math runs on `chrono` timestamps while sleeping runs
//! on the tokio timer wheel. `Clock` bridges the two by anchoring a
//! `DateTime<Utc>` to a `tokio::time::Instant` at construction; under a
//! paused runtime the monotonic side follows virtual time, so tests drive
//! the whole clock with `tokio::time::advance`.

use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Monotonic-backed wall clock
#[derive(Debug, Clone)]
pub struct Clock {
    anchor_utc: DateTime<Utc>,
    anchor_instant: Instant,
}

impl Clock {
    /// Clock anchored at the current system time
    pub fn system() -> Self {
        Self::anchored(Utc::now())
    }

    /// Clock anchored at a fixed wall-clock time; `now()` advances from it
    /// monotonically
    pub fn anchored(at: DateTime<Utc>) -> Self {
        Self {
            anchor_utc: at,
            anchor_instant: Instant::now(),
        }
    }

    /// Current wall-clock time on this clock's timeline
    pub fn now(&self) -> DateTime<Utc> {
        let elapsed = ChronoDuration::from_std(self.anchor_instant.elapsed())
            .unwrap_or_else(|_| ChronoDuration::zero());
        self.anchor_utc + elapsed
    }

    /// Map a wall-clock time onto the monotonic timeline. Times at or
    /// before the anchor map to the anchor instant.
    fn instant_at(&self, at: DateTime<Utc>) -> Instant {
        let offset = (at - self.anchor_utc).to_std().unwrap_or(Duration::ZERO);
        self.anchor_instant + offset
    }

    /// Sleep for a duration
    pub async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Sleep until a wall-clock time; returns immediately if it has passed
    pub async fn sleep_until(&self, at: DateTime<Utc>) {
        tokio::time::sleep_until(self.instant_at(at)).await;
    }

    /// Schedule a one-shot future at a wall-clock time. A deadline in the
    /// past fires on the next executor poll.
    pub fn schedule<F>(&self, at: DateTime<Utc>, fut: F) -> TimerHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = self.instant_at(at);
        TimerHandle::from(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            fut.await;
        }))
    }
}

/// Midnight of the day containing `t`
pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    t.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Cancellable handle to a scheduled timer task
#[derive(Debug)]
pub struct TimerHandle {
    inner: JoinHandle<()>,
}

impl TimerHandle {
    /// Cancel the timer. A timer whose callback is already running is not
    /// interrupted mid-poll; one still sleeping never fires.
    pub fn cancel(&self) {
        self.inner.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

impl From<JoinHandle<()>> for TimerHandle {
    fn from(inner: JoinHandle<()>) -> Self {
        Self { inner }
    }
}
