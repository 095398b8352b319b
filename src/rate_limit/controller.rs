//! Fixed-window request quota for a single GitLab instance
//!
//! GitLab instances commonly enforce "N requests per minute" per token. This
//! controller admits at most `limit` requests per window and makes the rest
//! wait for the window to reset.
//!
//! Policy:
//! - A request increments the window count and passes when the count was
//!   below `limit`; the request that takes the last slot still passes.
//! - The first admitted request of a window fixes the window deadline and
//!   starts a one-shot timer for it. When the deadline passes the count drops
//!   to zero and every waiter is woken through a `watch` channel.
//! - Every window has an epoch. A request arriving after the deadline resets
//!   the window itself, and a timer only resets the window it was started
//!   for, so a late timer never clears slots of the next window.
//! - Woken waiters go through the gate again, so a window never admits more
//!   than `limit` requests even when many callers were queued.
//! - `destroy()` aborts the timer and closes the reset channel; blocked
//!   waiters are released with [`RateLimitError::Closed`] instead of hanging.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Errors returned by a rate limit controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RateLimitError {
    #[error("Rate limiter was destroyed")]
    Closed,
}

/// Outcome of asking the controller for a slot
#[derive(Debug)]
pub enum RateLimitDecision {
    /// Request may proceed now
    Allow,
    /// Window is full; await the reset and ask again
    Wait(WindowReset),
}

impl RateLimitDecision {
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Future-side handle on the next window reset
#[derive(Debug)]
pub struct WindowReset {
    rx: watch::Receiver<u64>,
}

impl WindowReset {
    /// Resolve once the current window has been reset
    pub async fn wait(mut self) -> Result<(), RateLimitError> {
        self.rx.changed().await.map_err(|_| RateLimitError::Closed)
    }
}

#[derive(Debug)]
struct Window {
    count: u32,
    epoch: u64,
    /// End of the current window; `None` until a request opens one
    deadline: Option<Instant>,
    timer: Option<JoinHandle<()>>,
    /// Reset broadcast carrying the window epoch; `None` once destroyed
    reset_tx: Option<watch::Sender<u64>>,
}

impl Window {
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    fn reset(&mut self) {
        self.count = 0;
        self.epoch = self.epoch.wrapping_add(1);
        self.deadline = None;
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        if let Some(tx) = &self.reset_tx {
            tx.send_replace(self.epoch);
        }
    }
}

#[derive(Debug)]
struct Inner {
    limit: u32,
    interval: Duration,
    window: Mutex<Window>,
}

impl Inner {
    /// Timer side of a reset; ignored when `epoch` is no longer current
    fn reset_window(&self, epoch: u64) {
        let mut window = self.window.lock();
        if window.epoch != epoch || window.reset_tx.is_none() {
            return;
        }
        // The timer is the task running this code.
        window.timer = None;
        window.reset();
        log::debug!("Rate limit window reset (limit {})", self.limit);
    }
}

/// Per-instance request gate
#[derive(Debug, Clone)]
pub struct RateLimitController {
    inner: Arc<Inner>,
}

impl RateLimitController {
    /// Controller admitting `limit` requests per `interval`
    ///
    /// A `limit` of zero would block forever, so it is clamped to one.
    #[must_use]
    pub fn new(limit: u32, interval: Duration) -> Self {
        let (reset_tx, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(Inner {
                limit: limit.max(1),
                interval,
                window: Mutex::new(Window {
                    count: 0,
                    epoch: 0,
                    deadline: None,
                    timer: None,
                    reset_tx: Some(reset_tx),
                }),
            }),
        }
    }

    #[must_use]
    pub fn limit(&self) -> u32 {
        self.inner.limit
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.inner.interval
    }

    /// Requests admitted in the current window
    #[must_use]
    pub fn count(&self) -> u32 {
        let window = self.inner.window.lock();
        if window.is_expired(Instant::now()) {
            0
        } else {
            window.count
        }
    }

    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.count() >= self.inner.limit
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.window.lock().reset_tx.is_none()
    }

    /// Take a slot in the current window or get a handle to wait for the next
    ///
    /// Must be called from within a Tokio runtime: admitting the first
    /// request of a window spawns the reset timer.
    pub fn try_acquire(&self) -> Result<RateLimitDecision, RateLimitError> {
        let mut window = self.inner.window.lock();
        if window.reset_tx.is_none() {
            return Err(RateLimitError::Closed);
        }

        let now = Instant::now();
        if window.is_expired(now) {
            // The timer has not run yet; close the window here.
            window.reset();
        }

        if window.count >= self.inner.limit {
            // Subscribed under the lock, so a reset cannot slip in between.
            let Some(reset_tx) = &window.reset_tx else {
                return Err(RateLimitError::Closed);
            };
            let rx = reset_tx.subscribe();
            return Ok(RateLimitDecision::Wait(WindowReset { rx }));
        }

        window.count += 1;
        if window.deadline.is_none() {
            let deadline = now + self.inner.interval;
            window.deadline = Some(deadline);
            window.timer = Some(self.spawn_reset_timer(window.epoch, deadline));
        }
        Ok(RateLimitDecision::Allow)
    }

    /// Wait until a slot is available
    ///
    /// `on_wait` runs each time the caller has to wait for a window reset,
    /// before it starts waiting.
    pub async fn acquire<F>(&self, mut on_wait: F) -> Result<(), RateLimitError>
    where
        F: FnMut(),
    {
        loop {
            match self.try_acquire()? {
                RateLimitDecision::Allow => return Ok(()),
                RateLimitDecision::Wait(reset) => {
                    on_wait();
                    reset.wait().await?;
                }
            }
        }
    }

    /// Stop the timer and release every waiter with an error
    ///
    /// Idempotent. Any later acquire fails with [`RateLimitError::Closed`].
    pub fn destroy(&self) {
        let mut window = self.inner.window.lock();
        if let Some(timer) = window.timer.take() {
            timer.abort();
        }
        if window.reset_tx.take().is_some() {
            log::debug!("Rate limiter destroyed (limit {})", self.inner.limit);
        }
    }

    fn spawn_reset_timer(&self, epoch: u64, deadline: Instant) -> JoinHandle<()> {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                inner.reset_window(epoch);
            }
        })
    }
}
