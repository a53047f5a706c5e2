//! Bounded wake-locks for the alarm dispatch path.
//!
//! ## Overview
//!
//! A wake-lock keeps the device awake while an alarm-triggered task runs. It is
//! always acquired with a timeout, so a payload that never reports completion
//! cannot pin the device forever.
//! - [`WakeLock`] / [`PowerManager`] are the OS seams an embedder implements.
//! - [`TimedWakeLock`] is an in-process implementation backed by a tokio timer,
//!   used where the platform has no native wake-lock (and by the demo host).
use std::sync::{
    Arc, Mutex, PoisonError, Weak,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;

use tokio::{runtime::Handle, time::Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A device wake-lock owned by exactly one holder.
pub trait WakeLock: Send + Sync {
    fn tag(&self) -> &str;
    /// Hold the lock for at most `timeout`.
    fn acquire(&self, timeout: Duration);
    fn is_held(&self) -> bool;
    /// Release the lock; releasing a lock that is not held is a no-op.
    fn release(&self);
}

/// Creates wake-locks.
pub trait PowerManager: Send + Sync {
    fn new_wake_lock(&self, tag: &str) -> Arc<dyn WakeLock>;
}

#[derive(Default)]
struct Window {
    acquired_at: Option<Instant>,
    released_at: Option<Instant>,
    expiry: Option<CancellationToken>,
}

/// Wake-lock that expires on its own after the acquire timeout.
pub struct TimedWakeLock {
    tag: String,
    held: AtomicBool,
    window: Mutex<Window>,
    handle: Handle,
    me: Weak<TimedWakeLock>,
}

impl TimedWakeLock {
    pub fn new(tag: impl Into<String>, handle: Handle) -> Arc<Self> {
        let tag = tag.into();
        Arc::new_cyclic(|me| Self {
            tag,
            held: AtomicBool::new(false),
            window: Mutex::new(Window::default()),
            handle,
            me: me.clone(),
        })
    }

    /// How long the lock was held, once it has been released or has expired.
    pub fn held_for(&self) -> Option<Duration> {
        let window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        Some(window.released_at?.duration_since(window.acquired_at?))
    }

    /// Returns `true` if this call moved the lock from held to released.
    fn settle(&self) -> bool {
        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = window.expiry.take() {
            token.cancel();
        }
        if !self.held.swap(false, Ordering::AcqRel) {
            return false;
        }
        window.released_at = Some(Instant::now());
        true
    }
}

impl WakeLock for TimedWakeLock {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn acquire(&self, timeout: Duration) {
        let token = CancellationToken::new();
        {
            let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(prev) = window.expiry.replace(token.clone()) {
                prev.cancel();
            }
            window.acquired_at = Some(Instant::now());
            window.released_at = None;
            self.held.store(true, Ordering::Release);
        }

        let me = self.me.clone();
        self.handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if let Some(lock) = me.upgrade()
                        && lock.settle()
                    {
                        warn!(tag = %lock.tag, ?timeout, "wake lock expired before release");
                    }
                }
            }
        });
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }

    fn release(&self) {
        if self.settle() {
            debug!(tag = %self.tag, "wake lock released");
        }
    }
}

/// Hands out [`TimedWakeLock`]s driven by one tokio runtime.
#[derive(Clone)]
pub struct TimedPowerManager {
    handle: Handle,
}

impl TimedPowerManager {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }
}

impl PowerManager for TimedPowerManager {
    fn new_wake_lock(&self, tag: &str) -> Arc<dyn WakeLock> {
        TimedWakeLock::new(tag, self.handle.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn release_before_bound_ends_hold_early() {
        let lock = TimedWakeLock::new("test::early", Handle::current());
        lock.acquire(Duration::from_millis(29_000));
        assert!(lock.is_held());

        tokio::time::sleep(Duration::from_millis(5_000)).await;
        lock.release();

        assert!(!lock.is_held());
        assert_eq!(lock.held_for(), Some(Duration::from_millis(5_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn lock_self_expires_at_bound() {
        let lock = TimedWakeLock::new("test::expiry", Handle::current());
        lock.acquire(Duration::from_millis(29_000));

        tokio::time::sleep(Duration::from_millis(28_999)).await;
        assert!(lock.is_held());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!lock.is_held());
        assert_eq!(lock.held_for(), Some(Duration::from_millis(29_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn double_release_is_noop() {
        let lock = TimedWakeLock::new("test::double", Handle::current());
        lock.acquire(Duration::from_secs(10));

        tokio::time::sleep(Duration::from_secs(1)).await;
        lock.release();
        tokio::time::sleep(Duration::from_secs(1)).await;
        lock.release();

        assert!(!lock.is_held());
        assert_eq!(lock.held_for(), Some(Duration::from_secs(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn released_lock_is_not_expired_later() {
        let lock = TimedWakeLock::new("test::late", Handle::current());
        lock.acquire(Duration::from_secs(2));
        lock.release();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(lock.held_for(), Some(Duration::ZERO));
    }
}
