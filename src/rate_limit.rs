//! Fixed-window rate limiting over an injectable counter store
//!
//! The limiter owns no global state: counts live in a [`CounterStore`]
//! supplied by the caller, so tests get an isolated store and deployments
//! with several instances can back it with something shared.

use crate::error::{ErrorCategory, ErrorKind, JournalError, Result};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Count of requests seen in the current window for one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEntry {
    pub count: u32,
    pub reset_at: Instant,
}

/// Longest window a counter can span. Longer configured windows are capped.
pub const MAX_WINDOW: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

impl WindowEntry {
    /// Start a fresh window at `now`.
    pub fn start(now: Instant, window: Duration) -> Self {
        Self {
            count: 1,
            reset_at: window_end(now, window),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.reset_at
    }
}

/// End of a window opened at `now`, without overflowing `Instant`.
pub fn window_end(now: Instant, window: Duration) -> Instant {
    now.checked_add(window.min(MAX_WINDOW)).unwrap_or(now)
}

/// Storage for per-key window counters.
pub trait CounterStore: Send + Sync {
    fn get(&self, key: &str) -> Option<WindowEntry>;

    /// Atomically count one request for `key`. If there is no entry, or its
    /// window ended at or before `now`, a new window of length `window`
    /// starts with a count of one.
    fn increment(&self, key: &str, now: Instant, window: Duration) -> WindowEntry;

    fn remove(&self, key: &str);

    /// Drop every entry whose window has ended, returning how many were removed.
    fn purge_expired(&self, now: Instant) -> usize;
}

/// Process-local counter store.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, WindowEntry>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-written entry,
    // so a poisoned map is still usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, WindowEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CounterStore for MemoryCounterStore {
    fn get(&self, key: &str) -> Option<WindowEntry> {
        self.lock().get(key).copied()
    }

    fn increment(&self, key: &str, now: Instant, window: Duration) -> WindowEntry {
        let mut entries = self.lock();
        let entry = entries
            .entry(key.to_string())
            .and_modify(|entry| {
                if entry.is_expired(now) {
                    *entry = WindowEntry::start(now, window);
                } else {
                    entry.count = entry.count.saturating_add(1);
                }
            })
            .or_insert_with(|| WindowEntry::start(now, window));
        *entry
    }

    fn remove(&self, key: &str) {
        self.lock().remove(key);
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Requests allowed per window. Zero denies everything.
    pub limit: u32,
    pub window: Duration,
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Requests still allowed in the current window.
    pub remaining: u32,
    pub reset_at: Instant,
}

pub struct RateLimiter<S: CounterStore> {
    store: S,
    config: RateLimitConfig,
}

impl<S: CounterStore> RateLimiter<S> {
    pub fn new(store: S, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn check(&self, key: &str) -> RateLimitDecision {
        self.check_at(key, Instant::now())
    }

    /// Record one request for `key` at `now` and decide whether it is allowed.
    ///
    /// Requests past the limit are still counted but never extend the window.
    pub fn check_at(&self, key: &str, now: Instant) -> RateLimitDecision {
        let limit = self.config.limit;
        let entry = self.store.increment(key, now, self.config.window);

        let decision = RateLimitDecision {
            allowed: entry.count <= limit,
            remaining: limit.saturating_sub(entry.count),
            reset_at: entry.reset_at,
        };
        if !decision.allowed {
            tracing::debug!(key, limit, "rate limit exceeded");
        }
        decision
    }

    /// Like [`check`](Self::check), but a denial is an error.
    pub fn enforce(&self, key: &str) -> Result<RateLimitDecision> {
        let decision = self.check(key);
        if decision.allowed {
            Ok(decision)
        } else {
            Err(JournalError::with_kind(
                ErrorCategory::User,
                ErrorKind::RateLimited,
                "too many requests; try again later",
            ))
        }
    }

    /// Forget the window for `key`.
    pub fn reset(&self, key: &str) {
        self.store.remove(key);
    }

    /// Drop counters whose window has ended. Call this periodically; the
    /// store otherwise keeps one entry for every key it has seen.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let purged = self.store.purge_expired(now);
        if purged > 0 {
            tracing::trace!(purged, "purged expired rate-limit windows");
        }
        purged
    }
}
