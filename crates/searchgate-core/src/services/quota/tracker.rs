//! Sliding-window usage tracker
//!
//! Keeps the raw request timestamps of every provider and answers whether a
//! provider is still under all of its configured thresholds. Counts are
//! computed on demand from the current time; there are no buckets and no
//! background timers.
//!
//! # Locking
//!
//! ```text
//! RwLock<HashMap<provider_id, Arc<Mutex<VecDeque<timestamp>>>>>
//!   │                               │
//!   │ held only to find/insert      │ held for a whole check or record
//!   ▼                               ▼
//! lookup of the provider slot     per-provider history
//! ```
//!
//! Checks and records for the same provider are mutually exclusive, while
//! different providers never wait on each other.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};

use super::types::{QuotaCheck, QuotaLimits, QuotaWindow, WindowUsage};

type History = VecDeque<DateTime<Utc>>;
type Slot = Arc<Mutex<History>>;

// ============================================================================
// UsageTracker
// ============================================================================

/// In-memory request history keyed by provider id
#[derive(Debug, Default)]
pub struct UsageTracker {
    slots: RwLock<HashMap<String, Slot>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a provider against its limits at the current time
    pub fn check(&self, provider_id: &str, limits: &QuotaLimits) -> QuotaCheck {
        self.check_at(provider_id, limits, Utc::now())
    }

    /// Check a provider against its limits at `now`
    ///
    /// A provider is allowed when every configured window counts fewer
    /// requests than its threshold. A threshold of `0` blocks its window as
    /// soon as one request falls inside it. When limited, the reported wait
    /// is the longest among the violated windows.
    pub fn check_at(&self, provider_id: &str, limits: &QuotaLimits, now: DateTime<Utc>) -> QuotaCheck {
        if limits.is_unlimited() {
            return QuotaCheck::Allowed;
        }

        let Some(slot) = self.slot(provider_id) else {
            return QuotaCheck::Allowed;
        };

        let mut history = lock(&slot);
        if let Some(horizon) = limits.longest_configured() {
            prune(&mut history, horizon, now);
        }

        let mut binding: Option<(QuotaWindow, u64)> = None;
        for (window, limit) in limits.configured() {
            let counted = count_in_window(&history, window, now);
            if !counted.exhausts(limit) {
                continue;
            }

            let wait = counted.resets_in_secs(window, now).unwrap_or(0);
            if binding.map_or(true, |(_, longest)| wait > longest) {
                binding = Some((window, wait));
            }
        }

        match binding {
            None => QuotaCheck::Allowed,
            Some((window, retry_after_secs)) => {
                log::debug!(
                    "[quota:tracker] Provider {} limited on {} window, retry in {}s",
                    provider_id,
                    window,
                    retry_after_secs
                );
                QuotaCheck::Limited {
                    window,
                    retry_after_secs,
                }
            }
        }
    }

    /// Record one request for a provider at the current time
    pub fn record(&self, provider_id: &str, limits: &QuotaLimits) {
        self.record_at(provider_id, limits, Utc::now());
    }

    /// Record one request for a provider at `now`
    ///
    /// Only the longest configured window is retained; a provider without
    /// limits keeps no history at all.
    pub fn record_at(&self, provider_id: &str, limits: &QuotaLimits, now: DateTime<Utc>) {
        let Some(horizon) = limits.longest_configured() else {
            self.forget(provider_id);
            return;
        };

        let slot = self.slot_or_insert(provider_id);
        let mut history = lock(&slot);

        // Keep the history sorted even if the clock steps backwards
        let idx = history.partition_point(|t| *t <= now);
        history.insert(idx, now);
        prune(&mut history, horizon, now);

        log::trace!(
            "[quota:tracker] Recorded request for {} ({} in history)",
            provider_id,
            history.len()
        );
    }

    /// Per-window usage report for a provider at the current time
    pub fn usage(&self, provider_id: &str, limits: &QuotaLimits) -> Vec<WindowUsage> {
        self.usage_at(provider_id, limits, Utc::now())
    }

    /// Per-window usage report for a provider at `now`, shortest window first
    ///
    /// Windows longer than the longest configured one only see retained
    /// history, so their `used` count can be lower than the true traffic.
    pub fn usage_at(&self, provider_id: &str, limits: &QuotaLimits, now: DateTime<Utc>) -> Vec<WindowUsage> {
        let slot = self.slot(provider_id);
        let mut guard = slot.as_ref().map(|s| lock(s));
        if let (Some(history), Some(horizon)) = (guard.as_deref_mut(), limits.longest_configured()) {
            prune(history, horizon, now);
        }
        let empty = History::new();
        let history = guard.as_deref().unwrap_or(&empty);

        QuotaWindow::ALL
            .into_iter()
            .map(|window| {
                let counted = count_in_window(history, window, now);
                let limit = limits.limit_for(window);
                WindowUsage {
                    window,
                    used: counted.count,
                    limit,
                    resets_in_secs: counted.resets_in_secs(window, now),
                    exhausted: limit.map_or(false, |l| counted.exhausts(l)),
                }
            })
            .collect()
    }

    /// Drop all history for a provider; returns whether any existed
    pub fn forget(&self, provider_id: &str) -> bool {
        let removed = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(provider_id)
            .is_some();
        if removed {
            log::debug!("[quota:tracker] Forgot usage history for {}", provider_id);
        }
        removed
    }

    /// Number of timestamps currently retained for a provider
    pub fn history_len(&self, provider_id: &str) -> usize {
        self.slot(provider_id).map_or(0, |slot| lock(&slot).len())
    }

    fn slot(&self, provider_id: &str) -> Option<Slot> {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider_id)
            .cloned()
    }

    fn slot_or_insert(&self, provider_id: &str) -> Slot {
        if let Some(slot) = self.slot(provider_id) {
            return slot;
        }
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(provider_id.to_string())
            .or_default()
            .clone()
    }
}

// ============================================================================
// Window Counting
// ============================================================================

/// Requests counted in one window
struct WindowCount {
    count: u64,
    /// Oldest timestamp still inside the window
    oldest: Option<DateTime<Utc>>,
}

impl WindowCount {
    fn exhausts(&self, limit: u32) -> bool {
        self.count > 0 && self.count >= u64::from(limit)
    }

    /// Whole seconds (rounded up) until the oldest counted request ages out
    fn resets_in_secs(&self, window: QuotaWindow, now: DateTime<Utc>) -> Option<u64> {
        let oldest = self.oldest?;
        let remaining_ms = (window.duration() - (now - oldest))
            .num_milliseconds()
            .max(0);
        Some(((remaining_ms + 999) / 1000) as u64)
    }
}

/// Count timestamps with `t > now - window`
fn count_in_window(history: &History, window: QuotaWindow, now: DateTime<Utc>) -> WindowCount {
    let cutoff = now - window.duration();
    let start = history.partition_point(|t| *t <= cutoff);
    WindowCount {
        count: (history.len() - start) as u64,
        oldest: history.get(start).copied(),
    }
}

/// Drop timestamps older than `horizon`, the longest window still counted
fn prune(history: &mut History, horizon: QuotaWindow, now: DateTime<Utc>) {
    let cutoff = now - horizon.duration();
    while history.front().map_or(false, |t| *t <= cutoff) {
        history.pop_front();
    }
}

fn lock(slot: &Mutex<History>) -> MutexGuard<'_, History> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// Tests
// ============================================================================
