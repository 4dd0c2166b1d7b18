//! Provider selection with quota failover
//!
//! Walks candidates in priority order and picks the first one the usage
//! tracker admits.

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::models::SearchProvider;
use crate::services::quota::UsageTracker;

/// Result of walking the candidate list
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionOutcome {
    /// First candidate under quota
    Selected(SearchProvider),
    /// Every candidate is over quota
    Rejected {
        /// Hint computed for the last candidate examined
        retry_after_secs: Option<u64>,
    },
}

impl SelectionOutcome {
    pub fn is_selected(&self) -> bool {
        matches!(self, SelectionOutcome::Selected(_))
    }
}

/// Select a provider at the current time
pub fn select_provider(candidates: Vec<SearchProvider>, tracker: &UsageTracker) -> Result<SelectionOutcome> {
    select_provider_at(candidates, tracker, Utc::now())
}

/// Select a provider at `now`
///
/// Candidates must already be in priority order. The walk stops at the
/// first eligible candidate. When none is eligible the rejection carries the
/// retry hint of the last candidate, not the smallest one.
pub fn select_provider_at(
    candidates: Vec<SearchProvider>,
    tracker: &UsageTracker,
    now: DateTime<Utc>,
) -> Result<SelectionOutcome> {
    if candidates.is_empty() {
        return Err(Error::NoProviders);
    }

    let mut last_retry_after = None;
    for provider in candidates {
        let check = tracker.check_at(&provider.id, &provider.limits, now);
        if check.is_allowed() {
            log::debug!("[selector] Selected provider {}", provider.id);
            return Ok(SelectionOutcome::Selected(provider));
        }
        log::debug!(
            "[selector] Provider {} over quota, trying next candidate",
            provider.id
        );
        last_retry_after = check.retry_after_secs();
    }

    Ok(SelectionOutcome::Rejected {
        retry_after_secs: last_retry_after,
    })
}
