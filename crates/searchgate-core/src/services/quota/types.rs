//! Quota tracking types
//!
//! Windows, per-provider limits and the results of a quota check.

use serde::{Deserialize, Serialize};

// ============================================================================
// Window Types
// ============================================================================

/// Lookback window a provider threshold is counted over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaWindow {
    /// Last 60 seconds
    Minute,
    /// Last 3600 seconds
    Hour,
    /// Last 86400 seconds
    Day,
    /// Last 30 days
    Month,
}

impl QuotaWindow {
    /// All windows, shortest first
    pub const ALL: [QuotaWindow; 4] = [
        QuotaWindow::Minute,
        QuotaWindow::Hour,
        QuotaWindow::Day,
        QuotaWindow::Month,
    ];

    /// Length of the window in seconds
    pub fn duration_secs(&self) -> i64 {
        match self {
            QuotaWindow::Minute => 60,
            QuotaWindow::Hour => 3_600,
            QuotaWindow::Day => 86_400,
            QuotaWindow::Month => 2_592_000,
        }
    }

    /// Length of the window as a chrono duration
    pub fn duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.duration_secs())
    }
}

impl std::fmt::Display for QuotaWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaWindow::Minute => write!(f, "minute"),
            QuotaWindow::Hour => write!(f, "hour"),
            QuotaWindow::Day => write!(f, "day"),
            QuotaWindow::Month => write!(f, "month"),
        }
    }
}

impl std::str::FromStr for QuotaWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minute" | "per_minute" | "1m" => Ok(QuotaWindow::Minute),
            "hour" | "per_hour" | "1h" => Ok(QuotaWindow::Hour),
            "day" | "per_day" | "1d" => Ok(QuotaWindow::Day),
            "month" | "per_month" | "30d" => Ok(QuotaWindow::Month),
            _ => Err(format!("Unknown quota window: {}", s)),
        }
    }
}

// ============================================================================
// Limits
// ============================================================================

/// Per-window request thresholds; `None` means unlimited on that window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub per_minute: Option<u32>,
    pub per_hour: Option<u32>,
    pub per_day: Option<u32>,
    pub per_month: Option<u32>,
}

impl QuotaLimits {
    /// Limits with no window configured
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Threshold configured for a window
    pub fn limit_for(&self, window: QuotaWindow) -> Option<u32> {
        match window {
            QuotaWindow::Minute => self.per_minute,
            QuotaWindow::Hour => self.per_hour,
            QuotaWindow::Day => self.per_day,
            QuotaWindow::Month => self.per_month,
        }
    }

    /// True when no window carries a threshold
    pub fn is_unlimited(&self) -> bool {
        QuotaWindow::ALL
            .iter()
            .all(|w| self.limit_for(*w).is_none())
    }

    /// Configured `(window, threshold)` pairs, shortest window first
    pub fn configured(&self) -> impl Iterator<Item = (QuotaWindow, u32)> + '_ {
        QuotaWindow::ALL
            .into_iter()
            .filter_map(move |w| self.limit_for(w).map(|limit| (w, limit)))
    }

    /// Longest window carrying a threshold; older history is never counted
    pub fn longest_configured(&self) -> Option<QuotaWindow> {
        self.configured().last().map(|(window, _)| window)
    }

    pub fn with_per_minute(mut self, limit: u32) -> Self {
        self.per_minute = Some(limit);
        self
    }

    pub fn with_per_hour(mut self, limit: u32) -> Self {
        self.per_hour = Some(limit);
        self
    }

    pub fn with_per_day(mut self, limit: u32) -> Self {
        self.per_day = Some(limit);
        self
    }

    pub fn with_per_month(mut self, limit: u32) -> Self {
        self.per_month = Some(limit);
        self
    }
}

// ============================================================================
// Check Results
// ============================================================================

/// Outcome of an eligibility check for one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum QuotaCheck {
    /// Under quota on every configured window
    Allowed,
    /// At least one window is exhausted
    Limited {
        /// The violated window with the longest wait
        window: QuotaWindow,
        /// Whole seconds until that window admits a new request
        retry_after_secs: u64,
    },
}

impl QuotaCheck {
    pub fn is_allowed(&self) -> bool {
        matches!(self, QuotaCheck::Allowed)
    }

    /// Retry hint, `None` when allowed
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            QuotaCheck::Allowed => None,
            QuotaCheck::Limited {
                retry_after_secs, ..
            } => Some(*retry_after_secs),
        }
    }
}

/// Usage of one window for a provider, as reported to admins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowUsage {
    pub window: QuotaWindow,
    /// Requests counted in the window right now
    pub used: u64,
    /// Configured threshold, `None` when unlimited
    pub limit: Option<u32>,
    /// Seconds until the oldest counted request ages out
    pub resets_in_secs: Option<u64>,
    /// Whether this window currently blocks new requests
    pub exhausted: bool,
}

// ============================================================================
// Tests
// ============================================================================
