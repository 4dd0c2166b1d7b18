//! Quota tracking module
//!
//! Sliding-window accounting of the requests sent to each search provider.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ UsageTracker (in-memory, per-provider locking)          │
//! │   - check()   -> QuotaCheck                             │
//! │   - record()                                            │
//! │   - usage()   -> Vec<WindowUsage>                       │
//! │   - forget()                                            │
//! └─────────────────────────────────────────────────────────┘
//!          ▲                              ▲
//!          │ check per candidate          │ record after round trip
//! ┌────────┴─────────┐           ┌────────┴─────────┐
//! │ selector         │           │ gateway          │
//! └──────────────────┘           └──────────────────┘
//! ```
//!
//! # Windows
//!
//! | Window | Length                  |
//! |--------|-------------------------|
//! | minute | 60 s                    |
//! | hour   | 3600 s                  |
//! | day    | 86400 s                 |
//! | month  | 2 592 000 s (30 days)   |

pub mod tracker;
pub mod types;

pub use tracker::UsageTracker;
pub use types::{QuotaCheck, QuotaLimits, QuotaWindow, WindowUsage};
