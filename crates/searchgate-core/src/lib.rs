//! # searchgate-core
//!
//! Core logic for searchgate, a gateway that forwards search requests to one
//! of several upstream providers while enforcing per-provider quotas.
//!
//! This crate provides:
//! - Provider persistence (`db` module, `services::providers`)
//! - Validated provider models (`models` module)
//! - Sliding-window quota accounting (`services::quota`)
//! - Provider selection and request forwarding (`services::selector`, `services::gateway`)
//! - Gateway configuration (`config` module)
//! - Unified error handling (`error` module)

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

// Re-exports for convenience
pub use config::GatewayConfig;
pub use db::Database;
pub use error::{Error, Result};

pub use models::{ProviderInput, ProviderSummary, SearchProvider};

pub use services::{
    GatewayResponse, ProviderRegistry, ProviderStore, ProviderUsage, QuotaCheck, QuotaLimits,
    QuotaWindow, SearchGateway, SelectionOutcome, UsageTracker, WindowUsage,
};
