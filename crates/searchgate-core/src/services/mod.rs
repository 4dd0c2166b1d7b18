//! Services module

pub mod gateway;
pub mod providers;
pub mod quota;
pub mod selector;

pub use gateway::{build_headers, build_search_url, parse_upstream_body, GatewayResponse, SearchGateway};
pub use providers::{ProviderRegistry, ProviderStore, ProviderUsage};
pub use quota::{QuotaCheck, QuotaLimits, QuotaWindow, UsageTracker, WindowUsage};
pub use selector::{select_provider, select_provider_at, SelectionOutcome};
