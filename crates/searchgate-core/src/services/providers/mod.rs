//! Search provider registry and storage

pub mod registry;
pub mod store;

pub use registry::{ProviderRegistry, ProviderUsage};
pub use store::{ProviderStore, StoredSearchProvider};
