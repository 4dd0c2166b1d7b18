//! Provider registry
//!
//! Admin-facing operations on providers. Couples the persistent store with
//! the in-memory usage tracker so that deleting a provider also drops its
//! accumulated history.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::store::ProviderStore;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{ProviderInput, SearchProvider};
use crate::services::quota::{QuotaCheck, UsageTracker, WindowUsage};

/// Current quota usage of one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUsage {
    pub provider_id: String,
    pub status: QuotaCheck,
    pub windows: Vec<WindowUsage>,
}

/// Provider records plus their usage history
#[derive(Clone)]
pub struct ProviderRegistry {
    store: ProviderStore,
    tracker: Arc<UsageTracker>,
}

impl ProviderRegistry {
    /// Registry over `db` with a fresh usage tracker
    pub fn new(db: &Database) -> Self {
        Self::with_tracker(ProviderStore::from_database(db), Arc::new(UsageTracker::new()))
    }

    pub fn with_tracker(store: ProviderStore, tracker: Arc<UsageTracker>) -> Self {
        Self { store, tracker }
    }

    pub fn store(&self) -> &ProviderStore {
        &self.store
    }

    pub fn tracker(&self) -> &Arc<UsageTracker> {
        &self.tracker
    }

    /// Validate admin input and insert or replace the provider
    pub async fn upsert(&self, input: ProviderInput) -> Result<SearchProvider> {
        let provider = input.validate()?;
        self.store.upsert(&provider).await?;
        log::info!(
            "[registry] Saved provider {} (priority {}, active {})",
            provider.id,
            provider.priority,
            provider.active
        );
        Ok(provider)
    }

    /// Delete a provider and forget its usage history
    ///
    /// Re-creating a provider under the same id starts from zero usage.
    pub async fn delete(&self, id: &str) -> Result<u64> {
        let id = id.trim();
        if id.is_empty() {
            return Err(Error::validation("provider id is required"));
        }

        let deleted = self.store.delete(id).await?;
        self.tracker.forget(id);
        Ok(deleted)
    }

    /// Get a provider or fail with `NotFound`
    pub async fn get(&self, id: &str) -> Result<SearchProvider> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("search provider '{}'", id)))
    }

    pub async fn list(&self) -> Result<Vec<SearchProvider>> {
        self.store.list().await
    }

    /// Active providers in selection order, read fresh on every call
    pub async fn list_active(&self) -> Result<Vec<SearchProvider>> {
        self.store.list_active().await
    }

    /// Per-window usage of a provider right now
    pub async fn usage(&self, id: &str) -> Result<ProviderUsage> {
        let provider = self.get(id).await?;
        Ok(ProviderUsage {
            status: self.tracker.check(&provider.id, &provider.limits),
            windows: self.tracker.usage(&provider.id, &provider.limits),
            provider_id: provider.id,
        })
    }
}
