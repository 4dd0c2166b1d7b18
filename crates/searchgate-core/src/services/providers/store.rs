//! Provider storage layer
//!
//! Handles persistence of search provider records to SQLite.

use sqlx::{FromRow, SqlitePool};

use crate::db::Database;
use crate::error::Result;
use crate::models::SearchProvider;
use crate::services::quota::QuotaLimits;

// ============================================================================
// Database Row Types
// ============================================================================

/// Database row representation of a search provider
///
/// This struct maps directly to the `search_providers` table schema.
#[derive(Debug, Clone, FromRow)]
pub struct StoredSearchProvider {
    pub id: String,
    pub display_name: Option<String>,
    pub base_url: String,
    pub api_key: Option<String>,
    pub priority: i64,
    pub active: bool,
    pub per_minute: Option<i64>,
    pub per_hour: Option<i64>,
    pub per_day: Option<i64>,
    pub per_month: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl StoredSearchProvider {
    /// Convert database row to SearchProvider
    ///
    /// Returns `None` if a stored threshold is out of range.
    pub fn to_search_provider(&self) -> Option<SearchProvider> {
        let limits = QuotaLimits {
            per_minute: stored_threshold(self.per_minute)?,
            per_hour: stored_threshold(self.per_hour)?,
            per_day: stored_threshold(self.per_day)?,
            per_month: stored_threshold(self.per_month)?,
        };

        Some(SearchProvider {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            priority: self.priority,
            active: self.active,
            limits,
        })
    }
}

/// `Some(None)` for unlimited, `None` when the stored value is unusable
fn stored_threshold(value: Option<i64>) -> Option<Option<u32>> {
    match value {
        None => Some(None),
        Some(n) => u32::try_from(n).ok().map(Some),
    }
}

fn to_providers(rows: Vec<StoredSearchProvider>) -> Vec<SearchProvider> {
    rows.iter()
        .filter_map(|row| {
            let provider = row.to_search_provider();
            if provider.is_none() {
                log::warn!(
                    "[providers:store] Skipping provider {} with out-of-range thresholds",
                    row.id
                );
            }
            provider
        })
        .collect()
}

// ============================================================================
// ProviderStore
// ============================================================================

const SELECT_COLUMNS: &str = r#"
    SELECT id, display_name, base_url, api_key, priority, active,
           per_minute, per_hour, per_day, per_month, created_at, updated_at
    FROM search_providers
"#;

/// Storage layer for search providers
///
/// Reads are never cached; every call hits the database.
#[derive(Clone)]
pub struct ProviderStore {
    pool: SqlitePool,
}

impl ProviderStore {
    /// Create a new ProviderStore with the given database pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Self {
        Self::new(db.pool.clone())
    }

    /// Insert or fully replace a provider keyed by id
    ///
    /// An existing row keeps its rowid, so its position among equal
    /// priorities does not change.
    pub async fn upsert(&self, provider: &SearchProvider) -> Result<()> {
        log::debug!("[providers:store] Upserting provider {}", provider.id);

        let limit = |v: Option<u32>| v.map(i64::from);

        sqlx::query(
            r#"
            INSERT INTO search_providers
            (id, display_name, base_url, api_key, priority, active,
             per_minute, per_hour, per_day, per_month, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'), datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                base_url = excluded.base_url,
                api_key = excluded.api_key,
                priority = excluded.priority,
                active = excluded.active,
                per_minute = excluded.per_minute,
                per_hour = excluded.per_hour,
                per_day = excluded.per_day,
                per_month = excluded.per_month,
                updated_at = datetime('now')
            "#,
        )
        .bind(&provider.id)
        .bind(&provider.display_name)
        .bind(&provider.base_url)
        .bind(&provider.api_key)
        .bind(provider.priority)
        .bind(provider.active)
        .bind(limit(provider.limits.per_minute))
        .bind(limit(provider.limits.per_hour))
        .bind(limit(provider.limits.per_day))
        .bind(limit(provider.limits.per_month))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get one provider by id
    pub async fn get(&self, id: &str) -> Result<Option<SearchProvider>> {
        let row = sqlx::query_as::<_, StoredSearchProvider>(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.and_then(|r| r.to_search_provider()))
    }

    /// All providers, active or not, in selection order
    pub async fn list(&self) -> Result<Vec<SearchProvider>> {
        let rows = sqlx::query_as::<_, StoredSearchProvider>(&format!(
            "{} ORDER BY priority ASC, rowid ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(to_providers(rows))
    }

    /// Active providers ordered by priority, ties by registration order
    pub async fn list_active(&self) -> Result<Vec<SearchProvider>> {
        let rows = sqlx::query_as::<_, StoredSearchProvider>(&format!(
            "{} WHERE active = 1 ORDER BY priority ASC, rowid ASC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        let providers = to_providers(rows);
        log::debug!("[providers:store] Found {} active providers", providers.len());
        Ok(providers)
    }

    /// Delete a provider; returns the number of rows removed
    pub async fn delete(&self, id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM search_providers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected();
        log::info!("[providers:store] Deleted {} provider row(s) for {}", deleted, id);
        Ok(deleted)
    }
}

// ============================================================================
// Tests
// ============================================================================
