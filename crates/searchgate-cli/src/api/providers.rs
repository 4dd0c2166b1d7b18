//! Admin routes for search providers

use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

use searchgate_core::{ProviderInput, ProviderSummary, ProviderUsage};

use super::{auth::AdminAuth, error::ApiResult, parse_json, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_providers).post(upsert_provider))
        .route("/:id", axum::routing::delete(delete_provider))
        .route("/:id/usage", get(provider_usage))
}

/// All providers in priority order, keys masked
async fn list_providers(_: AdminAuth, State(state): State<AppState>) -> ApiResult<Json<Vec<ProviderSummary>>> {
    let providers = state.registry.list().await?;
    Ok(Json(providers.iter().map(ProviderSummary::from).collect()))
}

async fn upsert_provider(
    _: AdminAuth,
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let input: ProviderInput = parse_json(&body)?;
    let provider = state.registry.upsert(input).await?;
    log::info!("[api] Saved provider {}", provider.id);
    Ok(Json(json!({ "ok": true })))
}

async fn delete_provider(
    _: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let deleted = state.registry.delete(&id).await?;
    Ok(Json(json!({ "ok": true, "deleted": deleted })))
}

async fn provider_usage(
    _: AdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProviderUsage>> {
    Ok(Json(state.registry.usage(&id).await?))
}
