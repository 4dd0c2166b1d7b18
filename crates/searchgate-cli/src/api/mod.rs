//! HTTP API - Axum routes

pub mod auth;
pub mod error;
pub mod health;
pub mod providers;
pub mod search;

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::{header, HeaderName, Method},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use serde::de::DeserializeOwned;
use tower_http::cors::{Any, CorsLayer};

use searchgate_core::{Error, ProviderRegistry, SearchGateway};

/// Requests slower than this are logged as warnings
const SLOW_REQUEST: Duration = Duration::from_secs(5);

/// State shared by every route
#[derive(Clone)]
pub struct AppState {
    pub registry: ProviderRegistry,
    pub gateway: Arc<SearchGateway>,
    /// Admin routes are open when unset
    pub admin_token: Option<Arc<str>>,
}

/// Create the API router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ]);

    Router::new()
        .nest("/api/v1", search::routes().layer(cors))
        .nest("/api/search-providers", providers::routes())
        .route("/api/health", get(health::health))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Decode a JSON request body, rejecting it as a validation error
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body)
        .map_err(|e| Error::validation(format!("Request body is not valid JSON: {}", e)))
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    if elapsed > SLOW_REQUEST {
        log::warn!("[api] Slow request: {} {} took {:?}", method, path, elapsed);
    }
    log::info!(
        "[api] {} {} -> {} in {}ms",
        method,
        path,
        response.status().as_u16(),
        elapsed.as_millis()
    );

    response
}
