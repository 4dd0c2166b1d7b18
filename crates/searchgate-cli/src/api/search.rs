//! Search route - forwards the caller's body to the selected provider

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderName},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::Value;

use searchgate_core::{Error, GatewayResponse};

use super::{error::ApiResult, parse_json, AppState};

/// Upstream headers that describe bytes we do not send back verbatim
const DROPPED_HEADERS: [HeaderName; 4] = [
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    header::CONTENT_ENCODING,
];

pub fn routes() -> Router<AppState> {
    Router::new().route("/search", post(search))
}

async fn search(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult<Response> {
    let payload = parse_body(&body)?;
    let credential = headers.get(header::AUTHORIZATION).cloned();
    let upstream = state.gateway.handle(payload, credential).await?;
    Ok(relay(upstream))
}

/// Empty body forwards as `null`
fn parse_body(body: &[u8]) -> Result<Value, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    parse_json(body)
}

fn relay(upstream: GatewayResponse) -> Response {
    let mut response = Json(upstream.body).into_response();
    *response.status_mut() = upstream.status;

    let headers = response.headers_mut();
    for name in upstream.headers.keys() {
        headers.remove(name);
    }
    for (name, value) in upstream.headers.iter() {
        if !DROPPED_HEADERS.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    response
}
