//! Search forwarding gateway
//!
//! Picks a provider, forwards the caller's search body to its `/search`
//! endpoint and relays whatever comes back.
//!
//! # Request lifecycle
//!
//! ```text
//! RECEIVED ─► PROVIDER_SELECTION ─┬─► FORWARDING ─► RELAYING ─► DONE
//!                                 ├─► REJECTED (no providers)   404
//!                                 ├─► REJECTED (quota)          429
//!                                 └─ FORWARDING ─► FAILED       502
//! ```
//!
//! A transport failure ends the request; there is no fallback to the next
//! provider. Only quota rejections fail over.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::error::{Error, Result};
use crate::models::SearchProvider;
use crate::services::providers::ProviderRegistry;
use crate::services::quota::{QuotaLimits, UsageTracker};
use crate::services::selector::{select_provider, SelectionOutcome};

/// Path appended to every provider's base URL
pub const SEARCH_PATH: &str = "/search";

/// Upstream response relayed back to the caller
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    /// Provider that served the request
    pub provider_id: String,
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed JSON, or `{"raw": <text>}` when upstream sent something else
    pub body: Value,
}

/// Forwards search requests to the first provider under quota
#[derive(Clone)]
pub struct SearchGateway {
    registry: ProviderRegistry,
    client: Client,
}

impl SearchGateway {
    /// Create a gateway with one pooled HTTP client
    pub fn new(registry: ProviderRegistry, config: &GatewayConfig) -> Result<Self> {
        let config = config.validate();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()?;

        Ok(Self { registry, client })
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Handle one search request
    ///
    /// `credential` is the caller's `Authorization` header value, forwarded
    /// unchanged only to providers without their own key.
    pub async fn handle(&self, body: Value, credential: Option<HeaderValue>) -> Result<GatewayResponse> {
        let request_id = Uuid::new_v4();

        let providers = self.registry.list_active().await?;
        if providers.is_empty() {
            log::warn!("[gateway] {} No active search providers", request_id);
            return Err(Error::NoProviders);
        }

        let provider = match select_provider(providers, self.registry.tracker())? {
            SelectionOutcome::Selected(provider) => provider,
            SelectionOutcome::Rejected { retry_after_secs } => {
                log::warn!(
                    "[gateway] {} All providers over quota (retry after {:?}s)",
                    request_id,
                    retry_after_secs
                );
                return Err(Error::QuotaExceeded { retry_after_secs });
            }
        };

        let url = build_search_url(&provider.base_url);
        let headers = build_headers(&provider, credential)?;
        log::info!(
            "[gateway] {} Forwarding to {} ({})",
            request_id,
            provider.label(),
            url
        );

        // Runs detached so a caller disconnect cannot cancel the upstream
        // call before its usage is recorded.
        let task = tokio::spawn(forward(
            self.client.clone(),
            Arc::clone(self.registry.tracker()),
            provider.id,
            provider.limits,
            url,
            headers,
            body,
            request_id,
        ));

        task.await
            .map_err(|e| Error::internal(format!("Forwarding task failed: {}", e)))?
    }
}

async fn forward(
    client: Client,
    tracker: Arc<UsageTracker>,
    provider_id: String,
    limits: QuotaLimits,
    url: String,
    headers: HeaderMap,
    body: Value,
    request_id: Uuid,
) -> Result<GatewayResponse> {
    let upstream = client
        .post(&url)
        .headers(headers)
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            log::warn!("[gateway] {} Upstream {} unreachable: {}", request_id, provider_id, e);
            Error::upstream(e.to_string())
        })?;

    let status = upstream.status();
    let headers = upstream.headers().clone();
    let text = upstream.text().await.map_err(|e| {
        log::warn!("[gateway] {} Reading upstream body failed: {}", request_id, e);
        Error::upstream(e.to_string())
    })?;

    // Any completed round trip consumes quota, whatever the status
    tracker.record(&provider_id, &limits);

    log::info!(
        "[gateway] {} Upstream {} answered {}",
        request_id,
        provider_id,
        status
    );

    Ok(GatewayResponse {
        provider_id,
        status,
        headers,
        body: parse_upstream_body(text),
    })
}

/// `<base_url without one trailing slash>/search`
pub fn build_search_url(base_url: &str) -> String {
    let base = base_url.strip_suffix('/').unwrap_or(base_url);
    format!("{}{}", base, SEARCH_PATH)
}

/// Outgoing headers: JSON content type plus the winning credential
///
/// A provider's own key always overrides whatever the caller sent.
pub fn build_headers(provider: &SearchProvider, incoming: Option<HeaderValue>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let credential = match &provider.api_key {
        Some(key) => Some(HeaderValue::from_str(&format!("Bearer {}", key)).map_err(|_| {
            Error::internal(format!("api_key of provider {} is not a valid header value", provider.id))
        })?),
        None => incoming,
    };

    if let Some(mut value) = credential {
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }

    Ok(headers)
}

/// Parse an upstream body as JSON, wrapping anything else as `{"raw": text}`
pub fn parse_upstream_body(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => json!({ "raw": text }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::ProviderInput;
    use tempfile::TempDir;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_test_gateway() -> (SearchGateway, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(temp_dir.path().join("test.db"))
            .await
            .expect("Failed to create test database");
        let gateway = SearchGateway::new(ProviderRegistry::new(&db), &GatewayConfig::default())
            .expect("Failed to build gateway");
        (gateway, temp_dir)
    }

    async fn register(gateway: &SearchGateway, input: ProviderInput) {
        gateway.registry().upsert(input).await.expect("Failed to register provider");
    }

    /// Provider with a generous daily limit, so its history is tracked
    fn metered(id: &str, base_url: impl Into<String>) -> ProviderInput {
        let mut input = ProviderInput::new(id, base_url);
        input.per_day = Some(1_000u32.into());
        input
    }

    #[test]
    fn test_build_search_url() {
        assert_eq!(build_search_url("https://a.example"), "https://a.example/search");
        assert_eq!(build_search_url("https://a.example/"), "https://a.example/search");
        assert_eq!(build_search_url("https://a.example/v1/"), "https://a.example/v1/search");
        // Only one trailing slash is stripped
        assert_eq!(build_search_url("https://a.example//"), "https://a.example//search");
    }

    #[test]
    fn test_build_headers_credential_precedence() {
        let incoming = Some(HeaderValue::from_static("Bearer caller"));

        let keyed = SearchProvider::new("a", "https://a.example").with_api_key("own");
        let headers = build_headers(&keyed, incoming.clone()).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer own");
        assert_eq!(headers[CONTENT_TYPE], "application/json");

        let keyless = SearchProvider::new("b", "https://b.example");
        let headers = build_headers(&keyless, incoming).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer caller");

        let headers = build_headers(&keyless, None).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_parse_upstream_body() {
        assert_eq!(parse_upstream_body(r#"{"hits":[1,2]}"#.to_string()), json!({"hits": [1, 2]}));
        assert_eq!(parse_upstream_body("oops".to_string()), json!({"raw": "oops"}));
        assert_eq!(parse_upstream_body(String::new()), json!({"raw": ""}));
    }

    #[tokio::test]
    async fn test_no_active_providers() {
        let (gateway, _dir) = create_test_gateway().await;
        let err = gateway.handle(json!({"q": "rust"}), None).await.unwrap_err();
        assert!(matches!(err, Error::NoProviders));
    }

    #[tokio::test]
    async fn test_provider_key_overrides_caller_credential() {
        let (gateway, _dir) = create_test_gateway().await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer provider-key"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"q": "rust", "limit": 5})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": ["a"]})))
            .expect(1)
            .mount(&server)
            .await;

        let mut input = ProviderInput::new("keyed", format!("{}/", server.uri()));
        input.api_key = Some("provider-key".to_string());
        register(&gateway, input).await;

        let response = gateway
            .handle(
                json!({"q": "rust", "limit": 5}),
                Some(HeaderValue::from_static("Bearer caller-key")),
            )
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.provider_id, "keyed");
        assert_eq!(response.body, json!({"results": ["a"]}));
    }

    #[tokio::test]
    async fn test_keyless_provider_passes_caller_credential() {
        let (gateway, _dir) = create_test_gateway().await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("authorization", "Bearer caller-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        register(&gateway, ProviderInput::new("open", server.uri())).await;

        let response = gateway
            .handle(json!({"q": "x"}), Some(HeaderValue::from_static("Bearer caller-key")))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_no_credential_sends_no_authorization() {
        let (gateway, _dir) = create_test_gateway().await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        register(&gateway, ProviderInput::new("open", server.uri())).await;
        gateway.handle(json!({"q": "x"}), None).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_relays_status_headers_and_records_on_error_status() {
        let (gateway, _dir) = create_test_gateway().await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(500)
                    .insert_header("x-upstream-trace", "abc123")
                    .set_body_json(json!({"error": "boom"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        register(&gateway, metered("flaky", server.uri())).await;

        let response = gateway.handle(json!({"q": "x"}), None).await.unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers["x-upstream-trace"], "abc123");
        assert_eq!(response.body, json!({"error": "boom"}));
        assert_eq!(gateway.registry().tracker().history_len("flaky"), 1);
    }

    #[tokio::test]
    async fn test_non_json_body_is_wrapped() {
        let (gateway, _dir) = create_test_gateway().await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hi</html>"))
            .mount(&server)
            .await;

        register(&gateway, metered("html", server.uri())).await;

        let response = gateway.handle(json!({}), None).await.unwrap();
        assert_eq!(response.body, json!({"raw": "<html>hi</html>"}));
        assert_eq!(gateway.registry().tracker().history_len("html"), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_recorded() {
        let (gateway, _dir) = create_test_gateway().await;
        // Nothing listens on port 1
        register(&gateway, metered("dead", "http://127.0.0.1:1")).await;

        let err = gateway.handle(json!({"q": "x"}), None).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnreachable(_)));
        assert!(err.to_string().starts_with("Upstream request failed:"));
        assert_eq!(gateway.registry().tracker().history_len("dead"), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_does_not_fail_over() {
        let (gateway, _dir) = create_test_gateway().await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut dead = ProviderInput::new("dead", "http://127.0.0.1:1");
        dead.priority = Some(1i64.into());
        register(&gateway, dead).await;
        let mut backup = ProviderInput::new("backup", server.uri());
        backup.priority = Some(2i64.into());
        register(&gateway, backup).await;

        let err = gateway.handle(json!({}), None).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamUnreachable(_)));
    }

    #[tokio::test]
    async fn test_quota_exceeded_carries_retry_hint() {
        let (gateway, _dir) = create_test_gateway().await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let mut input = ProviderInput::new("once", server.uri());
        input.per_hour = Some(1u32.into());
        register(&gateway, input).await;

        gateway.handle(json!({}), None).await.unwrap();
        let err = gateway.handle(json!({}), None).await.unwrap_err();

        let retry = err.retry_after_secs().expect("retry hint");
        assert!(retry > 3_500 && retry <= 3_600);
        assert_eq!(err.status_code(), 429);
    }

    #[tokio::test]
    async fn test_failover_to_next_provider_within_minute() {
        let (gateway, _dir) = create_test_gateway().await;

        let server_a = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"from": "a"})))
            .expect(1)
            .mount(&server_a)
            .await;

        let server_b = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"from": "b"})))
            .expect(1)
            .mount(&server_b)
            .await;

        let mut a = ProviderInput::new("a", server_a.uri());
        a.priority = Some(1i64.into());
        a.per_minute = Some(1u32.into());
        register(&gateway, a).await;

        let mut b = ProviderInput::new("b", server_b.uri());
        b.priority = Some(2i64.into());
        register(&gateway, b).await;

        let first = gateway.handle(json!({"q": 1}), None).await.unwrap();
        assert_eq!(first.provider_id, "a");
        assert_eq!(first.body, json!({"from": "a"}));

        let second = gateway.handle(json!({"q": 2}), None).await.unwrap();
        assert_eq!(second.provider_id, "b");
        assert_eq!(second.body, json!({"from": "b"}));
    }

    #[tokio::test]
    async fn test_caller_drop_still_records_completed_call() {
        let (gateway, _dir) = create_test_gateway().await;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"late": true}))
                    .set_delay(std::time::Duration::from_millis(500)),
            )
            .expect(1)
            .mount(&server)
            .await;

        register(&gateway, metered("slow", server.uri())).await;

        // Caller gives up long before upstream answers
        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            gateway.handle(json!({"q": "x"}), None),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(gateway.registry().tracker().history_len("slow"), 0);

        tokio::time::sleep(std::time::Duration::from_millis(1_000)).await;
        assert_eq!(gateway.registry().tracker().history_len("slow"), 1);
    }
}
