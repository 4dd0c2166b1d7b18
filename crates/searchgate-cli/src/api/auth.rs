//! Admin token guard

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};

use searchgate_core::Error;

use super::{error::ApiError, AppState};

/// Header accepted as an alternative to `Authorization: Bearer`
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Extractor that admits a request only when it carries the admin token
///
/// With no token configured every request is admitted.
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_token.as_deref() else {
            return Ok(AdminAuth);
        };

        if presented_tokens(&parts.headers).any(|token| token == expected) {
            Ok(AdminAuth)
        } else {
            Err(Error::auth("Unauthorized").into())
        }
    }
}

fn presented_tokens(headers: &HeaderMap) -> impl Iterator<Item = &str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(strip_bearer);
    let direct = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);
    bearer.into_iter().chain(direct)
}

/// Token part of `Bearer <token>`, scheme matched case-insensitively
fn strip_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(char::is_whitespace)?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_strip_bearer() {
        assert_eq!(strip_bearer("Bearer abc"), Some("abc"));
        assert_eq!(strip_bearer("bearer   abc "), Some("abc"));
        assert_eq!(strip_bearer("Basic abc"), None);
        assert_eq!(strip_bearer("Bearer"), None);
    }

    #[test]
    fn test_presented_tokens_from_both_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer one"));
        headers.insert(ADMIN_TOKEN_HEADER, HeaderValue::from_static(" two "));
        let tokens: Vec<&str> = presented_tokens(&headers).collect();
        assert_eq!(tokens, vec!["one", "two"]);
    }
}
