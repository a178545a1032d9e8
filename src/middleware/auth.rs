use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{AuthContext, SessionManager};

/// Name of the cookie and query parameter that may carry the session token
pub const TOKEN_NAME: &str = "token";

/// Session token authenticator, run on every request.
///
/// Resolves the caller's token and attaches an `AuthContext` when it maps to
/// a live session. Never rejects: lookup failures leave the request
/// anonymous, and `require_access` decides per route.
pub async fn session_auth_middleware(
    State(sessions): State<SessionManager>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_token(request.headers(), request.uri().query()) {
        match sessions.get_user_info(&token).await {
            Ok(Some(identity)) => {
                tracing::debug!("Token resolved: user {} - {}", identity.id, identity.email);
                request.extensions_mut().insert(AuthContext { identity, token });
            }
            Ok(None) => {
                tracing::debug!("Token invalid or expired");
            }
            Err(e) => {
                tracing::error!("Token lookup failed: {}", e);
            }
        }
    }

    next.run(request).await
}

/// Pull the session token from, in order: `Authorization` (with or without a
/// `Bearer ` prefix), the `token` cookie, the `token` query parameter.
pub fn extract_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    if let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(TOKEN_NAME) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    // Query tokens end up in access logs; kept for clients that cannot set headers
    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, value)| key == TOKEN_NAME && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::COOKIE, HeaderValue};

    fn headers(pairs: &[(axum::http::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn bearer_header_wins_over_cookie() {
        let h = headers(&[(AUTHORIZATION, "Bearer X"), (COOKIE, "token=Y")]);
        assert_eq!(extract_token(&h, Some("token=Z")).as_deref(), Some("X"));
    }

    #[test]
    fn raw_authorization_value_is_used_as_is() {
        let h = headers(&[(AUTHORIZATION, "abc123")]);
        assert_eq!(extract_token(&h, None).as_deref(), Some("abc123"));
    }

    #[test]
    fn cookie_then_query() {
        let h = headers(&[(COOKIE, "theme=dark; token=Y")]);
        assert_eq!(extract_token(&h, Some("token=Z")).as_deref(), Some("Y"));
        assert_eq!(extract_token(&HeaderMap::new(), Some("a=1&token=Z")).as_deref(), Some("Z"));
    }

    #[test]
    fn empty_bearer_falls_through() {
        let h = headers(&[(AUTHORIZATION, "Bearer "), (COOKIE, "token=Y")]);
        assert_eq!(extract_token(&h, None).as_deref(), Some("Y"));
        assert_eq!(extract_token(&HeaderMap::new(), None), None);
        assert_eq!(extract_token(&HeaderMap::new(), Some("token=")), None);
    }
}
