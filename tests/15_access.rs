use std::sync::Arc;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header::AUTHORIZATION, Request, StatusCode};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use admin_api_rust::auth::{require_access, CurrentUser, RouteAccess, SessionIdentity, SessionManager};
use admin_api_rust::middleware::session_auth_middleware;
use admin_api_rust::store::{DisabledStore, MemoryStore, SharedStore};

fn router(sessions: SessionManager, access: RouteAccess) -> Router {
    Router::new()
        .route(
            "/guarded",
            get(|CurrentUser(ctx): CurrentUser| async move { ctx.identity.email }),
        )
        .route_layer(from_fn_with_state(access, require_access))
        .route("/open", get(|| async { "open" }))
        .layer(from_fn_with_state(sessions, session_auth_middleware))
}

fn request(path: &str, token: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    Ok(builder.body(Body::empty())?)
}

async fn body_text(response: axum::response::Response) -> Result<String> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

#[tokio::test]
async fn matching_role_reaches_the_handler() -> Result<()> {
    let sessions = SessionManager::with_defaults(Arc::new(MemoryStore::new()));
    let token = sessions
        .create_session(&SessionIdentity::new(1, "ops@example.com").with_roles(["ops"]))
        .await?;
    let app = router(sessions, RouteAccess::authenticated().with_roles(["admin", "ops"]));

    let response = app.oneshot(request("/guarded", Some(&token))?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await?, "ops@example.com");
    Ok(())
}

#[tokio::test]
async fn missing_role_is_forbidden() -> Result<()> {
    let sessions = SessionManager::with_defaults(Arc::new(MemoryStore::new()));
    let token = sessions.create_session(&SessionIdentity::new(2, "user@example.com")).await?;
    let app = router(sessions, RouteAccess::authenticated().with_roles(["admin"]));

    let response = app.oneshot(request("/guarded", Some(&token))?).await?;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let body: Value = serde_json::from_str(&body_text(response).await?)?;
    assert_eq!(body["message"], "Insufficient permissions");
    Ok(())
}

#[tokio::test]
async fn expired_session_is_unauthorized() -> Result<()> {
    let sessions = SessionManager::with_defaults(Arc::new(MemoryStore::new()));
    let token = sessions
        .create_session_with_ttl(&SessionIdentity::new(3, "gone@example.com"), 1)
        .await?;
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    let app = router(sessions, RouteAccess::authenticated());

    let response = app.oneshot(request("/guarded", Some(&token))?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn degraded_store_fails_open_to_anonymous() -> Result<()> {
    let store: SharedStore = Arc::new(DisabledStore);
    let sessions = SessionManager::with_defaults(store);
    let token = sessions.create_session(&SessionIdentity::new(4, "a@example.com")).await?;
    let app = router(sessions, RouteAccess::authenticated());

    let guarded = app.clone().oneshot(request("/guarded", Some(&token))?).await?;
    assert_eq!(guarded.status(), StatusCode::UNAUTHORIZED);

    let open = app.oneshot(request("/open", Some(&token))?).await?;
    assert_eq!(open.status(), StatusCode::OK);
    Ok(())
}
