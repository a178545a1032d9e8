// handlers/root.rs - service info, health and the 404 fallback

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// GET /
pub async fn root(State(state): State<AppState>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "name": "Admin API (Rust)",
        "version": env!("CARGO_PKG_VERSION"),
        "environment": state.config.environment,
        "description": "User management API with opaque session tokens",
        "endpoints": {
            "home": "/ (public)",
            "health": "/health (public)",
            "auth": "/auth/login, /auth/me, /auth/logout, /auth/refresh",
            "users": "/users[/:id] (writes require login, delete requires admin)",
            "external": "/users/external[/:id], /users/external/search",
            "stream": "/users/stream/events, /users/stream/raw/:id, /users/stream/stream-json",
        }
    })))
}

/// GET /health - database and session store status; 503 when either is down
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database_ok = matches!(
        tokio::time::timeout(HEALTH_TIMEOUT, state.db.health_check()).await,
        Ok(Ok(()))
    );

    let store = state.sessions.store();
    let store_ok = match tokio::time::timeout(HEALTH_TIMEOUT, store.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::warn!("Session store health check failed: {}", e);
            false
        }
        Err(_) => false,
    };

    let healthy = database_ok && store_ok;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    let label = |ok: bool| if ok { "ok" } else { "unavailable" };

    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "database": label(database_ok),
            "store": {
                "backend": store.name(),
                "status": label(store_ok),
            },
        })),
    )
}

pub async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::not_found(format!("Cannot {} {}", method, uri.path()))
}
