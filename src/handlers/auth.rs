// handlers/auth.rs - /auth/* session endpoints

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{CurrentUser, MaybeUser, SessionIdentity};
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{LoginCmd, LoginVo};
use crate::state::AppState;

/// POST /auth/login - `{email, password}` -> `{token, user}`
pub async fn login(State(state): State<AppState>, payload: Result<Json<LoginCmd>, JsonRejection>) -> ApiResult<LoginVo> {
    let Json(cmd) = payload?;
    let result = state.auth.login(cmd).await?;
    Ok(ApiResponse::success(result))
}

/// GET /auth/me - the caller's identity, `null` when anonymous
pub async fn me(MaybeUser(ctx): MaybeUser) -> ApiResult<Option<SessionIdentity>> {
    Ok(ApiResponse::success(ctx.map(|c| c.identity)))
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>, MaybeUser(ctx): MaybeUser) -> ApiResult<Value> {
    if let Some(ctx) = ctx {
        let existed = state.auth.logout(&ctx.token).await?;
        tracing::info!("User {} logged out (session existed: {})", ctx.identity.id, existed);
    }
    Ok(ApiResponse::success(json!({ "message": "Logged out successfully" })))
}

/// POST /auth/refresh - extend the current session by the default TTL
pub async fn refresh(State(state): State<AppState>, CurrentUser(ctx): CurrentUser) -> ApiResult<Value> {
    let refreshed = state.auth.refresh(&ctx.token).await?;
    Ok(ApiResponse::success(json!({
        "refreshed": refreshed,
        "expiresIn": state.sessions.default_ttl(),
    })))
}
