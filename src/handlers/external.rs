// handlers/external.rs - /users/external, proxied to the third-party users API

use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Path, Query, State,
};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult};
use crate::services::clients::{CreateExternalUser, ExternalUser, UpdateExternalUser};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ExternalUser>> {
    Ok(ApiResponse::success(state.user_external.get_external_users().await?))
}

/// GET /users/external/search?name&email
pub async fn search(State(state): State<AppState>, Query(query): Query<SearchQuery>) -> ApiResult<Vec<ExternalUser>> {
    let users = state
        .user_external
        .search_external_users(query.name.as_deref(), query.email.as_deref())
        .await?;
    Ok(ApiResponse::success(users))
}

pub async fn get(State(state): State<AppState>, id: Result<Path<i64>, PathRejection>) -> ApiResult<ExternalUser> {
    let Path(id) = id?;
    Ok(ApiResponse::success(state.user_external.get_external_user(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateExternalUser>, JsonRejection>,
) -> ApiResult<ExternalUser> {
    let Json(data) = payload?;
    Ok(ApiResponse::created(state.user_external.create_external_user(&data).await?))
}

pub async fn update(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateExternalUser>, JsonRejection>,
) -> ApiResult<ExternalUser> {
    let Path(id) = id?;
    let Json(data) = payload?;
    Ok(ApiResponse::success(state.user_external.update_external_user(id, &data).await?))
}

pub async fn remove(State(state): State<AppState>, id: Result<Path<i64>, PathRejection>) -> ApiResult<Value> {
    let Path(id) = id?;
    state.user_external.delete_external_user(id).await?;
    Ok(ApiResponse::success(json!({ "message": "Deleted successfully" })))
}
