// handlers/users.rs - /users CRUD over the local database

use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Path, Query, State,
};
use axum::Json;
use serde_json::{json, Value};

use crate::auth::{CurrentUser, RouteAccess};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::{CreateUserCmd, ListQuery, UpdateUserCmd, UserListVo, UserVo};
use crate::state::AppState;

/// Assigning roles is an admin action even where the route itself only
/// needs a login
fn authorize_role_change(caller: &CurrentUser, roles: Option<&[String]>) -> Result<(), ApiError> {
    if roles.is_none() {
        return Ok(());
    }
    RouteAccess::authenticated()
        .with_roles(["admin"])
        .authorize(Some(&caller.0.identity))
}

/// POST /users
pub async fn create(
    State(state): State<AppState>,
    caller: CurrentUser,
    payload: Result<Json<CreateUserCmd>, JsonRejection>,
) -> ApiResult<UserVo> {
    let Json(cmd) = payload?;
    authorize_role_change(&caller, cmd.roles.as_deref())?;
    Ok(ApiResponse::created(state.users.create(cmd).await?))
}

/// GET /users?page&limit
pub async fn list(State(state): State<AppState>, query: Result<Query<ListQuery>, QueryRejection>) -> ApiResult<UserListVo> {
    let Query(query) = query?;
    Ok(ApiResponse::success(state.users.list(query).await?))
}

/// GET /users/:id
pub async fn get(State(state): State<AppState>, id: Result<Path<i64>, PathRejection>) -> ApiResult<UserVo> {
    let Path(id) = id?;
    Ok(ApiResponse::success(state.users.get(id).await?))
}

/// PUT /users/:id
pub async fn update(
    State(state): State<AppState>,
    caller: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserCmd>, JsonRejection>,
) -> ApiResult<UserVo> {
    let Path(id) = id?;
    let Json(cmd) = payload?;
    authorize_role_change(&caller, cmd.roles.as_deref())?;
    Ok(ApiResponse::success(state.users.update(id, cmd).await?))
}

/// DELETE /users/:id
pub async fn remove(State(state): State<AppState>, id: Result<Path<i64>, PathRejection>) -> ApiResult<Value> {
    let Path(id) = id?;
    state.users.remove(id).await?;
    Ok(ApiResponse::success(json!({ "message": "User deleted" })))
}
