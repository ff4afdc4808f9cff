use axum::{
    extract::{Query, State},
    middleware,
    routing::{delete, get, put},
    Extension, Json, Router,
};
use tracing::instrument;

use super::{
    dto::{BulkUsersRequest, BulkUsersResponse, ListUsersParams, UsersPage},
    services::{self, BulkAction},
};
use crate::{
    auth::{require_session, AuthenticatedUser},
    error::ApiError,
    extract::JsonBody,
    state::AppState,
};

/// Every route here sits behind the session guard.
pub fn users_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/", get(list_users))
        .route("/api/users/block", put(block_users))
        .route("/api/users/activate", put(activate_users))
        .route("/api/users/delete", delete(delete_users))
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

#[instrument(skip(state, caller), fields(user_id = %caller.0.id))]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    Query(params): Query<ListUsersParams>,
) -> Result<Json<UsersPage>, ApiError> {
    let page = services::list_users(&state, caller.0.id, params).await?;
    Ok(Json(page))
}

async fn run_bulk(
    state: &AppState,
    action: BulkAction,
    payload: BulkUsersRequest,
) -> Result<Json<BulkUsersResponse>, ApiError> {
    let ids = services::parse_user_ids(payload.users, action)?;
    let count = match action {
        BulkAction::Block => services::block_users(state, &ids).await?,
        BulkAction::Activate => services::activate_users(state, &ids).await?,
        BulkAction::Delete => services::delete_users(state, &ids).await?,
    };
    Ok(Json(BulkUsersResponse {
        success: true,
        message: action.success_message().to_string(),
        count,
    }))
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.0.id))]
pub async fn block_users(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    JsonBody(payload): JsonBody<BulkUsersRequest>,
) -> Result<Json<BulkUsersResponse>, ApiError> {
    run_bulk(&state, BulkAction::Block, payload).await
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.0.id))]
pub async fn activate_users(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    JsonBody(payload): JsonBody<BulkUsersRequest>,
) -> Result<Json<BulkUsersResponse>, ApiError> {
    run_bulk(&state, BulkAction::Activate, payload).await
}

#[instrument(skip(state, caller, payload), fields(user_id = %caller.0.id))]
pub async fn delete_users(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthenticatedUser>,
    JsonBody(payload): JsonBody<BulkUsersRequest>,
) -> Result<Json<BulkUsersResponse>, ApiError> {
    run_bulk(&state, BulkAction::Delete, payload).await
}
