use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{LoginRequest, LoginResponse, MeResponse, MessageResponse, RegisterRequest, RegisterResponse},
    services,
};
use crate::{error::ApiError, extract::JsonBody, sessions::Session, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
}

#[instrument(skip(state, session, payload))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let user = services::register(&state, &session, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered and logged in",
            status: "success",
            user,
        }),
    ))
}

#[instrument(skip(state, session, payload))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = services::login(&state, payload).await?;
    services::establish_session(&state, &session, user.id).await?;
    Ok(Json(LoginResponse { user: user.into() }))
}

#[instrument(skip(state, session))]
pub async fn me(State(state): State<AppState>, session: Session) -> Result<Json<MeResponse>, ApiError> {
    let user = services::current_user(&state, &session).await?;
    Ok(Json(MeResponse { user }))
}

#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Json<MessageResponse>, ApiError> {
    services::logout(&session).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully",
    }))
}
