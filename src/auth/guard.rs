use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{error, warn};

use super::services::session_user_id;
use crate::{
    error::ApiError,
    sessions::{Session, SessionHandle},
    state::AppState,
    users::{
        repo::UserRepository,
        repo_types::{UserStatus, UserSummary},
    },
};

/// Identity attached to requests that passed the guard.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub UserSummary);

/// Resolve the session's user, invalidating the session when that user is
/// gone or blocked.
pub async fn authenticate(
    users: &dyn UserRepository,
    session: &dyn SessionHandle,
    expose_details: bool,
) -> Result<UserSummary, ApiError> {
    let Some(user_id) = session_user_id(session).await else {
        return Err(ApiError::Unauthorized);
    };

    let user = users.find_summary(user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "authentication lookup failed");
        ApiError::internal("Internal server error", &e, expose_details)
    })?;

    match user {
        Some(user) if user.status == UserStatus::Active => Ok(user),
        other => {
            warn!(%user_id, found = other.is_some(), "session refers to a missing or blocked user");
            if let Err(e) = session.destroy().await {
                error!(error = %e, %user_id, "failed to destroy invalid session");
            }
            Err(ApiError::SessionInvalid)
        }
    }
}

pub async fn require_session(
    State(state): State<AppState>,
    session: Session,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(state.users.as_ref(), &session, state.config.is_development()).await?;
    req.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(req).await)
}
