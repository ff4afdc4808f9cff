use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::dto::{LoginRequest, RegisterRequest};
use super::password::{hash_password, verify_password};
use crate::{
    db::RepoError,
    error::ApiError,
    sessions::SessionHandle,
    state::AppState,
    users::repo_types::{NewUser, User, UserStatus},
};

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "userId";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

/// Passwords are taken verbatim; only a missing or empty one is rejected.
fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

pub async fn session_user_id(session: &dyn SessionHandle) -> Option<Uuid> {
    session
        .get(USER_ID_KEY)
        .await
        .and_then(|v| v.as_str().and_then(|s| Uuid::parse_str(s).ok()))
}

/// Bind the session to `user_id`, creating it if the caller had none.
pub async fn establish_session(
    st: &AppState,
    session: &dyn SessionHandle,
    user_id: Uuid,
) -> Result<(), ApiError> {
    session
        .set(USER_ID_KEY, serde_json::Value::String(user_id.to_string()))
        .await
        .map_err(|e| {
            error!(error = %e, %user_id, "session save failed");
            ApiError::internal("Failed to create session", &e, st.config.is_development())
        })
}

pub async fn register(
    st: &AppState,
    session: &dyn SessionHandle,
    req: RegisterRequest,
) -> Result<User, ApiError> {
    let (Some(name), Some(email), Some(password)) =
        (non_blank(req.name), non_blank(req.email), non_empty(req.password))
    else {
        return Err(ApiError::Validation("All fields are required".into()));
    };

    let email = normalize_email(&email);
    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::Validation("Email format invalid".into()));
    }

    let password_hash = hash_password(&password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        ApiError::internal("Error at registering user", &e, st.config.is_development())
    })?;

    let user = match st
        .users
        .create(NewUser {
            email,
            name: name.trim().to_string(),
            password_hash,
        })
        .await
    {
        Ok(u) => u,
        Err(RepoError::UniqueViolation(constraint)) => {
            warn!(%constraint, "email already registered");
            return Err(ApiError::DuplicateEmail);
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(ApiError::internal(
                "Error at registering user",
                &e,
                st.config.is_development(),
            ));
        }
    };

    establish_session(st, session, user.id).await?;
    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Check credentials. The caller establishes the session on success.
pub async fn login(st: &AppState, req: LoginRequest) -> Result<User, ApiError> {
    let (Some(email), Some(password)) = (non_blank(req.email), non_empty(req.password)) else {
        return Err(ApiError::Validation("Email and password required".into()));
    };
    let email = normalize_email(&email);

    let mut user = match st.users.find_by_email(&email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(%email, "login unknown email");
            return Err(ApiError::InvalidCredentials);
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(ApiError::internal("Login failed", &e, st.config.is_development()));
        }
    };

    if !verify_password(&password, &user.password_hash) {
        warn!(%email, user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    if user.status == UserStatus::Blocked {
        warn!(user_id = %user.id, "login rejected for blocked account");
        return Err(ApiError::AccountBlocked);
    }

    if let Err(e) = st.users.record_login(user.id).await {
        error!(error = %e, user_id = %user.id, "record_login failed");
        return Err(ApiError::internal("Login failed", &e, st.config.is_development()));
    }
    let now = time::OffsetDateTime::now_utc();
    user.last_login = now;
    user.last_activity = now;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(user)
}

/// Identity lookup for `/me`. Unlike the guard it does not reject blocked users.
pub async fn current_user(
    st: &AppState,
    session: &dyn SessionHandle,
) -> Result<Option<User>, ApiError> {
    let Some(user_id) = session_user_id(session).await else {
        return Ok(None);
    };
    st.users.find_by_id(user_id).await.map_err(|e| {
        error!(error = %e, %user_id, "find_by_id failed");
        ApiError::internal("Internal server error", &e, st.config.is_development())
    })
}

pub async fn logout(session: &dyn SessionHandle) -> Result<(), ApiError> {
    let user_id = session_user_id(session).await;
    session.destroy().await.map_err(|e| {
        error!(error = %e, "session destroy failed");
        ApiError::LogoutFailed
    })?;
    info!(user_id = ?user_id, "user logged out");
    Ok(())
}
