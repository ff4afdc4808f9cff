use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use sha2::{Digest, Sha512};
use tracing::{debug, error, info};

use super::{Session, SessionState, SessionStore};
use crate::{config::SessionConfig, error::ApiError, state::AppState};

/// Cookie signing key derived from `SESSION_SECRET`.
pub fn cookie_key(secret: &str) -> Key {
    let digest = Sha512::digest(secret.as_bytes());
    Key::from(digest.as_slice())
}

pub fn session_cookie(cfg: &SessionConfig, sid: String) -> Cookie<'static> {
    Cookie::build((cfg.cookie_name.clone(), sid))
        .path("/")
        .http_only(true)
        .secure(cfg.secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(cfg.max_age_secs as i64))
        .build()
}

fn removal_cookie(cfg: &SessionConfig) -> Cookie<'static> {
    Cookie::build((cfg.cookie_name.clone(), "")).path("/").build()
}

/// Loads the session named by the signed cookie, exposes it to handlers and
/// writes the cookie back after the handler saved or destroyed it.
pub async fn session_layer(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let cfg = &state.config.session;
    let record = match jar.get(&cfg.cookie_name) {
        Some(cookie) => match state.sessions.load(cookie.value()).await {
            Ok(None) => {
                debug!("session cookie present but session unknown or expired");
                None
            }
            Ok(record) => record,
            Err(e) => {
                error!(error = %e, "session load failed");
                return ApiError::internal("Internal server error", &e, state.config.is_development())
                    .into_response();
            }
        },
        None => None,
    };
    let session = Session::new(state.sessions.clone(), record, cfg.max_age());
    req.extensions_mut().insert(session.clone());
    let res = next.run(req).await;

    match session.state().await {
        SessionState::Unchanged => res,
        SessionState::Saved => match session.id().await {
            Some(sid) => (jar.add(session_cookie(cfg, sid)), res).into_response(),
            None => res,
        },
        SessionState::Destroyed => (jar.remove(removal_cookie(cfg)), res).into_response(),
    }
}

/// Deletes expired sessions on a fixed interval.
pub async fn prune_expired_sessions(store: Arc<dyn SessionStore>, every: std::time::Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        match store.prune_expired().await {
            Ok(0) => {}
            Ok(n) => info!(pruned = n, "expired sessions removed"),
            Err(e) => error!(error = %e, "session prune failed"),
        }
    }
}
