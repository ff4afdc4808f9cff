use crate::state::AppState;
use axum::Router;

mod dto;
pub mod guard;
pub mod handlers;
pub mod password;
pub mod services;

pub use guard::{require_session, AuthenticatedUser};

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
