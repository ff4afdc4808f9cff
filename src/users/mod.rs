use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod query;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo::{PgUserRepository, UserRepository};

pub fn router(state: AppState) -> Router<AppState> {
    handlers::users_routes(state)
}
