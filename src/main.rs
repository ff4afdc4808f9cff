mod activity;
mod app;
mod auth;
mod config;
mod db;
mod error;
mod extract;
mod sessions;
mod state;
mod users;

#[cfg(test)]
mod testing;

use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "user_admin=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    let config = app_state.config.clone();

    tokio::spawn(sessions::layer::prune_expired_sessions(
        app_state.sessions.clone(),
        Duration::from_secs(config.session.prune_interval_secs),
    ));

    let app = app::build_app(app_state);
    app::serve(app, &config).await
}
