mod app;
mod auth;
mod config;
mod db;
mod error;
mod state;
mod todos;

use crate::{config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "tasklist=debug,axum=info,tower_http=info".to_string());
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

    let config = AppConfig::from_env()?;
    let (host, port, seed) = (config.host.clone(), config.port, config.seed_data);
    tracing::info!(db_path = %config.db_path, "opening database");

    let app_state = AppState::init(config).await?;
    db::migrate(&app_state.db).await?;

    if seed {
        if let Err(e) = db::seed_dev_data(&app_state.db).await {
            tracing::warn!(error = %e, "failed to insert seed data; continuing");
        }
    }

    let app = app::build_app(app_state);
    app::serve(app, &host, port).await
}
