mod admin;
mod bootstrap;
mod health;
mod logs;
mod state;
mod webhooks;

use anyhow::Result;
use axum::routing::{get, post, put};
use axum::Router;

use sara_core::config::{AppConfig, LoadOptions};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhooks/voice", post(webhooks::voice))
        .route("/webhooks/sms", post(webhooks::sms))
        .route("/webhooks/whatsapp", get(webhooks::whatsapp_verify).post(webhooks::whatsapp))
        .route("/api/logs", get(logs::list))
        .route("/api/logs/{event_id}", get(logs::get))
        .route("/api/admin/faqs", get(admin::list).post(admin::create))
        .route("/api/admin/faqs/search", get(admin::search))
        .route("/api/admin/faqs/categories", get(admin::categories))
        .route("/api/admin/faqs/{id}", put(admin::update).delete(admin::delete))
        .route("/health", get(health::health))
        .with_state(state)
}

fn init_logging(config: &AppConfig) {
    use sara_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operation.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "sara-server listening"
    );

    axum::serve(listener, router(app.state.clone()))
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;

    tracing::info!(event_name = "system.server.stopping", "sara-server stopping");
    app.db_pool.close().await;

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
