use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod bus;
mod config;
mod sse;
mod subscriber;

use bus::EventBus;
use config::AppConfig;
use redress_shared::clients::rabbitmq::RabbitMQClient;
use redress_shared::types::HealthResponse;

pub struct AppState {
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub bus: EventBus,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::healthy("redress-notifier", env!("CARGO_PKG_VERSION")))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    redress_shared::middleware::init_tracing("redress-notifier");

    let config = AppConfig::load()?;
    let port = config.port;

    // The auth extractor in redress-shared reads JWT_SECRET from the env
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let state = Arc::new(AppState {
        config,
        rabbitmq,
        bus: EventBus::new(),
    });

    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = subscriber::listen_complaint_changes(sub_state).await {
            tracing::error!(error = %e, "change subscriber failed");
        }
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/events", get(sse::sse_events))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "redress-notifier starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
