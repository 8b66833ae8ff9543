use axum::routing::{delete, get, post, put};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod lifecycle;
mod models;
mod policy;
mod routes;
mod schema;
mod store;
mod timeline;

use config::AppConfig;
use redress_shared::clients::db::{create_pool, DbPool};
use redress_shared::clients::rabbitmq::RabbitMQClient;
use redress_shared::clients::storage::StorageClient;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
    pub storage: StorageClient,
    pub http: reqwest::Client,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    redress_shared::middleware::init_tracing("redress-complaints");

    let config = AppConfig::load()?;
    let port = config.port;

    // The auth extractor in redress-shared reads JWT_SECRET from the env
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let db = create_pool(&config.database_url);
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;
    let storage = StorageClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
        &config.minio_public_url,
    )
    .await;

    let state = Arc::new(AppState {
        db,
        config,
        rabbitmq,
        storage,
        http: reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("failed to build http client"),
    });

    // Keep the profile mirror current from auth events
    let sub_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = events::subscriber::listen_auth_events(sub_state).await {
            tracing::error!(error = %e, "auth event subscriber failed");
        }
    });

    let metrics_handle = redress_shared::middleware::init_metrics();

    let admin_routes = Router::new()
        .route("/complaints", get(routes::admin::list_complaints))
        .route("/complaints/:id", delete(routes::admin::delete_complaint))
        .route("/complaints/:id/status", put(routes::admin::set_status))
        .route("/complaints/:id/priority", put(routes::admin::set_priority))
        .route("/complaints/:id/assign", put(routes::admin::assign_complaint))
        .route("/complaints/:id/deadline", put(routes::admin::set_deadline))
        .route(
            "/complaints/:id/notes",
            get(routes::admin::list_notes).post(routes::admin::add_note),
        )
        .route("/notes/:id", delete(routes::admin::delete_note))
        .route("/stats", get(routes::admin::get_stats))
        .route(
            "/category-admins",
            get(routes::admins::list_category_admins).post(routes::admins::provision_category_admin),
        );

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/metrics",
            get(move || {
                let handle = metrics_handle.clone();
                async move { handle.render() }
            }),
        )
        .route(
            "/complaints",
            get(routes::complaints::list_my_complaints).post(routes::complaints::create_complaint),
        )
        .route("/complaints/:id", get(routes::complaints::get_complaint))
        .route("/complaints/:id/timeline", get(routes::complaints::get_timeline))
        .route(
            "/complaints/:id/messages",
            get(routes::messages::list_messages).post(routes::messages::send_message),
        )
        .route("/complaints/:id/messages/count", get(routes::messages::message_count))
        .route("/attachments", post(routes::attachments::upload_attachments))
        .route(
            "/categories",
            get(routes::categories::list_categories).post(routes::categories::create_category),
        )
        .route(
            "/categories/:id",
            put(routes::categories::rename_category).delete(routes::categories::delete_category),
        )
        .nest("/admin", admin_routes)
        .layer(axum::middleware::from_fn(redress_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "redress-complaints starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
