use axum::routing::{delete, get, post, put};
use axum::Router;
use diesel::prelude::*;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

mod config;
mod events;
mod models;
mod routes;
mod schema;
mod services;

use config::AppConfig;
use redress_shared::clients::db::{create_pool, DbPool};
use redress_shared::clients::rabbitmq::RabbitMQClient;
use redress_shared::types::auth::UserRole;

pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    pub rabbitmq: RabbitMQClient,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    redress_shared::middleware::init_tracing("redress-auth");

    let config = AppConfig::load()?;
    let port = config.port;

    // The auth extractor in redress-shared reads JWT_SECRET from the env
    std::env::set_var("JWT_SECRET", &config.jwt_secret);

    let db = create_pool(&config.database_url);
    let rabbitmq = RabbitMQClient::connect(&config.rabbitmq_url).await?;

    let state = Arc::new(AppState { db, config, rabbitmq });

    ensure_bootstrap_admin(&state)?;

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/auth/register", post(routes::register::register))
        .route("/auth/login", post(routes::login::login))
        .route("/auth/refresh", post(routes::refresh::refresh_token))
        .route("/auth/logout", post(routes::logout::logout))
        .route("/auth/me", get(routes::me::me))
        .route("/admin/users/:id/role", put(routes::roles::set_role))
        .route("/internal/users", post(routes::internal::create_user))
        .route("/internal/users/:id", delete(routes::internal::delete_user))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "redress-auth starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Seed the first super_admin from config when the instance is empty.
/// Role management and provisioning both require one to exist.
fn ensure_bootstrap_admin(state: &Arc<AppState>) -> anyhow::Result<()> {
    use schema::credentials;

    let (Some(email), Some(password)) = (
        state.config.bootstrap_admin_email.clone(),
        state.config.bootstrap_admin_password.clone(),
    ) else {
        return Ok(());
    };

    let mut conn = state.db.get()?;

    let existing: i64 = credentials::table
        .filter(credentials::role.eq(UserRole::SuperAdmin.to_string()))
        .count()
        .get_result(&mut conn)?;

    if existing > 0 {
        return Ok(());
    }

    let password_hash = services::auth_service::hash_password(&password)
        .map_err(|e| anyhow::anyhow!("bootstrap admin hash failed: {e}"))?;

    let new_cred = models::NewCredential {
        name: "Super Admin".to_string(),
        email: email.to_lowercase(),
        password_hash,
        role: UserRole::SuperAdmin.to_string(),
    };

    diesel::insert_into(credentials::table)
        .values(&new_cred)
        .execute(&mut conn)?;

    tracing::info!(email = %email, "bootstrap super admin created");
    Ok(())
}
