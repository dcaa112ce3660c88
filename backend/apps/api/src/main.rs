//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use auth::domain::repository::AuthStore;
use auth::{AuthConfig, AuthServices, MemoryAuthStore, PgAuthStore, auth_router};
use axum::{
    Json, Router, http,
    http::{HeaderName, Method, header},
    routing::get,
};
use base64::Engine;
use base64::engine::general_purpose;
use sqlx::postgres::PgPoolOptions;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer, ExposeHeaders};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "purecerts=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = auth_config_from_env()?;
    tracing::info!(?config, "Auth configuration loaded");

    match env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;
            tracing::info!("Connected to database");

            let store = PgAuthStore::new(pool);
            store.migrate().await?;
            tracing::info!("Migrations completed");

            serve(Arc::new(store), config).await
        }
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            serve(Arc::new(MemoryAuthStore::new()), config).await
        }
    }
}

async fn serve<R: AuthStore>(store: Arc<R>, config: AuthConfig) -> anyhow::Result<()> {
    let services = Arc::new(AuthServices::new(store, config)?);

    // Startup cleanup: remove expired sessions, tokens and challenges
    // Errors here should not prevent server startup
    if let Err(e) = services.purge_expired().await {
        tracing::warn!(error = %e, "Auth cleanup failed, continuing anyway");
    }

    let app = Router::new()
        .route("/health", get(health))
        .merge(auth_router(services))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer());

    let port: u16 = match env::var("PORT") {
        Ok(port) => port.parse()?,
        Err(_) => 8080,
    };
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn cors_layer() -> CorsLayer {
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("connect-protocol-version"),
        ]))
        .expose_headers(ExposeHeaders::list([
            HeaderName::from_static("grpc-status"),
            HeaderName::from_static("grpc-message"),
        ]))
        .allow_credentials(true)
}

/// Auth configuration from the environment.
///
/// `TOKEN_SECRET` (base64, at least 32 bytes) is mandatory in release builds;
/// debug builds fall back to a random per-process key.
fn auth_config_from_env() -> anyhow::Result<AuthConfig> {
    let mut config = match env::var("TOKEN_SECRET") {
        Ok(secret_b64) => AuthConfig {
            token_secret: general_purpose::STANDARD.decode(secret_b64.trim())?,
            ..AuthConfig::default()
        },
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("TOKEN_SECRET not set, using a random development key");
            AuthConfig::development()
        }
        Err(_) => anyhow::bail!("TOKEN_SECRET must be set in production"),
    };

    if let Some(secs) = env_secs("ACCESS_TOKEN_TTL_SECS")? {
        config.access_token_ttl = secs;
    }
    if let Some(secs) = env_secs("REFRESH_TOKEN_TTL_SECS")? {
        config.refresh_token_ttl = secs;
    }
    if let Some(secs) = env_secs("SESSION_TTL_SECS")? {
        config.session_ttl = secs;
    }
    if let Ok(pepper_b64) = env::var("PASSWORD_PEPPER") {
        config.password_pepper = Some(general_purpose::STANDARD.decode(pepper_b64.trim())?);
    }
    if let Ok(issuer) = env::var("TOTP_ISSUER") {
        config.totp_issuer = issuer;
    }
    if let Ok(flag) = env::var("BREACH_CHECK") {
        config.breach_check = !matches!(flag.trim(), "0" | "false" | "off");
    }

    config.validate().map_err(anyhow::Error::msg)?;
    Ok(config)
}

fn env_secs(name: &str) -> anyhow::Result<Option<Duration>> {
    match env::var(name) {
        Ok(value) => Ok(Some(Duration::from_secs(value.trim().parse()?))),
        Err(_) => Ok(None),
    }
}
