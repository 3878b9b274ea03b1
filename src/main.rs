use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use routecheck::api;
use routecheck::config::Config;
use routecheck::error::AppError;
use routecheck::state::{AppState, Session};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let app_state =
        AppState::new(config.event_buffer_size).with_default_page_size(config.default_page_size);

    if let Some(dev) = &config.dev_session {
        app_state.insert_session(
            dev.token.clone(),
            Session {
                user_id: Uuid::nil(),
                company_id: Some(dev.company_id),
            },
        );
        tracing::warn!(company_id = %dev.company_id, "development session enabled");
    }

    let app = api::rest::router(Arc::new(app_state)).layer(cors_layer(&config)?);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

fn cors_layer(config: &Config) -> Result<CorsLayer, AppError> {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    match &config.cors_allow_origin {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .map_err(|err| AppError::Internal(format!("invalid CORS_ALLOW_ORIGIN: {err}")))?;
            Ok(layer.allow_origin(origin))
        }
        None => Ok(layer),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
