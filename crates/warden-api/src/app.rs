//! Application builder: wires state, router, and middleware into an Axum app.

use std::sync::Arc;

use axum::Router;
use axum::middleware as axum_middleware;
use tower_http::trace::TraceLayer;
use tracing::info;

use warden_auth::jwt::{JwtDecoder, JwtEncoder};
use warden_auth::lifecycle::RoleLifecycle;
use warden_auth::password::{PasswordHasher, PasswordValidator};
use warden_core::config::AppConfig;
use warden_core::{AppError, AppResult};
use warden_database::repositories::{ResourceRepository, UserRepository};
use warden_policy::Enforcer;
use warden_service::{
    AuthService, PolicyService, ResourceService, UserService, seed_demo_users,
};

use crate::middleware::cors::build_cors_layer;
use crate::middleware::logging::request_logging;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(axum_middleware::from_fn(request_logging))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Constructs the enforcer, repositories, and services for `config`.
///
/// Fails when the policy model or policy file is missing or malformed.
pub async fn build_state(config: AppConfig) -> AppResult<AppState> {
    info!(
        model = %config.rbac.model_path,
        policy = %config.rbac.policy_path,
        "Loading policy enforcer"
    );
    let enforcer = Arc::new(
        Enforcer::from_files(&config.rbac.model_path, &config.rbac.policy_path).await?,
    );

    let user_repo = Arc::new(UserRepository::new());
    let resource_repo = Arc::new(ResourceRepository::new());

    let hasher = Arc::new(PasswordHasher::new());
    let validator = Arc::new(PasswordValidator::new(&config.auth));
    let encoder = Arc::new(JwtEncoder::new(&config.auth)?);
    let decoder = Arc::new(JwtDecoder::new(&config.auth)?);

    let user_service = Arc::new(UserService::new(
        Arc::clone(&user_repo),
        hasher,
        validator,
        RoleLifecycle::new(Arc::clone(&enforcer)),
    ));
    let auth_service = Arc::new(AuthService::new(
        Arc::clone(&user_service),
        user_repo,
        encoder,
        decoder,
    ));
    let resource_service = Arc::new(ResourceService::new(resource_repo));
    let policy_service = Arc::new(PolicyService::new(Arc::clone(&enforcer)));

    if config.rbac.seed_demo_users {
        seed_demo_users(&user_service).await?;
    }

    Ok(AppState {
        config: Arc::new(config),
        enforcer,
        auth_service,
        user_service,
        resource_service,
        policy_service,
    })
}

/// Runs the Warden server until Ctrl+C.
pub async fn run_server(config: AppConfig) -> AppResult<()> {
    info!(gate_mode = ?config.rbac.gate_mode, "Starting Warden server...");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_state(config).await?;
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    info!("Warden server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("Warden server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
