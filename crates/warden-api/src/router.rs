//! Route definitions for the Warden HTTP API.
//!
//! API routes are mounted under `server.api_prefix`; the welcome and health
//! endpoints live at the root. The global authorization gate is layered
//! over the whole router only when `rbac.gate_mode` is `global`.

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{get, post},
};

use warden_core::config::GateMode;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the Axum router with all routes and the configured gate.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(auth_routes())
        .merge(user_routes())
        .merge(resource_routes())
        .merge(policy_routes());

    let prefix = state.config.server.api_prefix.trim_end_matches('/');
    let router = Router::new()
        .route("/", get(handlers::health::root))
        .route("/health", get(handlers::health::health));

    let router = if prefix.is_empty() {
        router.merge(api_routes)
    } else {
        router.nest(prefix, api_routes)
    };

    let router = match state.config.rbac.gate_mode {
        GateMode::Global => router.layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::authorization::authorize_request,
        )),
        GateMode::PerRoute => router,
    };

    router.with_state(state)
}

/// Login and registration.
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/register", post(handlers::auth::register))
}

/// User management and self-service.
fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(handlers::users::list_users).post(handlers::users::create_user),
        )
        .route(
            "/users/me",
            get(handlers::users::get_me).put(handlers::users::update_me),
        )
        .route(
            "/users/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
}

fn resource_routes() -> Router<AppState> {
    Router::new().route(
        "/resources",
        get(handlers::resources::list_resources).post(handlers::resources::create_resource),
    )
}

fn policy_routes() -> Router<AppState> {
    Router::new().route(
        "/policies",
        get(handlers::policies::list_policies)
            .post(handlers::policies::add_policy)
            .delete(handlers::policies::remove_policy),
    )
}
