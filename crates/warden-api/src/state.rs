//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use warden_core::config::AppConfig;
use warden_policy::Enforcer;
use warden_service::{AuthService, PolicyService, ResourceService, UserService};

/// Shared state injected into every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The single policy enforcer owned by the composition root.
    pub enforcer: Arc<Enforcer>,
    /// Token issuance and resolution.
    pub auth_service: Arc<AuthService>,
    /// User management.
    pub user_service: Arc<UserService>,
    /// Resource store.
    pub resource_service: Arc<ResourceService>,
    /// Policy administration.
    pub policy_service: Arc<PolicyService>,
}
