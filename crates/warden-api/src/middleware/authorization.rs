//! Global authorization gate.
//!
//! Checks every request against the policy store using the raw request path
//! as the object and the HTTP method as the action. With
//! `rbac.strip_api_prefix` set, the path relative to `server.api_prefix` is
//! used instead. Paths listed in `rbac.public_paths` are skipped. A request
//! without a usable token is passed through; rejecting unauthenticated
//! callers is left to the extractors on the routes that need an identity.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use warden_core::AppError;

use crate::error::ApiError;
use crate::extractors::bearer_token;
use crate::state::AppState;

/// Middleware that enforces `(path, method)` for the token's subject.
pub async fn authorize_request(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let rbac = &state.config.rbac;

    if rbac.is_public_path(&path) {
        return next.run(request).await;
    }

    let claims = match bearer_token(request.headers()).map(|t| state.auth_service.verify(t)) {
        Some(Ok(claims)) => claims,
        _ => {
            debug!(path = %path, "No valid token, passing request through");
            return next.run(request).await;
        }
    };

    let object = if rbac.strip_api_prefix {
        policy_object(&path, &state.config.server.api_prefix)
    } else {
        path.as_str()
    };
    let method = request.method().as_str();

    if !state.enforcer.enforce(&claims.username, object, method) {
        warn!(
            subject = %claims.username,
            object = %object,
            action = %method,
            "Request denied by global gate"
        );
        return ApiError::from(AppError::authorization("Not enough permissions")).into_response();
    }

    next.run(request).await
}

/// The policy object for a request path: the path relative to the API
/// mount point, or the path unchanged when it lies outside the mount.
pub fn policy_object<'a>(path: &'a str, api_prefix: &str) -> &'a str {
    let prefix = api_prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path;
    }
    match path.strip_prefix(prefix) {
        Some(rest) if rest.starts_with('/') => rest,
        _ => path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_object_strips_mount() {
        assert_eq!(policy_object("/api/users", "/api"), "/users");
        assert_eq!(policy_object("/api/users/me", "/api/"), "/users/me");
        assert_eq!(policy_object("/apix/users", "/api"), "/apix/users");
        assert_eq!(policy_object("/metrics", "/api"), "/metrics");
        assert_eq!(policy_object("/users", ""), "/users");
    }
}
