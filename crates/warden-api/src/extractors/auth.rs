//! Identity extractors. `CurrentUser` authenticates; `Authorized<P>` also
//! runs the per-route authorization check.

use std::marker::PhantomData;
use std::ops::Deref;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::warn;

use warden_core::AppError;
use warden_core::config::GateMode;
use warden_entity::user::User;
use warden_service::RequestContext;

use crate::error::ApiError;
use crate::extractors::permissions::RoutePermission;
use crate::state::AppState;

/// Extracts the bearer token from the `Authorization` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated, active user behind the request's bearer token.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Service context for the acting user.
    pub fn context(&self) -> RequestContext {
        RequestContext::for_user(&self.0)
    }

    pub fn into_inner(self) -> User {
        self.0
    }
}

impl Deref for CurrentUser {
    type Target = User;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| AppError::authentication("Could not validate credentials"))?;

        let user = state.auth_service.resolve(token).await?;
        if !user.is_active {
            return Err(AppError::validation("Inactive user").into());
        }

        Ok(CurrentUser(user))
    }
}

/// The current user, checked against the route's `(resource, action)` pair.
///
/// In `global` gate mode the middleware has already checked the request
/// against its path and method, so this only authenticates.
#[derive(Debug, Clone)]
pub struct Authorized<P: RoutePermission> {
    pub user: User,
    _permission: PhantomData<P>,
}

impl<P: RoutePermission> Authorized<P> {
    pub fn context(&self) -> RequestContext {
        RequestContext::for_user(&self.user)
    }
}

impl<P: RoutePermission> Deref for Authorized<P> {
    type Target = User;
    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<P: RoutePermission> FromRequestParts<AppState> for Authorized<P> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if state.config.rbac.gate_mode == GateMode::PerRoute
            && !state.enforcer.enforce(&user.username, P::RESOURCE, P::ACTION)
        {
            warn!(
                subject = %user.username,
                object = P::RESOURCE,
                action = P::ACTION,
                "Request denied by route permission"
            );
            return Err(AppError::authorization("Not enough permissions").into());
        }

        Ok(Authorized {
            user,
            _permission: PhantomData,
        })
    }
}
