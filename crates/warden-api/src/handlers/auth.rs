//! Login and registration handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Form, Json};
use validator::Validate;

use crate::dto::request::{CreateUserBody, LoginForm};
use crate::dto::response::{ApiResponse, TokenResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    form.validate()?;
    let token = state
        .auth_service
        .login(&form.username, &form.password)
        .await?;
    Ok(Json(token.into()))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), ApiError> {
    body.validate()?;
    let (_, token) = state.auth_service.register(body.into()).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(token.into()))))
}
