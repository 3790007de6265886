//! User management handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use uuid::Uuid;
use validator::Validate;

use crate::dto::request::{CreateUserBody, UpdateMeBody, UpdateUserBody};
use crate::dto::response::{ApiResponse, UserResponse};
use crate::error::ApiError;
use crate::extractors::permissions::{CreateUsers, DeleteUsers, ReadUsers, UpdateUsers};
use crate::extractors::{Authorized, CurrentUser};
use crate::state::AppState;

type UserJson = Json<ApiResponse<UserResponse>>;

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
    _auth: Authorized<ReadUsers>,
) -> Result<Json<ApiResponse<Vec<UserResponse>>>, ApiError> {
    let users = state.user_service.list_users().await?;
    Ok(Json(ApiResponse::ok(
        users.into_iter().map(UserResponse::from).collect(),
    )))
}

/// POST /api/users
pub async fn create_user(
    State(state): State<AppState>,
    auth: Authorized<CreateUsers>,
    Json(body): Json<CreateUserBody>,
) -> Result<(StatusCode, UserJson), ApiError> {
    body.validate()?;
    let user = state
        .user_service
        .create_user(&auth.context(), body.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user.into()))))
}

/// GET /api/users/me
pub async fn get_me(current: CurrentUser) -> UserJson {
    Json(ApiResponse::ok(current.into_inner().into()))
}

/// PUT /api/users/me
pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(body): Json<UpdateMeBody>,
) -> Result<UserJson, ApiError> {
    body.validate()?;
    let user = state
        .user_service
        .update_me(&current.context(), body.into())
        .await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    _auth: Authorized<ReadUsers>,
    Path(id): Path<Uuid>,
) -> Result<UserJson, ApiError> {
    let user = state.user_service.get_user(id).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

/// PUT /api/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    auth: Authorized<UpdateUsers>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserBody>,
) -> Result<UserJson, ApiError> {
    body.validate()?;
    let user = state
        .user_service
        .update_user(&auth.context(), id, body.into())
        .await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

/// DELETE /api/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    auth: Authorized<DeleteUsers>,
    Path(id): Path<Uuid>,
) -> Result<UserJson, ApiError> {
    let user = state.user_service.delete_user(&auth.context(), id).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}
