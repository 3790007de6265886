//! Resource handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Map, Value};

use warden_entity::resource::Resource;

use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::extractors::Authorized;
use crate::extractors::permissions::{CreateResources, ReadResources};
use crate::state::AppState;

/// GET /api/resources
pub async fn list_resources(
    State(state): State<AppState>,
    _auth: Authorized<ReadResources>,
) -> Result<Json<ApiResponse<Vec<Resource>>>, ApiError> {
    let resources = state.resource_service.list_resources().await?;
    Ok(Json(ApiResponse::ok(resources)))
}

/// POST /api/resources
pub async fn create_resource(
    State(state): State<AppState>,
    auth: Authorized<CreateResources>,
    Json(attributes): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<ApiResponse<Resource>>), ApiError> {
    let resource = state
        .resource_service
        .create_resource(&auth.context(), attributes)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(resource))))
}
