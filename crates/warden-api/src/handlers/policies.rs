//! Policy administration handlers. Every mutation is saved before the
//! response is sent.

use axum::Json;
use axum::extract::State;
use validator::Validate;

use crate::dto::request::PolicyBody;
use crate::dto::response::{ApiResponse, PolicyChangeResponse, PolicyListResponse};
use crate::error::ApiError;
use crate::extractors::Authorized;
use crate::extractors::permissions::{AddPolicies, ReadPolicies, RemovePolicies};
use crate::state::AppState;

/// GET /api/policies
pub async fn list_policies(
    State(state): State<AppState>,
    _auth: Authorized<ReadPolicies>,
) -> Json<ApiResponse<PolicyListResponse>> {
    Json(ApiResponse::ok(PolicyListResponse {
        policies: state.policy_service.list_policies(),
        grouping_rules: state.policy_service.list_grouping_rules(),
    }))
}

/// POST /api/policies
pub async fn add_policy(
    State(state): State<AppState>,
    auth: Authorized<AddPolicies>,
    Json(body): Json<PolicyBody>,
) -> Result<Json<ApiResponse<PolicyChangeResponse>>, ApiError> {
    body.validate()?;
    let changed = state
        .policy_service
        .add_policy(&auth.context(), &body.role, &body.object, &body.action)
        .await?;
    Ok(Json(ApiResponse::ok(PolicyChangeResponse { changed })))
}

/// DELETE /api/policies
pub async fn remove_policy(
    State(state): State<AppState>,
    auth: Authorized<RemovePolicies>,
    Json(body): Json<PolicyBody>,
) -> Result<Json<ApiResponse<PolicyChangeResponse>>, ApiError> {
    body.validate()?;
    let changed = state
        .policy_service
        .remove_policy(&auth.context(), &body.role, &body.object, &body.action)
        .await?;
    Ok(Json(ApiResponse::ok(PolicyChangeResponse { changed })))
}
