//! Permission check and policy handlers for the calling principal

use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::debug;

use grantry_engine::AuthorizationDecision;

use super::{map_error, principal_or_anonymous, validation_failure, ApiFailure, ApiResult};
use crate::dto::{
    ApiError, ApiResponse, AuthorizeRequest, CheckPermissionsRequest, CheckPermissionsResponse,
};
use crate::middleware::RequestPrincipal;
use crate::state::AppState;
use crate::validation::Validator;

/// Check permissions for the caller; results keep the request order
pub async fn check_permissions(
    State(state): State<AppState>,
    principal: Option<Extension<RequestPrincipal>>,
    Json(request): Json<CheckPermissionsRequest>,
) -> ApiResult<CheckPermissionsResponse> {
    let mut validator = Validator::new();
    if request.permissions.is_empty() {
        validator.error("permissions", "At least one permission is required", "required");
    }
    for (i, name) in request.permissions.iter().enumerate() {
        validator.name(&format!("permissions[{}]", i), name);
    }
    validator.validate().map_err(validation_failure)?;

    let principal = principal_or_anonymous(principal);
    let results = state
        .checker
        .is_granted_many(&principal, &request.permissions)
        .await
        .map_err(map_error)?;

    debug!(count = results.len(), "Permission check completed");
    Ok(Json(ApiResponse::ok(CheckPermissionsResponse { results })))
}

/// Evaluate a `Permission.<name>` policy for the caller
pub async fn authorize(
    State(state): State<AppState>,
    principal: Option<Extension<RequestPrincipal>>,
    Json(request): Json<AuthorizeRequest>,
) -> ApiResult<AuthorizationDecision> {
    let principal = principal_or_anonymous(principal);
    let decision = state
        .policies
        .authorize(&principal, &request.policy)
        .await
        .map_err(map_error)?
        .ok_or_else(|| unknown_policy(&request.policy))?;
    Ok(Json(ApiResponse::ok(decision)))
}

fn unknown_policy(policy: &str) -> ApiFailure {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::failure(ApiError {
            code: "UNKNOWN_POLICY".to_string(),
            message: format!("'{}' is not a permission policy", policy),
            details: None,
        })),
    )
}
