//! Grant administration handlers
//!
//! All routes are keyed by provider kind (`U` / `R`) and provider key and
//! act inside the tenant selected by the tenant middleware.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use grantry_core::ProviderKind;
use grantry_engine::{GrantDiff, PermissionGroupView};

use super::{map_error, parse_provider_kind, validation_failure, ApiFailure, ApiResult};
use crate::dto::{
    ApiResponse, GrantListResponse, SetGrantedSetRequest, UpdateTreeRequest,
};
use crate::state::AppState;
use crate::validation::Validator;

fn provider(kind: &str, key: &str) -> Result<ProviderKind, ApiFailure> {
    let mut validator = Validator::new();
    validator.provider_key("provider_key", key);
    validator.validate().map_err(validation_failure)?;
    parse_provider_kind(kind)
}

/// Raw grant records stored for a provider
pub async fn list_grants(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
) -> ApiResult<GrantListResponse> {
    let kind = provider(&kind, &key)?;
    let grants = state.manager.get_all(kind, &key).await.map_err(map_error)?;
    Ok(Json(ApiResponse::ok(GrantListResponse { grants })))
}

pub async fn get_tree(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
) -> ApiResult<Vec<PermissionGroupView>> {
    let kind = provider(&kind, &key)?;
    let tree = state.tree.get_tree(kind, &key).await.map_err(map_error)?;
    Ok(Json(ApiResponse::ok(tree)))
}

/// Apply checkbox-style updates and return the refreshed tree
pub async fn update_tree(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
    Json(request): Json<UpdateTreeRequest>,
) -> ApiResult<Vec<PermissionGroupView>> {
    let kind = provider(&kind, &key)?;
    state
        .tree
        .update(kind, &key, &request.permissions)
        .await
        .map_err(map_error)?;
    let tree = state.tree.get_tree(kind, &key).await.map_err(map_error)?;
    Ok(Json(ApiResponse::ok(tree)))
}

/// Replace the provider's granted set
pub async fn set_granted_set(
    State(state): State<AppState>,
    Path((kind, key)): Path<(String, String)>,
    Json(request): Json<SetGrantedSetRequest>,
) -> ApiResult<GrantDiff> {
    let kind = provider(&kind, &key)?;
    let diff = state
        .manager
        .set_granted_set(kind, &key, &request.permissions)
        .await
        .map_err(map_error)?;
    info!(
        provider_kind = %kind,
        provider_key = %key,
        added = diff.added.len(),
        removed = diff.removed.len(),
        "Granted set replaced"
    );
    Ok(Json(ApiResponse::ok(diff)))
}

pub async fn grant(
    State(state): State<AppState>,
    Path((kind, key, name)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiFailure> {
    let kind = provider(&kind, &key)?;
    state.manager.grant(&name, kind, &key).await.map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke(
    State(state): State<AppState>,
    Path((kind, key, name)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiFailure> {
    let kind = provider(&kind, &key)?;
    state.manager.revoke(&name, kind, &key).await.map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn prohibit(
    State(state): State<AppState>,
    Path((kind, key, name)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiFailure> {
    let kind = provider(&kind, &key)?;
    state
        .manager
        .prohibit(&name, kind, &key)
        .await
        .map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}
