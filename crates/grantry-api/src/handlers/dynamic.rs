//! Dynamic permission handlers
//!
//! Changes are persisted immediately but only enter the registry the next
//! time it is built. Reads and deletes only see records owned by the
//! caller's tenant or by the host.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;

use grantry_core::{CurrentTenant, DynamicPermissionRecord};
use grantry_engine::DynamicPermissionService;

use super::{map_error, validation_failure, ApiFailure, ApiResult};
use crate::dto::{ApiError, ApiResponse, CreateDynamicPermissionRequest};
use crate::state::AppState;
use crate::validation::{Validator, MAX_DESCRIPTION_LENGTH};

fn service(state: &AppState) -> Result<&Arc<DynamicPermissionService>, ApiFailure> {
    state.dynamic.as_ref().ok_or_else(|| {
        (
            StatusCode::NOT_IMPLEMENTED,
            Json(ApiResponse::failure(ApiError {
                code: "DYNAMIC_PERMISSIONS_DISABLED".to_string(),
                message: "No dynamic permission store is configured".to_string(),
                details: None,
            })),
        )
    })
}

pub async fn list_dynamic(
    State(state): State<AppState>,
) -> ApiResult<Vec<DynamicPermissionRecord>> {
    let records = service(&state)?.list().await.map_err(map_error)?;
    Ok(Json(ApiResponse::ok(records)))
}

pub async fn get_dynamic(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<DynamicPermissionRecord> {
    let record = service(&state)?.get(&name).await.map_err(map_error)?;
    Ok(Json(ApiResponse::ok(record)))
}

/// Create a record owned by the current tenant (host when none)
pub async fn create_dynamic(
    State(state): State<AppState>,
    Json(request): Json<CreateDynamicPermissionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DynamicPermissionRecord>>), ApiFailure> {
    let mut validator = Validator::new();
    validator
        .name("name", &request.name)
        .name_optional("parent_name", request.parent_name.as_deref())
        .name_optional("group_name", request.group_name.as_deref());
    if let Some(description) = &request.description {
        validator.max_length("description", description, MAX_DESCRIPTION_LENGTH);
    }
    validator.validate().map_err(validation_failure)?;

    let record = DynamicPermissionRecord {
        name: request.name,
        display_name: request.display_name,
        description: request.description,
        parent_name: request.parent_name,
        group_name: request.group_name,
        is_granted_by_default: request.is_granted_by_default,
        tenant_id: CurrentTenant::id(),
    };

    let created = service(&state)?.create(record).await.map_err(map_error)?;
    info!(name = %created.name, "Dynamic permission created via API");
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

pub async fn delete_dynamic(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, ApiFailure> {
    service(&state)?.delete(&name).await.map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}
