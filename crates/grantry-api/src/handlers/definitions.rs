//! Permission definition handlers

use axum::{
    extract::{Path, State},
    Json,
};

use grantry_core::CurrentTenant;

use super::{map_error, ApiResult};
use crate::dto::{ApiResponse, DefinitionResponse, GroupResponse};
use crate::state::AppState;

/// List groups with the permissions visible to the current tenant
pub async fn list_definitions(State(state): State<AppState>) -> ApiResult<Vec<GroupResponse>> {
    let tenant = CurrentTenant::id();
    let registry = &state.registry;

    let groups = registry
        .groups()
        .into_iter()
        .map(|group| {
            let mut permissions = Vec::new();
            let mut pending: Vec<&str> = group.permissions.iter().map(String::as_str).collect();
            pending.reverse();
            while let Some(name) = pending.pop() {
                let Some(def) = registry.find_permission(name) else {
                    continue;
                };
                if !def.is_visible_to(tenant) {
                    continue;
                }
                permissions.push(DefinitionResponse::from(def));
                pending.extend(def.children.iter().rev().map(String::as_str));
            }
            GroupResponse {
                name: group.name.clone(),
                display_name: group.display_name.clone(),
                permissions,
            }
        })
        .filter(|group| !group.permissions.is_empty())
        .collect();

    Ok(Json(ApiResponse::ok(groups)))
}

pub async fn get_definition(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<DefinitionResponse> {
    let def = state
        .registry
        .get_permission_for(&name, CurrentTenant::id())
        .map_err(map_error)?;
    Ok(Json(ApiResponse::ok(DefinitionResponse::from(def))))
}
