//! Data Transfer Objects for API requests and responses

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use grantry_core::{PermissionCheckResult, PermissionDefinition, PermissionGrant, TenantId};
use grantry_engine::PermissionUpdate;

// ============================================================================
// Generic Response Types
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
}

// ============================================================================
// Definition DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct DefinitionResponse {
    pub name: String,
    pub full_name: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub group: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub children: Vec<String>,
    pub level: u32,
    pub is_granted_by_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
}

impl From<&PermissionDefinition> for DefinitionResponse {
    fn from(def: &PermissionDefinition) -> Self {
        Self {
            name: def.name.clone(),
            full_name: def.full_name().to_string(),
            display_name: def.display_name.clone(),
            description: def.description.clone(),
            group: def.group.clone(),
            parent: def.parent.clone(),
            children: def.children.clone(),
            level: def.level(),
            is_granted_by_default: def.is_granted_by_default,
            tenant_id: def.tenant_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupResponse {
    pub name: String,
    pub display_name: String,
    pub permissions: Vec<DefinitionResponse>,
}

// ============================================================================
// Grant DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct GrantListResponse {
    pub grants: Vec<PermissionGrant>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetGrantedSetRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTreeRequest {
    pub permissions: Vec<PermissionUpdate>,
}

// ============================================================================
// Check DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckPermissionsRequest {
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckPermissionsResponse {
    pub results: Vec<PermissionCheckResult>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizeRequest {
    pub policy: String,
}

// ============================================================================
// Dynamic Permission DTOs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateDynamicPermissionRequest {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub is_granted_by_default: bool,
}
