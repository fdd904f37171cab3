//! API request handlers

pub mod check;
pub mod definitions;
pub mod dynamic;
pub mod grants;
pub mod health;

use axum::{http::StatusCode, Json};
use tracing::{error, warn};

use grantry_core::{GrantryError, Principal, ProviderKind};

use crate::dto::{ApiError, ApiResponse};
use crate::middleware::RequestPrincipal;
use crate::validation::{to_api_error, ValidationError};

pub use health::{health_check, liveness, readiness};

/// Error half of every handler result
pub type ApiFailure = (StatusCode, Json<ApiResponse<()>>);

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiFailure>;

/// HTTP status for an engine error
pub fn status_for(error: &GrantryError) -> StatusCode {
    match error {
        GrantryError::NotFound { .. } => StatusCode::NOT_FOUND,
        GrantryError::Conflict { .. } => StatusCode::CONFLICT,
        GrantryError::Dependency { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        GrantryError::Validation { .. } => StatusCode::BAD_REQUEST,
        GrantryError::Cancelled { .. } => StatusCode::GATEWAY_TIMEOUT,
        GrantryError::Store { .. } => StatusCode::SERVICE_UNAVAILABLE,
        GrantryError::Config { .. } | GrantryError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn map_error(error: GrantryError) -> ApiFailure {
    let status = status_for(&error);
    if status.is_server_error() {
        error!("Request failed: {}", error);
    } else {
        warn!("Request rejected: {}", error);
    }
    (
        status,
        Json(ApiResponse::failure(ApiError {
            code: error.code().to_string(),
            message: error.to_string(),
            details: None,
        })),
    )
}

pub fn validation_failure(errors: Vec<ValidationError>) -> ApiFailure {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiResponse::failure(to_api_error(errors))),
    )
}

pub fn parse_provider_kind(raw: &str) -> Result<ProviderKind, ApiFailure> {
    raw.parse::<ProviderKind>().map_err(map_error)
}

/// The principal set by the principal middleware, anonymous if absent
pub fn principal_or_anonymous(principal: Option<axum::Extension<RequestPrincipal>>) -> Principal {
    principal.map(|p| p.0 .0).unwrap_or_default()
}
