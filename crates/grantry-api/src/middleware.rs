//! Request-scoped context: request ids, tenant, principal and the admin guard
//!
//! Authentication happens upstream. These layers only translate the
//! headers an authenticating gateway sets into the engine's types.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, warn};
use uuid::Uuid;

use grantry_core::{CurrentTenant, Principal, TenantId};

use crate::definitions::{PERMISSION_MANAGEMENT_UPDATE, PERMISSION_MANAGEMENT_VIEW};
use crate::dto::{ApiError, ApiResponse};
use crate::handlers::map_error;
use crate::state::AppState;

pub const TENANT_HEADER: &str = "X-Tenant-Id";
pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLES_HEADER: &str = "X-User-Roles";
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Request ID for tracing
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// The calling principal as reported by the gateway
#[derive(Debug, Clone, Default)]
pub struct RequestPrincipal(pub Principal);

// =============================================================================
// Request ID
// =============================================================================

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = Uuid::now_v7().to_string();

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

// =============================================================================
// Tenant
// =============================================================================

/// Run the rest of the request inside the tenant named by `X-Tenant-Id`
///
/// A missing or empty header means the host side.
pub async fn tenant_middleware(request: Request, next: Next) -> Response {
    let tenant = match parse_tenant(request.headers()) {
        Ok(tenant) => tenant,
        Err(raw) => {
            warn!(value = %raw, "Rejected malformed tenant header");
            return failure(
                StatusCode::BAD_REQUEST,
                "INVALID_TENANT",
                format!("{} is not a valid tenant id", TENANT_HEADER),
            );
        }
    };

    CurrentTenant::scope(tenant, next.run(request)).await
}

fn parse_tenant(headers: &HeaderMap) -> std::result::Result<Option<TenantId>, String> {
    let Some(value) = headers.get(TENANT_HEADER) else {
        return Ok(None);
    };
    let raw = value.to_str().map_err(|_| "<non-ascii>".to_string())?.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<TenantId>()
        .map(Some)
        .map_err(|_| raw.to_string())
}

// =============================================================================
// Principal
// =============================================================================

pub async fn principal_middleware(mut request: Request, next: Next) -> Response {
    let principal = principal_from_headers(request.headers());
    request.extensions_mut().insert(RequestPrincipal(principal));
    next.run(request).await
}

/// Build the principal from `X-User-Id` and comma-separated `X-User-Roles`
pub fn principal_from_headers(headers: &HeaderMap) -> Principal {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let Some(user_id) = user_id else {
        return Principal::anonymous();
    };

    let roles = headers
        .get(USER_ROLES_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Principal::authenticated(user_id, roles)
}

// =============================================================================
// Admin Guard
// =============================================================================

/// Require permission-management rights on administrative routes
///
/// Safe methods need the view permission, everything else the update one.
pub async fn admin_guard_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.admin_guard {
        return next.run(request).await;
    }

    let principal = request
        .extensions()
        .get::<RequestPrincipal>()
        .map(|p| p.0.clone())
        .unwrap_or_default();

    if !principal.is_authenticated() {
        return failure(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Authentication required".to_string(),
        );
    }

    let permission = match request.method() {
        &Method::GET | &Method::HEAD | &Method::OPTIONS => PERMISSION_MANAGEMENT_VIEW,
        _ => PERMISSION_MANAGEMENT_UPDATE,
    };

    match state.checker.is_granted(&principal, permission).await {
        Ok(true) => next.run(request).await,
        Ok(false) => {
            debug!(permission, "Admin request denied");
            failure(
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
                format!("Missing permission {}", permission),
            )
        }
        Err(e) => map_error(e).into_response(),
    }
}

fn failure(status: StatusCode, code: &str, message: String) -> Response {
    (
        status,
        Json(ApiResponse::failure(ApiError {
            code: code.to_string(),
            message,
            details: None,
        })),
    )
        .into_response()
}
