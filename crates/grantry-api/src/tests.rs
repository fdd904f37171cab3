//! Router tests driven through `tower::ServiceExt::oneshot`

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use grantry_core::{
    DefinitionContext, DynamicPermissionRecord, PermissionDefinitionProvider, ProviderKind,
    Result, TenantId,
};
use grantry_engine::{CheckerOptions, EventBus, PermissionRegistry};
use grantry_store::{InMemoryDynamicPermissionStore, InMemoryPermissionStore};

use crate::definitions::{
    SystemDefinitionProvider, PERMISSION_MANAGEMENT_UPDATE, PERMISSION_MANAGEMENT_VIEW,
};
use crate::middleware::{TENANT_HEADER, USER_ID_HEADER, USER_ROLES_HEADER};
use crate::{create_router, AppState};

// =============================================================================
// Fixtures
// =============================================================================

struct CatalogProvider;

impl PermissionDefinitionProvider for CatalogProvider {
    fn define(&self, ctx: &mut DefinitionContext) -> Result<()> {
        let mut group = ctx.add_group("Catalog", Some("Catalog"))?;
        let mut products = group.add_permission("Catalog.Products", None)?;
        products.add_child("Catalog.Products.Edit", None)?;
        group
            .add_permission("Catalog.Browse", None)?
            .granted_by_default(true);
        Ok(())
    }
}

struct TestApp {
    router: Router,
    state: AppState,
}

fn registry() -> Arc<PermissionRegistry> {
    Arc::new(
        PermissionRegistry::builder()
            .provider(SystemDefinitionProvider)
            .provider(CatalogProvider)
            .build_static()
            .unwrap(),
    )
}

fn app_with(admin_guard: bool, dynamic: bool) -> TestApp {
    let store = Arc::new(InMemoryPermissionStore::new());
    let mut state = AppState::new(
        registry(),
        store,
        Arc::new(EventBus::new()),
        CheckerOptions::default(),
    )
    .with_admin_guard(admin_guard);
    if dynamic {
        state = state.with_dynamic_store(Arc::new(InMemoryDynamicPermissionStore::new()));
    }
    TestApp {
        router: create_router(state.clone()),
        state,
    }
}

fn app() -> TestApp {
    app_with(false, true)
}

async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

const ALICE: [(&str, &str); 2] = [(USER_ID_HEADER, "alice"), (USER_ROLES_HEADER, "editor")];

// =============================================================================
// Health Tests
// =============================================================================

#[cfg(test)]
mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness_and_readiness() {
        let app = app();
        let (status, body) = send(&app.router, "GET", "/health/live", &[], None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "alive");

        let (status, body) = send(&app.router, "GET", "/health/ready", &[], None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ready");
    }

    #[tokio::test]
    async fn test_health_reports_permission_count() {
        let app = app();
        let (status, body) = send(&app.router, "GET", "/health", &[], None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["permission_count"], app.state.registry.len());
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let app = app();
        let response = app
            .router
            .clone()
            .oneshot(Request::get("/health/live").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}

// =============================================================================
// Definition Tests
// =============================================================================

#[cfg(test)]
mod definition_tests {
    use super::*;

    #[tokio::test]
    async fn test_list_definitions_walks_tree_in_order() {
        let app = app();
        let (status, body) = send(&app.router, "GET", "/api/v1/definitions", &[], None).await;
        assert_eq!(status, StatusCode::OK);

        let groups = body["data"].as_array().unwrap();
        let catalog = groups.iter().find(|g| g["name"] == "Catalog").unwrap();
        let names: Vec<&str> = catalog["permissions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["Catalog.Products", "Catalog.Products.Edit", "Catalog.Browse"]
        );
    }

    #[tokio::test]
    async fn test_get_definition() {
        let app = app();
        let (status, body) = send(
            &app.router,
            "GET",
            "/api/v1/definitions/Catalog.Products.Edit",
            &[],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["parent"], "Catalog.Products");
        assert_eq!(body["data"]["level"], 2);

        let (status, body) =
            send(&app.router, "GET", "/api/v1/definitions/Nope", &[], None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_malformed_tenant_header_is_rejected() {
        let app = app();
        let (status, body) = send(
            &app.router,
            "GET",
            "/api/v1/definitions",
            &[(TENANT_HEADER, "not-a-tenant")],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_TENANT");
    }
}

// =============================================================================
// Grant Tests
// =============================================================================

#[cfg(test)]
mod grant_tests {
    use super::*;

    #[tokio::test]
    async fn test_grant_then_check() {
        let app = app();
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/grants/R/editor/Catalog.Products",
            &[],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/check",
            &ALICE,
            Some(json!({ "permissions": ["Catalog.Products", "Catalog.Products.Edit", "Catalog.Browse"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let results = body["data"]["results"].as_array().unwrap();
        assert_eq!(results[0]["granted"], true);
        assert_eq!(results[1]["granted"], false);
        assert_eq!(results[2]["granted"], true);
    }

    #[tokio::test]
    async fn test_anonymous_check_is_denied() {
        let app = app();
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/check",
            &[],
            Some(json!({ "permissions": ["Catalog.Browse"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["results"][0]["granted"], false);
    }

    #[tokio::test]
    async fn test_user_prohibition_overrides_role_grant() {
        let app = app();
        send(&app.router, "POST", "/api/v1/grants/R/editor/Catalog.Products", &[], None).await;
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/grants/U/alice/Catalog.Products/prohibit",
            &[],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(
            &app.router,
            "POST",
            "/api/v1/check",
            &ALICE,
            Some(json!({ "permissions": ["Catalog.Products"] })),
        )
        .await;
        assert_eq!(body["data"]["results"][0]["granted"], false);
    }

    #[tokio::test]
    async fn test_revoke_removes_record() {
        let app = app();
        send(&app.router, "POST", "/api/v1/grants/U/alice/Catalog.Products", &[], None).await;
        let (status, _) = send(
            &app.router,
            "DELETE",
            "/api/v1/grants/U/alice/Catalog.Products",
            &[],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app.router, "GET", "/api/v1/grants/U/alice", &[], None).await;
        assert!(body["data"]["grants"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_granted_set_returns_diff() {
        let app = app();
        app.state
            .manager
            .grant("Catalog.Browse", ProviderKind::Role, "editor")
            .await
            .unwrap();

        let (status, body) = send(
            &app.router,
            "PUT",
            "/api/v1/grants/R/editor",
            &[],
            Some(json!({ "permissions": ["Catalog.Products", "Catalog.Products.Edit"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["data"]["added"],
            json!(["Catalog.Products", "Catalog.Products.Edit"])
        );
        assert_eq!(body["data"]["removed"], json!(["Catalog.Browse"]));
    }

    #[tokio::test]
    async fn test_unknown_permission_and_bad_kind() {
        let app = app();
        let (status, body) =
            send(&app.router, "POST", "/api/v1/grants/R/editor/Nope", &[], None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/grants/X/editor/Catalog.Products",
            &[],
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn test_tree_update_round_trip() {
        let app = app();
        let (status, body) = send(
            &app.router,
            "PUT",
            "/api/v1/grants/U/alice/tree",
            &[],
            Some(json!({ "permissions": [
                { "name": "Catalog.Products", "is_granted": true },
                { "name": "Catalog.Browse", "is_granted": false }
            ] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let groups = body["data"].as_array().unwrap();
        let catalog = groups.iter().find(|g| g["name"] == "Catalog").unwrap();
        let products = catalog["permissions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["name"] == "Catalog.Products")
            .unwrap();
        assert_eq!(products["is_granted"], true);
        assert_eq!(products["children"][0]["is_granted"], false);
    }

    #[tokio::test]
    async fn test_grants_are_tenant_scoped() {
        let app = app();
        let tenant = TenantId::new().to_string();
        send(
            &app.router,
            "POST",
            "/api/v1/grants/R/editor/Catalog.Products",
            &[(TENANT_HEADER, tenant.as_str())],
            None,
        )
        .await;

        let check = json!({ "permissions": ["Catalog.Products"] });
        let (_, host) = send(&app.router, "POST", "/api/v1/check", &ALICE, Some(check.clone())).await;
        assert_eq!(host["data"]["results"][0]["granted"], false);

        let (_, scoped) = send(
            &app.router,
            "POST",
            "/api/v1/check",
            &[ALICE[0], ALICE[1], (TENANT_HEADER, tenant.as_str())],
            Some(check),
        )
        .await;
        assert_eq!(scoped["data"]["results"][0]["granted"], true);
    }
}

// =============================================================================
// Policy Tests
// =============================================================================

#[cfg(test)]
mod policy_tests {
    use super::*;

    #[tokio::test]
    async fn test_authorize_permission_policy() {
        let app = app();
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/authorize",
            &ALICE,
            Some(json!({ "policy": "Permission.Catalog.Browse" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["permission"], "Catalog.Browse");
        assert_eq!(body["data"]["succeeded"], true);
    }

    #[tokio::test]
    async fn test_authorize_rejects_foreign_policy() {
        let app = app();
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/authorize",
            &ALICE,
            Some(json!({ "policy": "AdminOnly" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "UNKNOWN_POLICY");
    }
}

// =============================================================================
// Admin Guard Tests
// =============================================================================

#[cfg(test)]
mod guard_tests {
    use super::*;

    #[tokio::test]
    async fn test_guard_requires_authentication() {
        let app = app_with(true, false);
        let (status, body) = send(&app.router, "GET", "/api/v1/definitions", &[], None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_guard_separates_view_and_update() {
        let app = app_with(true, false);
        app.state
            .manager
            .grant(PERMISSION_MANAGEMENT_VIEW, ProviderKind::Role, "editor")
            .await
            .unwrap();

        let (status, _) = send(&app.router, "GET", "/api/v1/definitions", &ALICE, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/grants/R/editor/Catalog.Products",
            &ALICE,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        app.state
            .manager
            .grant(PERMISSION_MANAGEMENT_UPDATE, ProviderKind::Role, "editor")
            .await
            .unwrap();
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/grants/R/editor/Catalog.Products",
            &ALICE,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_check_routes_are_not_guarded() {
        let app = app_with(true, false);
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/check",
            &[],
            Some(json!({ "permissions": ["Catalog.Browse"] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
}

// =============================================================================
// Dynamic Permission Tests
// =============================================================================

#[cfg(test)]
mod dynamic_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_list_delete() {
        let app = app();
        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/dynamic",
            &[],
            Some(json!({ "name": "Reports.Run", "parent_name": "Catalog.Products" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["name"], "Reports.Run");

        let (_, body) = send(&app.router, "GET", "/api/v1/dynamic", &[], None).await;
        let records: Vec<DynamicPermissionRecord> =
            serde_json::from_value(body["data"].clone()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].parent(), Some("Catalog.Products"));

        let (status, _) =
            send(&app.router, "DELETE", "/api/v1/dynamic/Reports.Run", &[], None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app.router, "GET", "/api/v1/dynamic/Reports.Run", &[], None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_errors_map_to_statuses() {
        let app = app();
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/dynamic",
            &[],
            Some(json!({ "name": "Catalog.Browse" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/dynamic",
            &[],
            Some(json!({ "name": "Reports.Run", "parent_name": "Missing" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNRESOLVED_DEPENDENCY");

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/dynamic",
            &[],
            Some(json!({ "name": "has space" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["details"]["name"].is_string());
    }

    #[tokio::test]
    async fn test_tenant_header_owns_created_record() {
        let app = app();
        let tenant = TenantId::new();
        let header = tenant.to_string();
        let (_, body) = send(
            &app.router,
            "POST",
            "/api/v1/dynamic",
            &[(TENANT_HEADER, header.as_str())],
            Some(json!({ "name": "Reports.Run" })),
        )
        .await;
        let record: DynamicPermissionRecord = serde_json::from_value(body["data"].clone()).unwrap();
        assert_eq!(record.tenant_id, Some(tenant));
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_see_or_extend_record() {
        let app = app();
        let owner = TenantId::new().to_string();
        let other = TenantId::new().to_string();
        let owner_headers = [(TENANT_HEADER, owner.as_str())];
        let other_headers = [(TENANT_HEADER, other.as_str())];

        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/dynamic",
            &owner_headers,
            Some(json!({ "name": "Reports.Secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = send(&app.router, "GET", "/api/v1/dynamic", &other_headers, None).await;
        assert_eq!(body["data"], json!([]));

        let (status, _) = send(
            &app.router,
            "GET",
            "/api/v1/dynamic/Reports.Secret",
            &other_headers,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app.router,
            "POST",
            "/api/v1/dynamic",
            &other_headers,
            Some(json!({ "name": "Reports.Leak", "parent_name": "Reports.Secret" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "UNRESOLVED_DEPENDENCY");

        let (status, _) = send(
            &app.router,
            "DELETE",
            "/api/v1/dynamic/Reports.Secret",
            &other_headers,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &app.router,
            "GET",
            "/api/v1/dynamic/Reports.Secret",
            &owner_headers,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Reports.Secret");
    }

    #[tokio::test]
    async fn test_disabled_dynamic_store() {
        let app = app_with(false, false);
        let (status, body) = send(&app.router, "GET", "/api/v1/dynamic", &[], None).await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["error"]["code"], "DYNAMIC_PERMISSIONS_DISABLED");
    }
}
